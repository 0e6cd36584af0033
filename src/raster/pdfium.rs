//! Full page rendering with PDFium
//!
//! `Pdfium` is `!Send`, so the library is bound per call; the OS caches the
//! dynamic library load, which makes repeat binds cheap.

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use std::path::Path;

use super::{points_to_pixels, PageRasterizer};
use crate::error::ExtractError;

/// Rasterizer that renders every page (text, vector art and images) with PDFium
#[derive(Debug, Clone, Copy)]
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Check that the PDFium library can be loaded.
    ///
    /// Looks at `PDFIUM_DYNAMIC_LIB_PATH`, then next to the executable,
    /// then the system library path.
    pub fn new() -> Result<Self, ExtractError> {
        load_pdfium()?;
        Ok(Self)
    }
}

fn load_pdfium() -> Result<Pdfium, ExtractError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractError::Initialization(format!("Failed to load PDFium from {}: {}", path, e))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let library =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&library) {
            tracing::debug!("Loaded PDFium from {}", exe_dir.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractError::Initialization(format!(
            "PDFium library not found (set PDFIUM_DYNAMIC_LIB_PATH): {}",
            e
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ExtractError::Rasterization(format!("Failed to load PDF: {}", e)))?;

        let pages = document.pages();
        if pages.len() == 0 {
            return Err(ExtractError::Rasterization("PDF has no pages".to_string()));
        }

        tracing::info!("Rendering {} pages at {} DPI", pages.len(), dpi);

        pages
            .iter()
            .enumerate()
            .map(|(index, page)| render_page(&page, index + 1, dpi))
            .collect()
    }
}

fn render_page(page: &PdfPage, number: usize, dpi: u32) -> Result<DynamicImage, ExtractError> {
    let failed = |reason: String| ExtractError::Rasterization(format!("Page {}: {}", number, reason));

    let width = points_to_pixels(page.width().value, dpi);
    let height = points_to_pixels(page.height().value, dpi);

    // Both bounds are at most 8000, well inside i32
    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_maximum_height(height as i32);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| failed(format!("Rendering failed: {}", e)))?;

    let rendered_width = u32::try_from(bitmap.width())
        .map_err(|_| failed(format!("Invalid bitmap width {}", bitmap.width())))?;
    let rendered_height = u32::try_from(bitmap.height())
        .map_err(|_| failed(format!("Invalid bitmap height {}", bitmap.height())))?;

    let image = RgbaImage::from_raw(rendered_width, rendered_height, bitmap.as_rgba_bytes())
        .ok_or_else(|| failed("Bitmap buffer does not match its size".to_string()))?;

    tracing::debug!(
        page = number,
        width = rendered_width,
        height = rendered_height,
        "Rendered page"
    );

    Ok(DynamicImage::ImageRgba8(image))
}
