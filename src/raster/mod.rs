//! PDF page rasterization for scanned documents
//!
//! [`PdfiumRasterizer`] renders pages with PDFium, vector content included.
//! When the PDFium library cannot be loaded, [`LopdfRasterizer`] takes over:
//! it decodes each page's scan image, which covers image-only bills but not
//! pages drawn with paths or fonts.

mod pdfium;
mod scan;

use image::DynamicImage;
use std::path::Path;

use crate::error::ExtractError;

pub use pdfium::PdfiumRasterizer;
pub use scan::LopdfRasterizer;

/// Default rasterization resolution
pub const DEFAULT_DPI: u32 = 150;

/// PDF points per inch (standard PDF unit)
const POINTS_PER_INCH: f32 = 72.0;

/// Upper bound on either side of a rendered page, whatever the DPI
const MAX_DIMENSION_PX: u32 = 8000;

/// Renders document pages to images
pub trait PageRasterizer: Send + Sync {
    /// Render every page of the document at `path`, in page order.
    ///
    /// Any failure is fatal for the document: there is nothing left to fall
    /// back to once rasterization has been attempted.
    fn rasterize(&self, path: &Path, dpi: u32) -> Result<Vec<DynamicImage>, ExtractError>;
}

/// PDFium when its library is available, the scan-image decoder otherwise
pub fn default_rasterizer() -> Box<dyn PageRasterizer> {
    match PdfiumRasterizer::new() {
        Ok(rasterizer) => {
            tracing::info!("Rasterizing PDF pages with PDFium");
            Box::new(rasterizer)
        }
        Err(e) => {
            tracing::warn!(
                "{}; falling back to scan-image extraction (vector-only pages will fail)",
                e
            );
            Box::new(LopdfRasterizer)
        }
    }
}

fn points_to_pixels(points: f32, dpi: u32) -> u32 {
    let pixels = (points.abs() / POINTS_PER_INCH * dpi as f32).round();
    (pixels as u32).clamp(1, MAX_DIMENSION_PX)
}
