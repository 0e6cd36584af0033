//! Format dispatch and the document extraction state machine
//!
//! ```text
//! image (png/jpg/jpeg/tiff) ─► preprocess ─► recognize ─► clean
//! pdf ─► native text layer ── found ──────────────────────► done
//!                           └ empty/unavailable ─► rasterize ─► page pipeline ─► done
//!                                                     └ failure ─► fatal
//! anything else ─► UnsupportedFormat
//! ```

use image::{DynamicImage, ImageReader};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::engine::Recognizer;
use crate::error::ExtractError;
use crate::native::{extract_native_text, NativeText};
use crate::page_pipeline::{join_pages, PagePipeline};
use crate::raster::{default_rasterizer, PageRasterizer};

/// Extensions routed to the single-image path
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff"];

/// Extensions routed to the document path
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// An uploaded file: where its bytes are and what type it claims to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    extension: String,
}

impl Document {
    /// A document with an explicitly declared extension (with or without the leading dot)
    pub fn new(path: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            path: path.into(),
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    /// A document whose declared type is its file name's extension
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self { path, extension }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercase extension without the leading dot
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Image,
    Pdf,
}

fn classify(extension: &str) -> Option<FileKind> {
    if IMAGE_EXTENSIONS.contains(&extension) {
        Some(FileKind::Image)
    } else if DOCUMENT_EXTENSIONS.contains(&extension) {
        Some(FileKind::Pdf)
    } else {
        None
    }
}

/// Whether `extension` (with or without the dot) can be extracted
pub fn is_supported(extension: &str) -> bool {
    classify(&extension.trim_start_matches('.').to_lowercase()).is_some()
}

/// Where the extracted text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// The PDF's embedded text layer
    Native,
    /// OCR over rasterized PDF pages
    Ocr,
    /// OCR over an uploaded image
    Image,
}

/// Cleaned text for a whole document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentText {
    /// Page blocks in page order, separated by a blank line
    pub text: String,
    pub source: TextSource,
    pub pages: usize,
}

/// Result of [`Extractor::extract_text`] that is not a hard failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Text(DocumentText),
    UnsupportedFormat { extension: String },
}

impl Extraction {
    /// The extracted text, if the format was supported
    pub fn text(&self) -> Option<&str> {
        match self {
            Extraction::Text(doc) => Some(&doc.text),
            Extraction::UnsupportedFormat { .. } => None,
        }
    }
}

/// Extension as shown to users: ".docx", or "(no extension)"
pub fn display_extension(extension: &str) -> String {
    match extension.trim_start_matches('.') {
        "" => "(no extension)".to_string(),
        ext => format!(".{}", ext),
    }
}

impl fmt::Display for Extraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extraction::Text(doc) => f.write_str(&doc.text),
            Extraction::UnsupportedFormat { extension } => {
                write!(f, "Unsupported file type: {}", display_extension(extension))
            }
        }
    }
}

/// Extracts text from bills; build once and share.
pub struct Extractor {
    pipeline: PagePipeline,
    rasterizer: Box<dyn PageRasterizer>,
    dpi: u32,
}

impl Extractor {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        rasterizer: Box<dyn PageRasterizer>,
        dpi: u32,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            pipeline: PagePipeline::new(recognizer)?,
            rasterizer,
            dpi,
        })
    }

    /// Extractor using PDFium for page rendering when available
    pub fn with_recognizer(recognizer: Arc<dyn Recognizer>, dpi: u32) -> Result<Self, ExtractError> {
        Self::new(recognizer, default_rasterizer(), dpi)
    }

    pub fn recognizer(&self) -> &Arc<dyn Recognizer> {
        self.pipeline.recognizer()
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Extract cleaned text from `document`, routing on its declared extension.
    ///
    /// Blocks until every page is done; call it off any latency-sensitive thread.
    pub fn extract_text(&self, document: &Document) -> Result<Extraction, ExtractError> {
        let Some(kind) = classify(document.extension()) else {
            tracing::warn!("Unsupported file type: .{}", document.extension());
            return Ok(Extraction::UnsupportedFormat {
                extension: document.extension().to_string(),
            });
        };

        let start = Instant::now();
        let text = match kind {
            FileKind::Image => self.extract_image(document.path())?,
            FileKind::Pdf => self.extract_pdf(document.path())?,
        };

        tracing::info!(
            "Extracted {} chars from {} page(s) via {:?} in {}ms",
            text.text.len(),
            text.pages,
            text.source,
            start.elapsed().as_millis()
        );

        Ok(Extraction::Text(text))
    }

    fn extract_image(&self, path: &Path) -> Result<DocumentText, ExtractError> {
        let image = load_image(path)?;
        let text = self.pipeline.process_image(&image).map_err(|e| e.on_page(1))?;
        Ok(DocumentText {
            text,
            source: TextSource::Image,
            pages: 1,
        })
    }

    fn extract_pdf(&self, path: &Path) -> Result<DocumentText, ExtractError> {
        match extract_native_text(path) {
            NativeText::Found { text, pages } => {
                tracing::info!("Using embedded text layer ({} pages)", pages);
                return Ok(DocumentText {
                    text,
                    source: TextSource::Native,
                    pages,
                });
            }
            NativeText::Empty => {
                tracing::info!("PDF has no embedded text, rasterizing pages for OCR");
            }
            NativeText::Unavailable(reason) => {
                tracing::warn!("Embedded text unreadable ({}), rasterizing pages for OCR", reason);
            }
        }

        let images = self.rasterizer.rasterize(path, self.dpi)?;
        let pages = images.len();
        let texts = self.pipeline.run(images)?;

        Ok(DocumentText {
            text: join_pages(&texts),
            source: TextSource::Ocr,
            pages,
        })
    }
}

/// Decode an image file, trusting its content over its extension
fn load_image(path: &Path) -> Result<DynamicImage, ExtractError> {
    ImageReader::open(path)
        .map_err(|e| ExtractError::Decode(format!("Failed to open image: {}", e)))?
        .with_guessed_format()
        .map_err(|e| ExtractError::Decode(format!("Failed to read image: {}", e)))?
        .decode()
        .map_err(|e| ExtractError::Decode(format!("Failed to decode image: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_normalizes_extension() {
        assert_eq!(Document::new("/tmp/x", ".PDF").extension(), "pdf");
        assert_eq!(Document::from_path("/tmp/Bill.JPeG").extension(), "jpeg");
        assert_eq!(Document::from_path("/tmp/README").extension(), "");
    }

    #[test]
    fn test_classify_extensions() {
        for ext in ["png", "jpg", "jpeg", "tiff"] {
            assert_eq!(classify(ext), Some(FileKind::Image), "{}", ext);
        }
        assert_eq!(classify("pdf"), Some(FileKind::Pdf));
        assert_eq!(classify("docx"), None);
        assert_eq!(classify("tif"), None);
    }

    #[test]
    fn test_is_supported_accepts_dotted_forms() {
        assert!(is_supported(".PNG"));
        assert!(!is_supported(".gif"));
    }

    #[test]
    fn test_unsupported_display_names_extension() {
        let result = Extraction::UnsupportedFormat {
            extension: "docx".to_string(),
        };
        assert_eq!(result.to_string(), "Unsupported file type: .docx");
        assert_eq!(result.text(), None);
    }

    #[test]
    fn test_unsupported_display_without_extension() {
        let result = Extraction::UnsupportedFormat {
            extension: String::new(),
        };
        assert_eq!(result.to_string(), "Unsupported file type: (no extension)");
    }
}
