//! Embedded text layer extraction for digitally generated PDFs

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use crate::cleaner::clean_text;

/// Outcome of reading a PDF's embedded text layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeText {
    /// At least one page had text; cleaned pages joined by a blank line
    Found { text: String, pages: usize },
    /// The document opened, but no page carries any text (typical of scans)
    Empty,
    /// The text layer could not be read at all
    Unavailable(String),
}

/// Try to read the embedded text of every page in the PDF at `path`.
///
/// Never fails hard: parser errors and parser panics alike become
/// [`NativeText::Unavailable`], since the caller can still rasterize.
pub fn extract_native_text(path: &Path) -> NativeText {
    // pdf-extract panics on some malformed or exotic documents
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path)));

    let pages = match attempt {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => return NativeText::Unavailable(format!("Failed to parse PDF: {}", e)),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return NativeText::Unavailable(format!("PDF text extraction panicked: {}", reason));
        }
    };

    let total_pages = pages.len();
    let with_text = pages.iter().filter(|page| !page.trim().is_empty()).count();
    if with_text == 0 {
        return NativeText::Empty;
    }

    tracing::debug!(
        "Native text found on {} of {} pages",
        with_text,
        total_pages
    );

    // Pages holding nothing but noise contribute no block
    let cleaned: Vec<String> = pages
        .iter()
        .map(|page| clean_text(page))
        .filter(|page| !page.is_empty())
        .collect();

    NativeText::Found {
        text: cleaned.join("\n\n"),
        pages: total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_unavailable() {
        let result = extract_native_text(Path::new("/definitely/not/here.pdf"));
        assert!(matches!(result, NativeText::Unavailable(_)));
    }

    #[test]
    fn test_garbage_bytes_are_unavailable() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        std::fs::write(file.path(), b"this is not a pdf at all").unwrap();

        let result = extract_native_text(file.path());
        assert!(matches!(result, NativeText::Unavailable(_)));
    }
}
