//! Leptess/Tesseract engine implementation
//!
//! Tesseract-based OCR engine. Better for noisy/messy images like phone photos.
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use.

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::ExtractError;
use image::GrayImage;
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use tesseract_static::tesseract::Tesseract;

use super::models::ensure_model_downloaded;

/// A BMP-encoded page and where to send its text
type Job = (Vec<u8>, mpsc::Sender<Result<String, String>>);

/// Tesseract OCR Engine.
///
/// A Tesseract handle is not thread-safe, so it lives on one dedicated
/// worker thread and pages are queued to it over a channel. Concurrent page
/// jobs wait their turn; recognition with this engine is serialized.
pub struct LeptessEngine {
    jobs: mpsc::Sender<Job>,
}

impl LeptessEngine {
    /// Create a new Tesseract-based OCR engine
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        let language = config.language.clone();

        let tessdata_path = match &config.tessdata_path {
            Some(path) => path.clone(),
            None => ensure_tessdata_available(&config.model_dir.join("tessdata"), &language)?,
        };

        let (jobs, queue) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker_tessdata = tessdata_path.clone();
        let worker_language = language.clone();
        thread::Builder::new()
            .name("tesseract".to_string())
            .spawn(move || {
                let init = Tesseract::new(
                    Some(worker_tessdata.as_str()),
                    Some(worker_language.as_str()),
                );
                let tess = match init {
                    Ok(tess) => tess,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                let mut slot = Some(tess);
                // Ends when the engine, and with it the last sender, is dropped
                for (bmp, reply) in queue {
                    let result = recognize_bmp(&mut slot, &worker_tessdata, &worker_language, &bmp);
                    let _ = reply.send(result);
                }
            })
            .map_err(|e| {
                ExtractError::Initialization(format!("Failed to start Tesseract worker: {}", e))
            })?;

        ready_rx
            .recv()
            .map_err(|_| ExtractError::Initialization("Tesseract worker exited".to_string()))?
            .map_err(|e| {
                ExtractError::Initialization(format!("Failed to initialize Tesseract: {}", e))
            })?;

        tracing::info!(
            "Leptess engine initialized (tessdata: {}, language: {})",
            tessdata_path,
            language
        );

        Ok(Self { jobs })
    }
}

/// Run one page through the worker's Tesseract handle.
///
/// A failed call consumes the handle; it is rebuilt lazily on the next page.
fn recognize_bmp(
    slot: &mut Option<Tesseract>,
    tessdata_path: &str,
    language: &str,
    bmp: &[u8],
) -> Result<String, String> {
    let tess = match slot.take() {
        Some(tess) => tess,
        None => Tesseract::new(Some(tessdata_path), Some(language))
            .map_err(|e| format!("Failed to re-create Tesseract: {}", e))?,
    };

    let mut tess = tess
        .set_image_from_mem(bmp)
        .map_err(|e| format!("Failed to set image: {}", e))?
        .recognize()
        .map_err(|e| format!("Failed to recognize text: {}", e))?;

    let text = tess
        .get_text()
        .map_err(|e| format!("Failed to get text: {}", e))?;

    *slot = Some(tess);
    Ok(text)
}

impl Recognizer for LeptessEngine {
    fn name(&self) -> &'static str {
        "leptess"
    }

    fn description(&self) -> &'static str {
        "Tesseract OCR engine - better for noisy/messy images like phone photos"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, ExtractError> {
        let failed = |reason: String| ExtractError::Recognition { page: 0, reason };

        // BMP is always supported by leptonica
        let mut bmp = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bmp), image::ImageFormat::Bmp)
            .map_err(|e| failed(format!("Failed to convert to BMP: {}", e)))?;

        let (reply, answer) = mpsc::channel();
        self.jobs
            .send((bmp, reply))
            .map_err(|_| failed("Tesseract worker is gone".to_string()))?;
        let text = answer
            .recv()
            .map_err(|_| failed("Tesseract worker is gone".to_string()))?
            .map_err(failed)?;

        // Tesseract separates paragraphs with blank lines
        Ok(text
            .split("\n\n")
            .map(|paragraph| paragraph.trim().to_string())
            .filter(|paragraph| !paragraph.is_empty())
            .collect())
    }
}

/// Ensure tessdata for `language` is in `dir`, returning the directory path
/// (Tesseract expects the directory, not the file)
fn ensure_tessdata_available(dir: &Path, language: &str) -> Result<String, ExtractError> {
    let traineddata_file = format!("{}.traineddata", language);
    ensure_model_downloaded(dir, &tessdata_url(language), &traineddata_file)?;

    dir.to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| ExtractError::Initialization("Invalid tessdata path".to_string()))
}

/// Get tessdata download URL for a language
fn tessdata_url(language: &str) -> String {
    // Use tessdata_fast for smaller, faster downloads
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}
