//! OCRS engine implementation
//!
//! Pure Rust OCR engine using the ocrs library. No system dependencies required.
//! Downloads neural network models automatically on first use.

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::ExtractError;
use image::buffer::ConvertBuffer;
use image::{GrayImage, RgbImage};
use ocrs::{DecodeMethod, ImageSource, OcrEngine as OcrsOcrEngine, OcrEngineParams};
use rten::Model;

use super::models::ensure_model_downloaded;

/// Default model URLs from the ocrs project
const DETECTION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-detection.rten";
const RECOGNITION_MODEL_URL: &str =
    "https://ocrs-models.s3-accelerate.amazonaws.com/text-recognition.rten";

/// Recognizer wrapping the ocrs library.
///
/// `ocrs::OcrEngine` holds only immutable model weights once built, so one
/// instance is shared by all page jobs without a lock.
pub struct OcrsEngine {
    engine: OcrsOcrEngine,
}

impl OcrsEngine {
    /// Load the detection and recognition models, downloading them if needed
    pub fn new(config: &Config) -> Result<Self, ExtractError> {
        let detection_model_path =
            ensure_model_downloaded(&config.model_dir, DETECTION_MODEL_URL, "text-detection.rten")?;
        let recognition_model_path = ensure_model_downloaded(
            &config.model_dir,
            RECOGNITION_MODEL_URL,
            "text-recognition.rten",
        )?;

        let detection_model = Model::load_file(&detection_model_path).map_err(|e| {
            ExtractError::Initialization(format!("Failed to load detection model: {}", e))
        })?;
        let recognition_model = Model::load_file(&recognition_model_path).map_err(|e| {
            ExtractError::Initialization(format!("Failed to load recognition model: {}", e))
        })?;

        let engine = OcrsOcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            decode_method: DecodeMethod::Greedy,
            ..Default::default()
        })
        .map_err(|e| {
            ExtractError::Initialization(format!("Failed to create OCR engine: {}", e))
        })?;

        tracing::info!("ocrs engine initialized successfully");

        Ok(Self { engine })
    }
}

impl Recognizer for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    fn description(&self) -> &'static str {
        "Pure Rust OCR engine - fast, no system dependencies required"
    }

    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, ExtractError> {
        let failed = |stage: &str, e: &dyn std::fmt::Display| ExtractError::Recognition {
            page: 0,
            reason: format!("{}: {}", stage, e),
        };

        // ImageSource::from_bytes expects HWC RGB bytes
        let rgb: RgbImage = image.convert();
        let dimensions = rgb.dimensions();

        let img_source = ImageSource::from_bytes(rgb.as_raw(), dimensions)
            .map_err(|e| failed("Failed to create image source", &e))?;

        let ocr_input = self
            .engine
            .prepare_input(img_source)
            .map_err(|e| failed("Failed to prepare input", &e))?;

        let word_rects = self
            .engine
            .detect_words(&ocr_input)
            .map_err(|e| failed("Failed to detect words", &e))?;

        let line_rects = self.engine.find_text_lines(&ocr_input, &word_rects);

        let line_texts = self
            .engine
            .recognize_text(&ocr_input, &line_rects)
            .map_err(|e| failed("Failed to recognize text", &e))?;

        Ok(line_texts
            .iter()
            .filter_map(|line| line.as_ref())
            .map(|line| {
                line.words()
                    .map(|word| word.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_shareable<T: Send + Sync>() {}

    #[test]
    fn test_engine_is_shareable_across_page_jobs() {
        assert_shareable::<OcrsEngine>();
    }
}
