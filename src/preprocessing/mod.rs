//! Image preprocessing for OCR
//!
//! Every page and photo goes through the same fixed pipeline before
//! recognition: grayscale, upscale small images, Otsu binarization.

pub mod pipeline;
pub mod steps;

pub use pipeline::{preprocess, PreprocessedImage, StepTiming};
