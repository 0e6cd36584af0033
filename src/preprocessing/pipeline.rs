use image::{DynamicImage, GrayImage};
use std::time::Instant;

use super::steps;

/// Timing information for a single preprocessing step
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: &'static str,
    pub time_ms: u64,
}

/// A binarized, single-channel image ready for recognition
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    pub image: GrayImage,
    /// Total preprocessing time in milliseconds
    pub total_time_ms: u64,
    /// Individual step timings
    pub steps: Vec<StepTiming>,
}

/// Run the preprocessing pipeline: grayscale, upscale if small, Otsu threshold.
///
/// Never fails; the output has the dimensions of the (possibly upscaled)
/// grayscale image.
pub fn preprocess(image: &DynamicImage) -> PreprocessedImage {
    let start = Instant::now();
    let mut timings = Vec::with_capacity(3);

    let gray = run_step("grayscale", &mut timings, || steps::grayscale::apply(image));
    let gray = run_step("upscale", &mut timings, || steps::upscale::apply(gray));
    let binary = run_step("threshold", &mut timings, || steps::threshold::apply(&gray));

    let result = PreprocessedImage {
        image: binary,
        total_time_ms: start.elapsed().as_millis() as u64,
        steps: timings,
    };

    tracing::debug!(
        width = result.image.width(),
        height = result.image.height(),
        total_time_ms = result.total_time_ms,
        "Preprocessed image"
    );

    result
}

fn run_step<F>(name: &'static str, timings: &mut Vec<StepTiming>, step_fn: F) -> GrayImage
where
    F: FnOnce() -> GrayImage,
{
    let step_start = Instant::now();
    let result = step_fn();
    timings.push(StepTiming {
        name,
        time_ms: step_start.elapsed().as_millis() as u64,
    });
    result
}
