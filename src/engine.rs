use crate::error::ExtractError;
use image::GrayImage;

/// Trait that all text recognition engines must implement.
///
/// An engine is built once at startup and shared (behind an `Arc`) by every
/// page job, so `recognize` takes `&self` and must be safe to call from
/// several threads at once. Engines whose backend is not thread-safe are
/// responsible for their own locking.
pub trait Recognizer: Send + Sync {
    /// Returns the engine identifier (e.g., "ocrs", "leptess")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a preprocessed (binarized) image.
    ///
    /// Returns text fragments in the engine's reading order, one per
    /// line or paragraph it segmented.
    fn recognize(&self, image: &GrayImage) -> Result<Vec<String>, ExtractError>;
}
