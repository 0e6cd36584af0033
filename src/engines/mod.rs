//! Text recognition engine implementations
//!
//! This module contains implementations of the Recognizer trait for different
//! OCR backends. Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-ocrs")]
pub mod ocrs;

#[cfg(feature = "engine-leptess")]
pub mod leptess;

#[cfg(any(feature = "engine-ocrs", feature = "engine-leptess"))]
mod models;

use crate::config::Config;
use crate::engine::Recognizer;
use crate::error::ExtractError;
use std::sync::Arc;

/// Names of the engines compiled into this build, default first
pub fn available() -> Vec<&'static str> {
    let mut names = Vec::new();
    #[cfg(feature = "engine-ocrs")]
    names.push("ocrs");
    #[cfg(feature = "engine-leptess")]
    names.push("leptess");
    names
}

/// Build the recognizer selected by `config.engine`.
///
/// This loads models and is expensive; call it once per process and share
/// the returned handle.
pub fn create(config: &Config) -> Result<Arc<dyn Recognizer>, ExtractError> {
    let compiled = available();
    let name = match config.engine.as_deref() {
        Some(name) => name,
        None => compiled.first().copied().ok_or_else(|| {
            ExtractError::Initialization(
                "No OCR engines available. Build with --features engine-ocrs or --features engine-leptess".to_string(),
            )
        })?,
    };

    match name {
        #[cfg(feature = "engine-ocrs")]
        "ocrs" => {
            tracing::info!("Initializing ocrs engine...");
            Ok(Arc::new(ocrs::OcrsEngine::new(config)?))
        }
        #[cfg(feature = "engine-leptess")]
        "leptess" => {
            tracing::info!("Initializing leptess engine...");
            Ok(Arc::new(leptess::LeptessEngine::new(config)?))
        }
        other => Err(ExtractError::Initialization(format!(
            "Unknown OCR engine '{}' (available: {})",
            other,
            compiled.join(", ")
        ))),
    }
}
