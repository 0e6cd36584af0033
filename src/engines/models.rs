//! Model and training-data downloads shared by the engines

use crate::error::ExtractError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Ensure `filename` exists in `dir`, downloading it from `url` if not, and return its path
pub fn ensure_model_downloaded(
    dir: &Path,
    url: &str,
    filename: &str,
) -> Result<PathBuf, ExtractError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ExtractError::Initialization(format!("Failed to create model directory: {}", e))
    })?;

    let model_path = dir.join(filename);

    if !model_path.exists() {
        tracing::info!("Downloading {} (this may take a moment)...", filename);
        download_file(url, &model_path)?;
        tracing::info!("Downloaded {} to {:?}", filename, model_path);
    } else {
        tracing::info!("Using cached model from {:?}", model_path);
    }

    Ok(model_path)
}

/// Download a file from URL to path using ureq.
///
/// Writes to a sibling file first so an interrupted download never leaves a
/// truncated model behind.
fn download_file(url: &str, path: &Path) -> Result<(), ExtractError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ExtractError::Initialization(format!("Failed to download model: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        ExtractError::Initialization(format!("Failed to read response body: {}", e))
    })?;

    let partial = path.with_extension("partial");
    let mut file = File::create(&partial).map_err(|e| {
        ExtractError::Initialization(format!("Failed to create model file: {}", e))
    })?;
    file.write_all(&buffer).map_err(|e| {
        ExtractError::Initialization(format!("Failed to write model file: {}", e))
    })?;
    std::fs::rename(&partial, path).map_err(|e| {
        ExtractError::Initialization(format!("Failed to move model into place: {}", e))
    })?;

    Ok(())
}
