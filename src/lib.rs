//! Text extraction for bills (native PDF text, scanned PDFs, photos) with
//! optional plain-language explanations.

pub mod cache;
pub mod cleaner;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod engines;
pub mod error;
pub mod explain;
pub mod native;
pub mod page_pipeline;
pub mod preprocessing;
pub mod raster;
pub mod server;

pub use dispatch::{Document, DocumentText, Extraction, Extractor, TextSource};
pub use engine::Recognizer;
pub use error::ExtractError;
pub use raster::PageRasterizer;
