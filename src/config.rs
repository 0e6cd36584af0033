use clap::Parser;
use std::path::PathBuf;

use crate::raster::DEFAULT_DPI;

#[derive(Parser, Debug)]
#[command(name = "explain-my-bill-server")]
#[command(about = "Extracts text from bills (PDF or image) and explains them in plain language")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "EMB_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "EMB_PORT", default_value = "9393")]
    pub port: u16,

    /// OCR engine to use ("ocrs" or "leptess"); defaults to the first compiled-in engine
    #[arg(long, env = "EMB_ENGINE")]
    pub engine: Option<String>,

    /// Resolution used when rasterizing scanned PDF pages
    #[arg(long, env = "EMB_DPI", default_value_t = DEFAULT_DPI)]
    pub dpi: u32,

    /// Maximum upload size in bytes (default: 50MB)
    #[arg(long, env = "EMB_MAX_FILE_SIZE", default_value = "52428800")]
    pub max_file_size: usize,

    /// Directory holding downloaded recognition models (defaults to the user cache dir)
    #[arg(long, env = "EMB_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Recognition language for engines that support one (e.g., "eng", "deu")
    #[arg(long, env = "EMB_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Gemini API key; explanation endpoints are disabled without it
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for explanations
    #[arg(long, env = "EMB_GEMINI_MODEL", default_value = "gemini-1.5-flash")]
    pub gemini_model: String,

    /// Number of extraction results kept in memory (0 disables caching)
    #[arg(long, env = "EMB_CACHE_CAPACITY", default_value = "64")]
    pub cache_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub engine: Option<String>,
    pub dpi: u32,
    pub max_file_size: usize,
    pub model_dir: PathBuf,
    pub tessdata_path: Option<String>,
    pub language: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub cache_capacity: usize,
}

impl Config {
    /// Cache directory used when `--model-dir` is not given
    pub fn default_model_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("explain-my-bill")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9393,
            engine: None,
            dpi: DEFAULT_DPI,
            max_file_size: 50 * 1024 * 1024,
            model_dir: Self::default_model_dir(),
            tessdata_path: None,
            language: "eng".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            cache_capacity: 64,
        }
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            engine: args.engine,
            dpi: args.dpi,
            max_file_size: args.max_file_size,
            model_dir: args.model_dir.unwrap_or_else(Self::default_model_dir),
            tessdata_path: args.tessdata_path,
            language: args.language,
            // An empty key in the environment means "not configured"
            gemini_api_key: args.gemini_api_key.filter(|key| !key.trim().is_empty()),
            gemini_model: args.gemini_model,
            cache_capacity: args.cache_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["explain-my-bill-server"]).unwrap();
        let config = Config::from(args);
        assert_eq!(config.dpi, 150);
        assert_eq!(config.max_file_size, 52_428_800);
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let args =
            Args::try_parse_from(["explain-my-bill-server", "--gemini-api-key", "  "]).unwrap();
        assert!(Config::from(args).gemini_api_key.is_none());
    }
}
