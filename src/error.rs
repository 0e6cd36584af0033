use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::dispatch::display_extension;
use crate::explain::ExplainError;

/// Fatal extraction failures.
///
/// Recoverable conditions (a PDF without a text layer, an unsupported
/// extension) never show up here: the first is handled by falling back to
/// rasterization and the second is reported as
/// [`Extraction::UnsupportedFormat`](crate::dispatch::Extraction).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to initialize OCR engine: {0}")]
    Initialization(String),

    #[error("Failed to load image: {0}")]
    Decode(String),

    #[error("Failed to rasterize document: {0}")]
    Rasterization(String),

    #[error("Text recognition failed on page {page}: {reason}")]
    Recognition { page: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Tag a recognizer failure with the (1-based) page it happened on.
    pub fn on_page(self, page: usize) -> Self {
        match self {
            ExtractError::Recognition { reason, .. } => ExtractError::Recognition { page, reason },
            other => ExtractError::Recognition {
                page,
                reason: other.to_string(),
            },
        }
    }
}

/// Errors returned by the HTTP layer
#[derive(Error, Debug)]
pub enum ApiError {
    /// Declared extension, without the leading dot
    #[error("Unsupported file type: {}", display_extension(.0))]
    UnsupportedFormat(String),

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("Explanation service is not configured")]
    ExplainerUnavailable,

    #[error("Explanation failed: {0}")]
    Explanation(#[from] ExplainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_FORMAT")
            }
            ApiError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ApiError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ApiError::Extraction(ExtractError::Decode(_))
            | ApiError::Extraction(ExtractError::Rasterization(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EXTRACTION_FAILED")
            }
            ApiError::Extraction(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXTRACTION_FAILED"),
            ApiError::ExplainerUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "EXPLAINER_UNAVAILABLE")
            }
            ApiError::Explanation(_) => (StatusCode::BAD_GATEWAY, "EXPLANATION_FAILED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_page_relabels_recognition_error() {
        let err = ExtractError::Recognition {
            page: 0,
            reason: "model exploded".to_string(),
        }
        .on_page(3);
        assert_eq!(
            err.to_string(),
            "Text recognition failed on page 3: model exploded"
        );
    }

    #[test]
    fn test_on_page_wraps_other_errors() {
        let err = ExtractError::Decode("bad header".to_string()).on_page(2);
        assert!(matches!(err, ExtractError::Recognition { page: 2, .. }));
        assert!(err.to_string().contains("bad header"));
    }

    #[test]
    fn test_unsupported_format_status() {
        let response = ApiError::UnsupportedFormat("docx".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_unsupported_format_message_names_extension() {
        assert_eq!(
            ApiError::UnsupportedFormat("docx".to_string()).to_string(),
            "Unsupported file type: .docx"
        );
        assert_eq!(
            ApiError::UnsupportedFormat(String::new()).to_string(),
            "Unsupported file type: (no extension)"
        );
    }

    #[test]
    fn test_rasterization_failure_is_unprocessable() {
        let response =
            ApiError::from(ExtractError::Rasterization("corrupt xref".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
