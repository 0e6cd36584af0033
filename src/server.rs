use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::cache::{request_key, upload_key, ExplanationCache, ExtractionCache};
use crate::config::Config;
use crate::dispatch::{
    is_supported, Document, DocumentText, Extraction, Extractor, TextSource, DOCUMENT_EXTENSIONS,
    IMAGE_EXTENSIONS,
};
use crate::engines;
use crate::error::ApiError;
use crate::explain::{self, BillCategory, DetailLevel, ExplainError, Explainer, GeminiExplainer};

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub explainer: Option<Arc<dyn Explainer>>,
    pub cache: Arc<ExtractionCache>,
    pub explanations: Arc<ExplanationCache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        extractor: Extractor,
        explainer: Option<Arc<dyn Explainer>>,
        config: Config,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            explainer,
            cache: Arc::new(ExtractionCache::new(config.cache_capacity)),
            explanations: Arc::new(ExplanationCache::new(config.cache_capacity)),
            config: Arc::new(config),
        }
    }
}

/// Extraction response
#[derive(Serialize)]
pub struct ExtractResponse {
    pub text: String,
    pub source: TextSource,
    pub pages: usize,
    pub processing_time_ms: u64,
    pub cached: bool,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: String,
    pub engine_description: String,
    pub supported_extensions: Vec<String>,
    pub dpi: u32,
    pub max_file_size_bytes: usize,
    pub explainer_configured: bool,
}

#[derive(Deserialize)]
pub struct ExplainRequest {
    pub text: String,
    #[serde(default)]
    pub level: DetailLevel,
    #[serde(default)]
    pub category: BillCategory,
}

#[derive(Deserialize)]
pub struct FollowUpRequest {
    pub text: String,
    pub previous_explanation: String,
    pub question: String,
    #[serde(default)]
    pub category: BillCategory,
}

#[derive(Serialize)]
pub struct ExplainResponse {
    pub explanation: String,
    pub processing_time_ms: u64,
    pub cached: bool,
}

/// Build the HTTP router over `state`
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .route("/extract", post(handle_extract))
        .route("/explain", post(handle_explain))
        .route("/explain/followup", post(handle_follow_up))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let recognizer = engines::create(&config)?;
    let extractor = Extractor::with_recognizer(recognizer, config.dpi)?;

    let explainer: Option<Arc<dyn Explainer>> = match &config.gemini_api_key {
        Some(key) => {
            tracing::info!("Explanations enabled using {}", config.gemini_model);
            Some(Arc::new(GeminiExplainer::new(
                key.clone(),
                config.gemini_model.clone(),
            )))
        }
        None => {
            tracing::warn!("GEMINI_API_KEY not set, explanation endpoints are disabled");
            None
        }
    };

    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(extractor, explainer, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Declared extension of an uploaded part: file name first, then content type
fn upload_extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .map(|ext| ext.to_string_lossy().to_lowercase());
    if let Some(ext) = from_name {
        return ext;
    }

    let from_mime = match content_type.unwrap_or_default() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/tiff" => "tiff",
        "application/pdf" => "pdf",
        _ => "",
    };
    from_mime.to_string()
}

/// Handle extraction requests
async fn handle_extract(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, ApiError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut extension = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        extension = upload_extension(field.file_name(), field.content_type());
        file_data = Some(field.bytes().await.map_err(|e| {
            ApiError::InvalidRequest(format!("Failed to read file data: {}", e))
        })?);
    }

    let data = file_data.ok_or(ApiError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(ApiError::FileTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    if !is_supported(&extension) {
        tracing::warn!("Rejected upload with extension {:?}", extension);
        return Err(ApiError::UnsupportedFormat(extension));
    }

    let key = upload_key(&data, &extension);
    if let Some(hit) = state.cache.get(&key) {
        tracing::info!("Extraction cache hit ({} bytes)", data.len());
        return Ok(Json(extract_response(hit, start, true)));
    }

    let mut temp_file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .map_err(|e| ApiError::Internal(format!("Failed to create temp file: {}", e)))?;
    temp_file
        .write_all(&data)
        .map_err(|e| ApiError::Internal(format!("Failed to write temp file: {}", e)))?;

    let extractor = state.extractor.clone();
    let document = Document::new(temp_file.path(), &extension);
    let extraction = tokio::task::spawn_blocking(move || {
        // Keep the file alive until extraction is done
        let _temp_file = temp_file;
        extractor.extract_text(&document)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Extraction task failed: {}", e)))??;

    let text = match extraction {
        Extraction::Text(text) => text,
        Extraction::UnsupportedFormat { extension } => {
            return Err(ApiError::UnsupportedFormat(extension));
        }
    };

    state.cache.insert(key, text.clone());
    Ok(Json(extract_response(text, start, false)))
}

fn extract_response(text: DocumentText, start: Instant, cached: bool) -> ExtractResponse {
    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Extraction finished in {}ms: {} chars, {} page(s), source {:?}",
        processing_time_ms,
        text.text.len(),
        text.pages,
        text.source
    );

    ExtractResponse {
        text: text.text,
        source: text.source,
        pages: text.pages,
        processing_time_ms,
        cached,
    }
}

fn configured_explainer(state: &AppState) -> Result<Arc<dyn Explainer>, ApiError> {
    state.explainer.clone().ok_or(ApiError::ExplainerUnavailable)
}

/// Serve `key` from the explanation cache, or run `ask` off the async threads and cache its answer
async fn cached_explanation<F>(
    state: &AppState,
    key: String,
    ask: F,
) -> Result<Json<ExplainResponse>, ApiError>
where
    F: FnOnce(&dyn Explainer) -> Result<String, ExplainError> + Send + 'static,
{
    let start = Instant::now();
    let explainer = configured_explainer(state)?;

    if let Some(explanation) = state.explanations.get(&key) {
        tracing::info!("Explanation cache hit");
        return Ok(Json(ExplainResponse {
            explanation,
            processing_time_ms: start.elapsed().as_millis() as u64,
            cached: true,
        }));
    }

    let explanation = tokio::task::spawn_blocking(move || ask(explainer.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("Explanation task failed: {}", e)))??;

    state.explanations.insert(key, explanation.clone());
    Ok(Json(ExplainResponse {
        explanation,
        processing_time_ms: start.elapsed().as_millis() as u64,
        cached: false,
    }))
}

/// Handle initial explanation requests
async fn handle_explain(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    configured_explainer(&state)?;
    if request.text.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Bill text is empty".to_string()));
    }

    let level = format!("{:?}", request.level);
    let category = request.category.to_string();
    let key = request_key(&["explain", request.text.as_str(), level.as_str(), category.as_str()]);

    cached_explanation(&state, key, move |explainer| {
        explain::explain_bill(explainer, &request.text, request.level, &request.category)
    })
    .await
}

/// Handle follow-up questions about an earlier explanation
async fn handle_follow_up(
    State(state): State<AppState>,
    Json(request): Json<FollowUpRequest>,
) -> Result<Json<ExplainResponse>, ApiError> {
    configured_explainer(&state)?;
    if request.question.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Question is empty".to_string()));
    }

    let category = request.category.to_string();
    let key = request_key(&[
        "followup",
        request.text.as_str(),
        request.previous_explanation.as_str(),
        request.question.as_str(),
        category.as_str(),
    ]);

    cached_explanation(&state, key, move |explainer| {
        explain::answer_follow_up(
            explainer,
            &request.text,
            &request.previous_explanation,
            &request.question,
            &request.category,
        )
    })
    .await
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let recognizer = state.extractor.recognizer();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: recognizer.name().to_string(),
        engine_description: recognizer.description().to_string(),
        supported_extensions: IMAGE_EXTENSIONS
            .iter()
            .chain(DOCUMENT_EXTENSIONS)
            .map(|ext| format!(".{}", ext))
            .collect(),
        dpi: state.extractor.dpi(),
        max_file_size_bytes: state.config.max_file_size,
        explainer_configured: state.explainer.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_prefers_file_name() {
        assert_eq!(
            upload_extension(Some("Electric Bill.PDF"), Some("image/png")),
            "pdf"
        );
    }

    #[test]
    fn test_extension_falls_back_to_content_type() {
        assert_eq!(upload_extension(Some("scan"), Some("image/jpeg")), "jpg");
        assert_eq!(upload_extension(None, Some("application/pdf")), "pdf");
        assert_eq!(upload_extension(None, Some("text/plain")), "");
        assert_eq!(upload_extension(None, None), "");
    }
}
