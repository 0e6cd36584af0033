//! Gemini `generateContent` client

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ExplainError, Explainer};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Explanations can take a while for long, detailed bills
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Explainer backed by Google's Gemini REST API
pub struct GeminiExplainer {
    agent: ureq::Agent,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiExplainer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();

        Self {
            agent,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }
}

impl Explainer for GeminiExplainer {
    fn name(&self) -> &str {
        &self.model
    }

    fn explain(&self, prompt: &str) -> Result<String, ExplainError> {
        let body = serde_json::to_string(&GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        })
        .map_err(|e| ExplainError::Transport(format!("Failed to encode request: {}", e)))?;

        let response = self
            .agent
            .post(&self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .send(body)
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => ExplainError::Status(status),
                other => ExplainError::Transport(other.to_string()),
            })?;

        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| ExplainError::Transport(format!("Failed to read response: {}", e)))?;

        parse_response(&text)
    }
}

/// Pull the first candidate's text out of a `generateContent` response body
fn parse_response(body: &str) -> Result<String, ExplainError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ExplainError::InvalidResponse(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ExplainError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_joins_parts_and_trims() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  You owe "},{"text":"$45.  "}]}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "You owe $45.");
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(matches!(parse_response(body), Err(ExplainError::EmptyResponse)));
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            parse_response("<html>"),
            Err(ExplainError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_endpoint_uses_model_name() {
        let explainer = GeminiExplainer::new("key", "gemini-1.5-flash");
        assert!(explainer
            .endpoint()
            .ends_with("/models/gemini-1.5-flash:generateContent"));
    }
}
