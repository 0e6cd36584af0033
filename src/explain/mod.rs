//! Plain-language bill explanations from a hosted language model
//!
//! The model is an opaque collaborator: extracted text goes in as a
//! prompt, explanation text comes out. Prompt wording lives in [`prompt`],
//! the Gemini client in [`gemini`].

pub mod gemini;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub use gemini::GeminiExplainer;

#[derive(Error, Debug)]
pub enum ExplainError {
    #[error("Request to language model failed: {0}")]
    Transport(String),

    #[error("Language model returned HTTP {0}")]
    Status(u16),

    #[error("Unexpected language model response: {0}")]
    InvalidResponse(String),

    #[error("Language model returned no text")]
    EmptyResponse,
}

/// Something that turns a prompt into explanation text
pub trait Explainer: Send + Sync {
    fn name(&self) -> &str;

    /// Send `prompt` and return the model's answer, trimmed
    fn explain(&self, prompt: &str) -> Result<String, ExplainError>;
}

/// How much detail the explanation should go into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Detailed,
}

/// What kind of bill the user says this is
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BillCategory {
    #[default]
    AutoDetect,
    Utility,
    Medical,
    Financial,
    RentMortgage,
    Subscription,
    Insurance,
    Other(String),
}

impl BillCategory {
    /// Phrase naming the bill in the prompt ("utility bills", "any bill")
    pub fn subject(&self) -> String {
        match self {
            BillCategory::AutoDetect => "any bill".to_string(),
            other => format!("{} bills", other.to_string().to_lowercase()),
        }
    }
}

impl From<String> for BillCategory {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "" | "auto" | "auto-detect" | "autodetect" => BillCategory::AutoDetect,
            "utility" => BillCategory::Utility,
            "medical" => BillCategory::Medical,
            "financial" | "financial (credit card/bank)" | "credit card" | "bank" => {
                BillCategory::Financial
            }
            "rent" | "mortgage" | "rent/mortgage" => BillCategory::RentMortgage,
            "subscription" => BillCategory::Subscription,
            "insurance" => BillCategory::Insurance,
            _ => BillCategory::Other(value.trim().to_string()),
        }
    }
}

impl From<BillCategory> for String {
    fn from(category: BillCategory) -> Self {
        category.to_string()
    }
}

impl fmt::Display for BillCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BillCategory::AutoDetect => "Auto-detect",
            BillCategory::Utility => "Utility",
            BillCategory::Medical => "Medical",
            BillCategory::Financial => "Financial",
            BillCategory::RentMortgage => "Rent/Mortgage",
            BillCategory::Subscription => "Subscription",
            BillCategory::Insurance => "Insurance",
            BillCategory::Other(name) => name,
        };
        f.write_str(label)
    }
}

/// Explain a bill for the first time
pub fn explain_bill(
    explainer: &dyn Explainer,
    bill_text: &str,
    level: DetailLevel,
    category: &BillCategory,
) -> Result<String, ExplainError> {
    let prompt = prompt::initial(bill_text, level, category);
    tracing::debug!(
        "Requesting {:?} explanation ({} prompt chars) from {}",
        level,
        prompt.len(),
        explainer.name()
    );
    explainer.explain(&prompt)
}

/// Answer a follow-up question about a bill already explained
pub fn answer_follow_up(
    explainer: &dyn Explainer,
    bill_text: &str,
    previous_explanation: &str,
    question: &str,
    category: &BillCategory,
) -> Result<String, ExplainError> {
    let prompt = prompt::follow_up(bill_text, previous_explanation, question, category);
    tracing::debug!(
        "Requesting follow-up answer ({} prompt chars) from {}",
        prompt.len(),
        explainer.name()
    );
    explainer.explain(&prompt)
}
