//! Error types for mapstyle
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::llm::LlmError;
use crate::render::RenderError;
use crate::session::Stage;

/// All error types that can occur while refining a style
#[derive(Debug, Error)]
pub enum StylerError {
    /// No fenced structured payload in a model reply
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Fenced payload present but not well-formed or of the wrong shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A reasoning stage exhausted its attempt budget
    #[error("{stage} produced no result after {attempts} attempts")]
    RetriesExhausted { stage: Stage, attempts: u32 },

    /// Style publish failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Static render failed
    #[error("Render error: {0}")]
    Render(String),

    /// Base style document is unusable
    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    /// The injected iteration guard tripped before acceptance
    #[error("No acceptance after {iterations} review iterations")]
    IterationLimit { iterations: u32 },

    /// Configuration problem (missing credential, bad path)
    #[error("Config error: {0}")]
    Config(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StylerError {
    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> i32 {
        match self {
            StylerError::Config(_) => 2,
            StylerError::InvalidStyle(_) => 3,
            StylerError::RetriesExhausted { .. } => 4,
            StylerError::MalformedResponse(_) | StylerError::InvalidPayload(_) => 5,
            StylerError::Publish(_) => 6,
            StylerError::Render(_) => 7,
            StylerError::IterationLimit { .. } => 8,
            StylerError::Llm(_) => 9,
            StylerError::Io(_) | StylerError::Json(_) => 10,
        }
    }
}

impl From<RenderError> for StylerError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Publish(msg) => StylerError::Publish(msg),
            other => StylerError::Render(other.to_string()),
        }
    }
}

/// Result type alias for mapstyle operations
pub type Result<T> = std::result::Result<T, StylerError>;
