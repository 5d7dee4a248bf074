//! Error kinds shared by the store, the workflow, and the HTTP facade.

use std::time::Duration;

use thiserror::Error;

use crate::models::DocumentStatus;

pub type Result<T, E = DocError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DocError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The status guard rejected a transition.
    #[error("document {id} is {from}, cannot move to {to}")]
    InvalidTransition {
        id: i64,
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("no completed documents to package")]
    EmptySelection,

    /// The review file could not be located or does not belong to the document.
    #[error("review file {path}: {reason}")]
    ReviewFile { path: String, reason: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("language model request failed: {0}")]
    ExternalService(String),

    #[error("language model request timed out after {}s", .0.as_secs())]
    GenerationTimeout(Duration),
}

impl DocError {
    /// Machine-readable kind, sent to HTTP callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound { .. } => "not_found",
            Self::EmptySelection => "empty_selection",
            Self::ReviewFile { .. } => "review_file_error",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::ExternalService(_) => "external_service_error",
            Self::GenerationTimeout(_) => "generation_timeout",
        }
    }

    /// Whether the same request may succeed if retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GenerationTimeout(_) | Self::StorageUnavailable(_))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn review_file(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::ReviewFile {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<rusqlite::Error> for DocError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

impl From<std::io::Error> for DocError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for DocError {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageUnavailable(format!("serialization failed: {}", e))
    }
}
