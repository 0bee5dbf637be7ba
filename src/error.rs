//! Error types for the FACEIT Overwatch stats pipeline

use thiserror::Error;


pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Sink failures are kept apart from data-quality drops so the upload
    /// can be retried without recomputing allocation.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("API key not provided and {env_var} environment variable not set")]
    MissingApiKey { env_var: String },

    #[error("Cache error: {message}")]
    Cache { message: String },

    /// An invariant that an earlier stage should have guaranteed did not hold.
    #[error("Precondition violated for match {match_id}: {message}")]
    Precondition { match_id: String, message: String },

    #[error("Invalid role: {role}")]
    InvalidRole { role: String },

    #[error("Invalid map type: {map_type}")]
    InvalidMapType { map_type: String },

    #[error("Invalid round selection: {value}")]
    InvalidRoundSelection { value: String },

    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("FACEIT API returned no data")]
    NoData,
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Input {
            message: format!("{err:#}"),
        }
    }
}

impl PipelineError {
    pub(crate) fn precondition(match_id: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Precondition {
            match_id: match_id.into(),
            message: message.into(),
        }
    }

    /// True for failures of the storage sink, which a caller may retry.
    pub fn is_storage(&self) -> bool {
        matches!(self, PipelineError::Storage(_))
    }
}
