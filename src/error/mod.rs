//! Error types for difftide.

use thiserror::Error;

/// Primary error type for all difftide operations.
#[derive(Error, Debug)]
pub enum DifftideError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("No AI provider configured. Please add a provider in settings.")]
    NoProvider,

    #[error("No model selected for provider {0}.")]
    NoModel(String),

    #[error("No changes detected.")]
    NoChanges,

    #[error("Received empty response from AI provider.")]
    EmptyResponse,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Generation cancelled")]
    Cancelled,
}

impl DifftideError {
    /// Create an API error from a status code and response body.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether this error stems from local configuration rather than a
    /// remote failure. The CLI uses this to skip printing a backtrace hint.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::NoProvider | Self::NoModel(_)
        )
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DifftideError>;
