use thiserror::Error;

// Main Engine Error Type

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Failed to load remedy catalog: {0}")]
    CatalogLoadFailed(String),
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Assessment task failed: {0}")]
    Task(String),
    #[error("Failed to read {1}: {0}")]
    ReadError(std::io::Error, String),
    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

// Backend Error Type
//
// Cloneable so a failed initialization can be cached and replayed to every caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

impl BackendError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn inference(reason: impl Into<String>) -> Self {
        Self::InferenceFailed(reason.into())
    }

    /// The bare reason, without the variant prefix.
    pub fn reason(&self) -> &str {
        match self {
            Self::Unavailable(reason) | Self::InferenceFailed(reason) => reason,
        }
    }
}
