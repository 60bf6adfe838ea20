//! Error types for LexCheck
//!
//! The variants mirror the stages of the analysis pipeline. Only
//! [`Error::Aggregation`] is fatal for a run; every per-sentence variant is
//! recovered locally by the stage that observes it.

/// Result type alias using LexCheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for LexCheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Irregular text that could not be segmented
    #[error("segmentation error: {0}")]
    Segmentation(String),

    /// Provision index or embedding provider unavailable
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Primary verdict classifier failed or returned an invalid payload
    #[error("classification error: {0}")]
    Classification(String),

    /// Rationale generation failed
    #[error("rationale error: {0}")]
    Rationale(String),

    /// Executive summary generation failed
    #[error("summarization error: {0}")]
    Summarization(String),

    /// Structural failure while assembling a report
    #[error("aggregation error: {0}")]
    Aggregation(String),

    /// Completion endpoint returned an unusable response
    #[error("llm error: {0}")]
    Llm(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Timeout errors
    #[error("operation timed out")]
    Timeout,

    /// The run was cancelled cooperatively
    #[error("operation cancelled")]
    Cancelled,

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new segmentation error
    pub fn segmentation(msg: impl Into<String>) -> Self {
        Self::Segmentation(msg.into())
    }

    /// Create a new retrieval error
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    /// Create a new classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a new rationale error
    pub fn rationale(msg: impl Into<String>) -> Self {
        Self::Rationale(msg.into())
    }

    /// Create a new summarization error
    pub fn summarization(msg: impl Into<String>) -> Self {
        Self::Summarization(msg.into())
    }

    /// Create a new aggregation error
    pub fn aggregation(msg: impl Into<String>) -> Self {
        Self::Aggregation(msg.into())
    }

    /// Create a new llm error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts and 5xx/429 responses are transient;
    /// malformed payloads and client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout => true,
            Self::Io(_) => true,
            Self::Http(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    return true;
                }
                e.status()
                    .map(|s| s.is_server_error() || s.as_u16() == 429)
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}
