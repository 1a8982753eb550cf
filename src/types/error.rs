//! Error types for stat-mixer
//!
//! One flat enum for every failure a query can report, a transport-neutral
//! code for each variant, and `From` conversions for errors raised while
//! reading and decoding rows.

/// Transport-neutral classification of a [`MixerError`].
///
/// An RPC layer maps these onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    Internal,
    Unavailable,
}

/// Main error type for stat-mixer operations
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A stored payload could not be decoded. Fatal for the whole batch.
    #[error("Decode error for row {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),

    /// Store or collaborator failure, propagated verbatim.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MixerError {
    /// Map the error onto its transport-neutral code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Decode { .. } => ErrorCode::Internal,
            Self::Internal(_) => ErrorCode::Internal,
            Self::Upstream(_) => ErrorCode::Unavailable,
            Self::Config(_) => ErrorCode::Internal,
        }
    }

    /// Shorthand for a decode failure on `key`
    pub fn decode(key: &str, reason: impl ToString) -> Self {
        Self::Decode {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for MixerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for MixerError {
    fn from(err: std::io::Error) -> Self {
        Self::Upstream(err.to_string())
    }
}

impl From<tokio::task::JoinError> for MixerError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Task failed: {}", err))
    }
}

/// Result type alias for stat-mixer operations
pub type Result<T> = std::result::Result<T, MixerError>;
