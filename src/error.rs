//! Error types for the viewer controller.
//!
//! None of these ever escape an event handler: the controller logs them and
//! falls back to a state where the loading indicators are consistent.

/// Failure to read or drive the content frame's internals.
///
/// Routine: the frame may navigate to another origin at any moment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAccessError {
    /// The frame is showing a document from another origin.
    #[error("content frame is cross-origin")]
    CrossOrigin,

    /// The frame has no browsing context (detached or not yet created).
    #[error("content frame has no browsing context")]
    Detached,

    /// The host platform rejected the operation.
    #[error("content frame access failed: {0}")]
    Rejected(String),
}

/// Error while talking to the archive backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Invalid viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("archive name must not be empty")]
    EmptyArchive,

    #[error("archive name must not contain '/': {0}")]
    InvalidArchive(String),

    /// A duration or count that must be positive was zero.
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("malformed options: {0}")]
    Options(String),
}
