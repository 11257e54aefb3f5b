//! Errors that can be raised while reconciling the board
//!
//! Only [`SyncError::Configuration`] is fatal, and only at startup.
//! Everything else is raised per operation, logged by the caller and skipped until the next tick.

use thiserror::Error;

/// A name lookup that missed on one of the capability sources
#[derive(Clone, Debug, PartialEq, Error)]
pub enum LookupError {
    #[error("no sprint is currently active")]
    NoActiveSprint,
    #[error("unknown recipient {0}")]
    UnknownRecipient(String),
    #[error("unknown list {0}")]
    UnknownList(String),
    #[error("unknown custom field {0}")]
    UnknownField(String),
    #[error("unknown label {0}")]
    UnknownLabel(String),
    #[error("unknown template card {0}")]
    UnknownTemplate(String),
    #[error("unknown card {0}")]
    UnknownCard(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Unknown board/chat/scrum selection, or unreadable settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Several open cards carry a marker that must be unique
    #[error("{count} open cards are associated with {marker}")]
    Conflict { marker: String, count: usize },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Network failure, rate limit or timeout. Retrying later may succeed
    #[error("transient I/O error: {0}")]
    Transient(String),

    /// A payload received by the entry point does not describe a task
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl SyncError {
    /// Whether this error should stop the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SyncError::Configuration(_))
    }

    pub fn transient<E: std::fmt::Display>(err: E) -> Self {
        SyncError::Transient(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::transient(err)
    }
}

impl From<tokio::time::error::Elapsed> for SyncError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        SyncError::Transient(format!("timed out ({})", err))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
