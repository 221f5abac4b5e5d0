//! Error taxonomy shared by every component of the sync pipeline.
//!
//! Handlers map these onto HTTP status codes: [`SyncError::Validation`] is a
//! client error, everything else is a server-side failure. None of them are
//! retried unless a [`crate::pipeline::RetryPolicy`] says so.

use thiserror::Error;

/// Result alias used throughout the core crate.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Missing or malformed required input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The remote API answered, but with an application-level error payload.
    #[error("{0}")]
    UpstreamQuery(String),

    /// The remote system has no record for the requested identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Transport-level failure reaching a remote system.
    #[error("network error: {0}")]
    Network(String),

    /// Local persistence failed (seen ledger).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// True for errors caused by the caller rather than by a remote system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}
