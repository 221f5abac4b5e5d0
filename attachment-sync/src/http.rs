//! Shared reqwest plumbing for the upstream clients.

use std::time::Duration;

use attachment_sync_core::SyncError;
use reqwest::{Client, Response};

/// One client per upstream, every request bounded by `timeout`.
pub fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("attachment-sync/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Transport failures (connect, timeout, body read) are network errors.
pub(crate) fn network_error(context: &str, e: reqwest::Error) -> SyncError {
    SyncError::Network(format!("{context}: {e}"))
}

/// Reads a non-success response into an upstream error carrying status and body.
pub(crate) async fn status_error(context: &str, response: Response) -> SyncError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return SyncError::NotFound(format!("{context}: {body}"));
    }
    SyncError::UpstreamQuery(format!("{context} failed with status {status}: {body}"))
}
