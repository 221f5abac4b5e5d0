//! Plain GET retrieval of media bytes.
//!
//! Both sides hand out pre-signed URLs (board asset `public_url`, page
//! `file.url`), so no credentials are attached here.

use async_trait::async_trait;
use attachment_sync_core::contract::MediaFetcher;
use attachment_sync_core::SyncResult;
use reqwest::Client;
use tracing::debug;

use crate::http::{network_error, status_error};

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error("download", e))?;
        if !response.status().is_success() {
            return Err(status_error("download", response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_error("download body", e))?;
        debug!(len = bytes.len(), "[FETCH] Downloaded media");
        Ok(bytes.to_vec())
    }
}
