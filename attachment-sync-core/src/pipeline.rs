//! Media transfer pipeline: download → size policy → embed or link.
//!
//! Given a batch of [`MediaReference`]s the pipeline downloads each one in
//! full, then either hands the bytes to an [`EmbedTarget`] (payloads up to
//! [`EMBED_LIMIT_BYTES`]) or produces a [`Placement::Linked`] result pointing
//! at the original URL without any upload attempt.
//!
//! # Concurrency
//! At most [`MAX_IN_FLIGHT`] references are being transferred at any instant.
//! References are admitted in submission order; completion order is
//! unspecified, so every result carries the `origin` of its reference.
//!
//! # Failure
//! No retries by default. Admitted transfers are never cancelled: the batch
//! runs to the end, then [`transfer_all`] reports the first failure in
//! completion order and discards the rest. [`transfer_settled`] exposes every
//! per-reference outcome for callers that want partial results.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mockall::automock;
use tracing::{debug, error, info, warn};

use crate::contract::{MediaFetcher, MediaReference, Placement, TransferredFile};
use crate::error::{SyncError, SyncResult};
use crate::media::{kind_for, mime_for, placement_for, truncate_name, EMBED_LIMIT_BYTES};

/// Fixed bound on concurrently transferred references.
pub const MAX_IN_FLIGHT: usize = 3;

/// A fully downloaded reference, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedMedia {
    pub reference: MediaReference,
    /// Truncated name to use at the destination.
    pub display_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Destination that can store bytes and hand back a pointer to them.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait EmbedTarget: Send + Sync {
    /// Store the bytes, returning the destination's id for them.
    async fn embed(&self, media: DownloadedMedia) -> SyncResult<String>;
}

/// Decides whether a failed transfer attempt is tried again.
pub trait RetryPolicy: Send + Sync {
    /// Delay before attempt `attempt + 1`, or `None` to give up.
    /// `attempt` counts from 1.
    fn next_delay(&self, attempt: u32, error: &SyncError) -> Option<Duration>;
}

/// Never retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryPolicy for NoRetry {
    fn next_delay(&self, _attempt: u32, _error: &SyncError) -> Option<Duration> {
        None
    }
}

/// Retry non-client errors up to `max_attempts` total attempts, waiting `delay` in between.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy for FixedBackoff {
    fn next_delay(&self, attempt: u32, error: &SyncError) -> Option<Duration> {
        if error.is_client_error() || attempt >= self.max_attempts {
            None
        } else {
            Some(self.delay)
        }
    }
}

/// Per-batch knobs. The concurrency bound is fixed at [`MAX_IN_FLIGHT`].
#[derive(Clone)]
pub struct TransferOptions {
    /// Sleep after each completed transfer.
    pub pacing: Option<Duration>,
    pub retry: Arc<dyn RetryPolicy>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            pacing: None,
            retry: Arc::new(NoRetry),
        }
    }
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

/// Settled result for one reference.
#[derive(Debug)]
pub struct TransferOutcome {
    pub origin: String,
    pub result: SyncResult<TransferredFile>,
}

/// Transfer every reference and return each outcome, in completion order.
pub async fn transfer_settled<F, T>(
    fetcher: &F,
    target: &T,
    references: Vec<MediaReference>,
    options: &TransferOptions,
) -> Vec<TransferOutcome>
where
    F: MediaFetcher + ?Sized,
    T: EmbedTarget + ?Sized,
{
    info!(
        references = references.len(),
        max_in_flight = MAX_IN_FLIGHT,
        "[TRANSFER] Starting batch"
    );
    stream::iter(references)
        .map(|reference| transfer_one(fetcher, target, reference, options))
        .buffer_unordered(MAX_IN_FLIGHT)
        .collect::<Vec<_>>()
        .await
}

/// Transfer every reference; fail with the first error if any transfer failed.
pub async fn transfer_all<F, T>(
    fetcher: &F,
    target: &T,
    references: Vec<MediaReference>,
    options: &TransferOptions,
) -> SyncResult<Vec<TransferredFile>>
where
    F: MediaFetcher + ?Sized,
    T: EmbedTarget + ?Sized,
{
    let outcomes = transfer_settled(fetcher, target, references, options).await;
    let total = outcomes.len();

    let mut transferred = Vec::with_capacity(total);
    let mut first_error = None;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome.result {
            Ok(file) => transferred.push(file),
            Err(e) => {
                failed += 1;
                error!(origin = %outcome.origin, error = %e, "[TRANSFER][ERROR] Reference failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => {
            error!(
                succeeded = transferred.len(),
                failed,
                total,
                "[TRANSFER][ERROR] Batch aborted, discarding completed transfers"
            );
            Err(e)
        }
        None => {
            info!(transferred = transferred.len(), "[TRANSFER] Batch complete");
            Ok(transferred)
        }
    }
}

async fn transfer_one<F, T>(
    fetcher: &F,
    target: &T,
    reference: MediaReference,
    options: &TransferOptions,
) -> TransferOutcome
where
    F: MediaFetcher + ?Sized,
    T: EmbedTarget + ?Sized,
{
    let origin = reference.origin.clone();
    let mut attempt = 0u32;
    let result = loop {
        attempt += 1;
        match attempt_transfer(fetcher, target, &reference).await {
            Ok(file) => break Ok(file),
            Err(e) => match options.retry.next_delay(attempt, &e) {
                Some(delay) => {
                    warn!(origin = %origin, attempt, error = %e, ?delay, "[TRANSFER] Retrying reference");
                    tokio::time::sleep(delay).await;
                }
                None => break Err(e),
            },
        }
    };

    if let Some(pacing) = options.pacing {
        tokio::time::sleep(pacing).await;
    }
    TransferOutcome { origin, result }
}

async fn attempt_transfer<F, T>(
    fetcher: &F,
    target: &T,
    reference: &MediaReference,
) -> SyncResult<TransferredFile>
where
    F: MediaFetcher + ?Sized,
    T: EmbedTarget + ?Sized,
{
    let bytes = fetcher.fetch(&reference.source_url).await?;
    let display_name = truncate_name(&reference.name);
    let kind = kind_for(&reference.name);
    debug!(origin = %reference.origin, bytes = bytes.len(), declared = ?reference.declared_size, "[TRANSFER] Downloaded");

    match placement_for(bytes.len()) {
        Placement::Linked => {
            info!(
                origin = %reference.origin,
                bytes = bytes.len(),
                limit = EMBED_LIMIT_BYTES,
                "[TRANSFER] Oversized, linking to source"
            );
            Ok(TransferredFile {
                origin: reference.origin.clone(),
                display_name,
                placement: Placement::Linked,
                destination: reference.source_url.clone(),
                kind,
            })
        }
        Placement::Embedded => {
            let content_type = reference
                .mime_hint
                .clone()
                .unwrap_or_else(|| mime_for(&reference.name).to_string());
            let destination = target
                .embed(DownloadedMedia {
                    reference: reference.clone(),
                    display_name: display_name.clone(),
                    content_type,
                    bytes,
                })
                .await?;
            info!(origin = %reference.origin, destination = %destination, "[TRANSFER] Embedded");
            Ok(TransferredFile {
                origin: reference.origin.clone(),
                display_name,
                placement: Placement::Embedded,
                destination,
                kind,
            })
        }
    }
}
