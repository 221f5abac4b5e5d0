//! High-level flows: orchestrate lister/crawler → pipeline → writer.
//!
//! Two directions are provided:
//!   - [`push_item_to_page`]: board item attachments → page files property and
//!     preview blocks. Creates the page when no target is given.
//!   - [`pull_page_to_board`]: media blocks newly added to a page → the files
//!     column of the board item that links to the page.
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first failing step aborts the flow and its
//!   error is returned unchanged for the caller to translate
//! - Tracing at every step boundary
//! - No state of its own: de-duplication goes through the injected
//!   [`SeenLedger`]. Push records the preview blocks it appends so the
//!   page-update webhook they trigger does not send them back to the board;
//!   pull records every block that reached the board, even when a sibling in
//!   the same batch failed
//!
//! # Callable From
//! - The HTTP server and the CLI one-shot commands
//! - Integration tests, with mocks for every trait seam

use std::collections::HashSet;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::assets::list_item_media;
use crate::contract::{BoardApi, MediaFetcher, PageApi, Placement, TransferredFile};
use crate::crawler::crawl_media;
use crate::error::{SyncError, SyncResult};
use crate::ledger::SeenLedger;
use crate::matcher::find_board_item;
use crate::pipeline::{transfer_all, transfer_settled, TransferOptions};
use crate::writer::{merge_into_page, BoardColumnTarget, PageUploadTarget};

/// Identifiers and knobs shared by both directions.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Board column holding the page URL an item belongs to.
    pub url_column_id: String,
    /// Board files column that receives pulled media.
    pub files_column_id: String,
    pub transfer: TransferOptions,
}

/// Result of a push.
#[derive(Debug, Serialize)]
pub struct PushReport {
    pub page_id: String,
    /// Set when the page was created by this push.
    pub url: Option<String>,
    /// Entries newly added to the page's files property.
    pub attachments: usize,
    pub transferred: Vec<TransferredFile>,
}

/// Terminal state of a pull. Only `Added` means anything was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PullOutcome {
    /// No board item references the page.
    NoBoardItem,
    /// Every media block on the page was already transferred.
    NothingNew,
    Added { item_id: String, added: usize },
}

pub async fn push_item_to_page<B, P, F, L>(
    board: &B,
    pages: &P,
    fetcher: &F,
    ledger: &L,
    settings: &SyncSettings,
    item_id: u64,
    page_id: Option<&str>,
) -> SyncResult<PushReport>
where
    B: BoardApi + ?Sized,
    P: PageApi + ?Sized,
    F: MediaFetcher + ?Sized,
    L: SeenLedger + ?Sized,
{
    if item_id == 0 {
        return Err(SyncError::Validation("itemId must be a positive integer".into()));
    }
    if matches!(page_id, Some(id) if id.trim().is_empty()) {
        return Err(SyncError::Validation("pageId must not be empty".into()));
    }
    info!(item_id, page_id = ?page_id, "[PUSH] Starting board → page sync");

    let listed = list_item_media(board, item_id).await?;

    let (page_id, url) = match page_id {
        Some(id) => (id.trim().to_string(), None),
        None => {
            let created = pages.create_page(&listed.item.name).await.map_err(|e| {
                error!(item_id, error = %e, "[PUSH][ERROR] Page creation failed");
                e
            })?;
            info!(page_id = %created.id, url = %created.url, "[PUSH] Created page for item");
            (created.id, Some(created.url))
        }
    };

    if listed.assets.is_empty() {
        info!(item_id, page_id = %page_id, "[PUSH] Item has no assets");
        return Ok(PushReport {
            page_id,
            url,
            attachments: 0,
            transferred: Vec::new(),
        });
    }

    let target = PageUploadTarget::new(pages);
    let transferred = transfer_all(fetcher, &target, listed.assets, &settings.transfer).await?;
    let merge = merge_into_page(pages, &page_id, &transferred).await?;
    ledger.record_all(&merge.preview_block_ids)?;

    info!(item_id, page_id = %page_id, attachments = merge.added, "[PUSH] Sync complete");
    Ok(PushReport {
        page_id,
        url,
        attachments: merge.added,
        transferred,
    })
}

pub async fn pull_page_to_board<B, P, F, L>(
    board: &B,
    pages: &P,
    fetcher: &F,
    ledger: &L,
    settings: &SyncSettings,
    page_id: &str,
) -> SyncResult<PullOutcome>
where
    B: BoardApi + ?Sized,
    P: PageApi + ?Sized,
    F: MediaFetcher + ?Sized,
    L: SeenLedger + ?Sized,
{
    if page_id.trim().is_empty() {
        return Err(SyncError::Validation("page id must not be empty".into()));
    }
    info!(page_id, "[PULL] Starting page → board sync");

    let page = pages.get_page(page_id).await?;
    let Some(item) = find_board_item(board, &settings.url_column_id, &page.page.url).await? else {
        info!(page_id, url = %page.page.url, "[PULL] No board item for page");
        return Ok(PullOutcome::NoBoardItem);
    };

    let blocks = crawl_media(pages, page_id).await?;
    let mut queued = HashSet::new();
    let fresh: Vec<_> = blocks
        .into_iter()
        .filter(|b| !ledger.contains(&b.block_id) && queued.insert(b.block_id.clone()))
        .map(|b| b.reference)
        .collect();

    if fresh.is_empty() {
        info!(page_id, item_id = %item.id, "[PULL] Nothing new on page");
        return Ok(PullOutcome::NothingNew);
    }
    info!(page_id, item_id = %item.id, fresh = fresh.len(), "[PULL] Transferring new media blocks");

    let target = BoardColumnTarget::new(board, item.id.clone(), settings.files_column_id.clone());
    let outcomes = transfer_settled(fetcher, &target, fresh, &settings.transfer).await;

    let mut transferred = Vec::with_capacity(outcomes.len());
    let mut first_error = None;
    for outcome in outcomes {
        match outcome.result {
            Ok(file) => transferred.push(file),
            Err(e) => {
                error!(origin = %outcome.origin, error = %e, "[PULL][ERROR] Block transfer failed");
                first_error.get_or_insert(e);
            }
        }
    }

    let origins: Vec<String> = transferred.iter().map(|f| f.origin.clone()).collect();
    ledger.record_all(&origins)?;
    if let Some(e) = first_error {
        error!(page_id, recorded = origins.len(), "[PULL][ERROR] Batch failed");
        return Err(e);
    }

    let mut added = 0usize;
    for file in &transferred {
        match file.placement {
            Placement::Embedded => added += 1,
            Placement::Linked => warn!(
                origin = %file.origin,
                file = %file.display_name,
                "[PULL] Oversized file cannot be placed in a board files column, skipped"
            ),
        }
    }

    info!(page_id, item_id = %item.id, added, "[PULL] Sync complete");
    Ok(PullOutcome::Added {
        item_id: item.id,
        added,
    })
}
