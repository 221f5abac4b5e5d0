//! Destination writers.
//!
//! - [`PageUploadTarget`] embeds bytes into the page system through its
//!   create-handle-then-send upload protocol.
//! - [`BoardColumnTarget`] embeds bytes into a board item's files column, one
//!   multipart upload per file. Earlier uploads in a batch are not rolled back
//!   when a later one fails.
//! - [`merge_into_page`] folds transferred files into a page's files property
//!   and appends one preview block per new file.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::contract::{BoardApi, FileEntry, PageApi, PreviewBlock, TransferredFile};
use crate::error::SyncResult;
use crate::pipeline::{DownloadedMedia, EmbedTarget};

/// The page system accepts at most this many children per append call.
pub const APPEND_CHUNK: usize = 100;

pub struct PageUploadTarget<'a, P: ?Sized> {
    pages: &'a P,
}

impl<'a, P: PageApi + ?Sized> PageUploadTarget<'a, P> {
    pub fn new(pages: &'a P) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl<'a, P: PageApi + ?Sized> EmbedTarget for PageUploadTarget<'a, P> {
    async fn embed(&self, media: DownloadedMedia) -> SyncResult<String> {
        let handle = self
            .pages
            .create_upload(&media.display_name, &media.content_type)
            .await?;
        debug!(handle = %handle.id, file = %media.display_name, "[UPLOAD] Created upload handle");
        self.pages
            .send_upload(&handle, &media.display_name, &media.content_type, media.bytes)
            .await?;
        Ok(handle.id)
    }
}

pub struct BoardColumnTarget<'a, B: ?Sized> {
    board: &'a B,
    item_id: String,
    column_id: String,
}

impl<'a, B: BoardApi + ?Sized> BoardColumnTarget<'a, B> {
    pub fn new(board: &'a B, item_id: impl Into<String>, column_id: impl Into<String>) -> Self {
        Self {
            board,
            item_id: item_id.into(),
            column_id: column_id.into(),
        }
    }
}

#[async_trait]
impl<'a, B: BoardApi + ?Sized> EmbedTarget for BoardColumnTarget<'a, B> {
    async fn embed(&self, media: DownloadedMedia) -> SyncResult<String> {
        let asset_id = self
            .board
            .upload_to_column(
                &self.item_id,
                &self.column_id,
                &media.display_name,
                &media.content_type,
                media.bytes,
            )
            .await?;
        info!(
            item_id = %self.item_id,
            column_id = %self.column_id,
            asset_id = %asset_id,
            file = %media.display_name,
            "[UPLOAD] Added file to board column"
        );
        Ok(asset_id)
    }
}

/// What [`merge_into_page`] changed on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMerge {
    /// Entries newly added to the files property.
    pub added: usize,
    /// Ids of the preview blocks appended for those entries.
    pub preview_block_ids: Vec<String>,
}

/// Merge `files` into the page's files property and append previews for the
/// entries that were not already present.
///
/// Read-append-write with no locking: concurrent writers to one page race and
/// the last write wins.
pub async fn merge_into_page<P>(
    pages: &P,
    page_id: &str,
    files: &[TransferredFile],
) -> SyncResult<PageMerge>
where
    P: PageApi + ?Sized,
{
    let snapshot = pages.get_page(page_id).await?;
    let existing = snapshot.files.len();

    let mut merged = snapshot.files;
    let mut previews = Vec::new();
    for file in files {
        let entry = FileEntry::from(file);
        if merged.contains(&entry) {
            debug!(page_id, file = %entry.name(), "[MERGE] Entry already present");
            continue;
        }
        merged.push(entry.clone());
        previews.push(PreviewBlock {
            kind: file.kind,
            source: entry,
        });
    }

    if previews.is_empty() {
        info!(page_id, existing, "[MERGE] Nothing new to attach");
        return Ok(PageMerge::default());
    }

    pages.set_files(page_id, merged).await?;
    let added = previews.len();
    let mut preview_block_ids = Vec::with_capacity(added);
    for chunk in previews.chunks(APPEND_CHUNK) {
        preview_block_ids.extend(pages.append_blocks(page_id, chunk.to_vec()).await?);
    }
    info!(page_id, existing, added, "[MERGE] Attachments merged into page");
    Ok(PageMerge {
        added,
        preview_block_ids,
    })
}
