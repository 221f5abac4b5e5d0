//! # contract: data model and trait seams of the sync pipeline
//!
//! This module defines the plain data that flows through the pipeline and the
//! traits every remote system is reached through:
//!
//! - [`BoardApi`]: the work-item platform (items, asset listing, column search,
//!   multipart file upload to a files column).
//! - [`PageApi`]: the document platform (pages, child blocks, attachment
//!   property, create-then-send file uploads).
//! - [`MediaFetcher`]: plain HTTP GET of a media reference's bytes.
//!
//! ## Mocking & Testing
//! - Traits are annotated for `mockall` (behind the `test-export-mocks`
//!   feature) so downstream crates can build deterministic mocks.
//! - Timing-sensitive tests use hand-written fakes instead; `mockall`
//!   expectations cannot suspend.
//!
//! ## Adding a Destination
//! - Implement [`crate::pipeline::EmbedTarget`] for it; the pipeline only needs
//!   to hand over downloaded bytes and get back a destination pointer.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;
use crate::media::MediaKind;

/// One remote file to transfer. Constructed fresh per request and consumed
/// exactly once by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Display name as reported by the source. May exceed destination limits.
    pub name: String,
    /// Location the bytes can be fetched from with a plain GET.
    pub source_url: String,
    /// Size the source claims, if it reports one.
    pub declared_size: Option<u64>,
    /// Mime type the source claims; inferred from the extension when absent.
    pub mime_hint: Option<String>,
    /// Board asset id or page block id this reference came from.
    pub origin: String,
}

/// Short-lived handle returned by the page system's create-upload call.
/// Bytes must be sent to `upload_url` before `id` can be attached anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadHandle {
    pub id: String,
    pub upload_url: Option<String>,
}

/// How a transferred file ended up at its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placement {
    /// Bytes were copied into the destination's own storage.
    Embedded,
    /// The destination only keeps a pointer to the original source URL.
    Linked,
}

/// Outcome of transferring one [`MediaReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferredFile {
    pub origin: String,
    /// Name after truncation to the destination limit.
    pub display_name: String,
    pub placement: Placement,
    /// Destination id for embedded files, original source URL for linked ones.
    pub destination: String,
    pub kind: MediaKind,
}

/// A board item, as far as matching and page titles are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: String,
    pub name: String,
}

/// A board item together with the file assets attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAssets {
    pub item: BoardItem,
    pub assets: Vec<MediaReference>,
}

/// The text of one column on one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnText {
    pub item: BoardItem,
    pub text: String,
}

/// A page reference returned after creating or reading a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub id: String,
    pub url: String,
}

/// File entry as stored in a page's files property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileEntry {
    /// Hosted by the page system; the url is signed and expires.
    File { name: String, file: HostedFile },
    /// Pointer to an external URL.
    External { name: String, external: ExternalFile },
    /// Freshly uploaded through an [`UploadHandle`].
    FileUpload {
        name: String,
        file_upload: UploadedFile,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
}

impl FileEntry {
    pub fn name(&self) -> &str {
        match self {
            FileEntry::File { name, .. }
            | FileEntry::External { name, .. }
            | FileEntry::FileUpload { name, .. } => name,
        }
    }
}

impl From<&TransferredFile> for FileEntry {
    fn from(file: &TransferredFile) -> Self {
        match file.placement {
            Placement::Embedded => FileEntry::FileUpload {
                name: file.display_name.clone(),
                file_upload: UploadedFile {
                    id: file.destination.clone(),
                },
            },
            Placement::Linked => FileEntry::External {
                name: file.display_name.clone(),
                external: ExternalFile {
                    url: file.destination.clone(),
                },
            },
        }
    }
}

/// Current state of a page relevant to attachment merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub page: PageRef,
    /// Entries of the configured files property, in stored order.
    pub files: Vec<FileEntry>,
}

/// A block to append under a page, previewing one transferred file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewBlock {
    pub kind: MediaKind,
    pub source: FileEntry,
}

/// One child block as reported by the page system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    pub id: String,
    pub block_type: String,
    pub has_children: bool,
    /// Present when the block carries a file payload.
    pub media: Option<MediaReference>,
}

/// One page of a paginated children listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockPage {
    pub results: Vec<BlockNode>,
    pub next_cursor: Option<String>,
}

/// Work-item platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// Fetch one item and its file assets. `Ok(None)` when the item does not exist.
    async fn item_assets(&self, item_id: u64) -> SyncResult<Option<ItemAssets>>;

    /// Items whose `column_id` text was matched by the platform's own
    /// column-value search for `value`. The search may be looser than an
    /// exact comparison; callers compare texts themselves.
    async fn items_by_column_value(
        &self,
        column_id: &str,
        value: &str,
    ) -> SyncResult<Vec<ColumnText>>;

    /// Every item's text for `column_id`, across all pages of the board.
    async fn column_texts(&self, column_id: &str) -> SyncResult<Vec<ColumnText>>;

    /// Multipart upload of one file into a files column. Returns the new asset id.
    async fn upload_to_column(
        &self,
        item_id: &str,
        column_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<String>;
}

/// Document platform.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageApi: Send + Sync {
    /// Create a page in the configured database, titled `title`.
    async fn create_page(&self, title: &str) -> SyncResult<PageRef>;

    /// Read a page and its files property.
    async fn get_page(&self, page_id: &str) -> SyncResult<PageSnapshot>;

    /// Overwrite the page's files property with `files`.
    async fn set_files(&self, page_id: &str, files: Vec<FileEntry>) -> SyncResult<()>;

    /// Append blocks at the end of the page. Returns the ids of the created
    /// blocks.
    async fn append_blocks(&self, page_id: &str, blocks: Vec<PreviewBlock>)
        -> SyncResult<Vec<String>>;

    /// One page of the children of `block_id`.
    async fn list_children(&self, block_id: &str, cursor: Option<String>)
        -> SyncResult<BlockPage>;

    /// Step one of an upload: obtain a handle.
    async fn create_upload(&self, filename: &str, content_type: &str) -> SyncResult<UploadHandle>;

    /// Step two of an upload: stream the bytes to the handle's target.
    async fn send_upload(
        &self,
        handle: &UploadHandle,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<()>;
}

/// Plain byte retrieval for a media reference.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> SyncResult<Vec<u8>>;
}
