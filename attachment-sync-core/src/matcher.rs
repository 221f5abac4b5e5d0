//! Resolve a page URL to the board item that references it.
//!
//! Two passes: the board's own column-value search filtered down to exact text
//! equality, then a case-insensitive substring scan over every item's column
//! text. Which candidate the loose pass returns when several contain the URL is
//! implementation-defined: it is the first one the board reports.

use tracing::{debug, info};

use crate::contract::{BoardApi, BoardItem};
use crate::error::SyncResult;

pub async fn find_board_item<B>(
    board: &B,
    column_id: &str,
    page_url: &str,
) -> SyncResult<Option<BoardItem>>
where
    B: BoardApi + ?Sized,
{
    if let Some(item) = exact_match(board, column_id, page_url).await? {
        info!(item_id = %item.id, page_url, "[MATCH] Exact column match");
        return Ok(Some(item));
    }
    debug!(page_url, "[MATCH] No exact match, scanning column");

    let found = loose_match(board, column_id, page_url).await?;
    match &found {
        Some(item) => info!(item_id = %item.id, page_url, "[MATCH] Loose column match"),
        None => info!(page_url, "[MATCH] No board item references this page"),
    }
    Ok(found)
}

pub async fn exact_match<B>(
    board: &B,
    column_id: &str,
    value: &str,
) -> SyncResult<Option<BoardItem>>
where
    B: BoardApi + ?Sized,
{
    let candidates = board.items_by_column_value(column_id, value).await?;
    Ok(candidates
        .into_iter()
        .find(|c| c.text.trim() == value)
        .map(|c| c.item))
}

pub async fn loose_match<B>(
    board: &B,
    column_id: &str,
    needle: &str,
) -> SyncResult<Option<BoardItem>>
where
    B: BoardApi + ?Sized,
{
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(None);
    }
    let texts = board.column_texts(column_id).await?;
    Ok(texts
        .into_iter()
        .find(|c| c.text.to_lowercase().contains(&needle))
        .map(|c| c.item))
}
