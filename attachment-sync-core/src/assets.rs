//! Remote asset listing for one board item.

use tracing::{error, info};

use crate::contract::{BoardApi, ItemAssets};
use crate::error::{SyncError, SyncResult};

/// Fetch the item and its file assets, in the order the board reports them.
/// A missing item is a [`SyncError::NotFound`]; there is no retry.
pub async fn list_item_media<B>(board: &B, item_id: u64) -> SyncResult<ItemAssets>
where
    B: BoardApi + ?Sized,
{
    match board.item_assets(item_id).await {
        Ok(Some(found)) => {
            info!(
                item_id,
                item_name = %found.item.name,
                assets = found.assets.len(),
                "[ASSETS] Listed item assets"
            );
            Ok(found)
        }
        Ok(None) => {
            error!(item_id, "[ASSETS][ERROR] Item not found");
            Err(SyncError::NotFound(format!("board item {item_id}")))
        }
        Err(e) => {
            error!(item_id, error = %e, "[ASSETS][ERROR] Asset query failed");
            Err(e)
        }
    }
}
