//! Depth-bounded crawl of a page's block tree, collecting media blocks.
//!
//! The root's children sit at depth 0. A block's own children are fetched only
//! when it reports `has_children` and its depth is below [`MAX_DEPTH`], so the
//! deepest level ever visited is depth 2. Each level is paginated until the
//! page system stops returning a cursor. Any failed fetch aborts the crawl.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, info};

use crate::contract::{BlockNode, MediaReference, PageApi};
use crate::error::SyncResult;
use crate::media::is_media_block;

/// Deepest level whose blocks are returned.
pub const MAX_DEPTH: usize = 2;

/// A media block found during the crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlock {
    pub block_id: String,
    pub block_type: String,
    pub depth: usize,
    pub reference: MediaReference,
}

/// Collect media blocks under `root_id` in depth-first pre-order.
pub async fn crawl_media<P>(api: &P, root_id: &str) -> SyncResult<Vec<MediaBlock>>
where
    P: PageApi + ?Sized,
{
    let mut found = Vec::new();
    visit(api, root_id.to_string(), 0, &mut found).await?;
    info!(root = root_id, media = found.len(), "[CRAWL] Block crawl finished");
    Ok(found)
}

fn visit<'a, P>(
    api: &'a P,
    block_id: String,
    depth: usize,
    found: &'a mut Vec<MediaBlock>,
) -> BoxFuture<'a, SyncResult<()>>
where
    P: PageApi + ?Sized,
{
    async move {
        let children = list_all_children(api, &block_id).await?;
        debug!(block = %block_id, depth, children = children.len(), "[CRAWL] Fetched level");

        for child in children {
            if is_media_block(&child.block_type) {
                if let Some(reference) = child.media.clone() {
                    found.push(MediaBlock {
                        block_id: child.id.clone(),
                        block_type: child.block_type.clone(),
                        depth,
                        reference,
                    });
                }
            }
            if child.has_children && depth < MAX_DEPTH {
                visit(api, child.id, depth + 1, &mut *found).await?;
            }
        }
        Ok(())
    }
    .boxed()
}

async fn list_all_children<P>(api: &P, block_id: &str) -> SyncResult<Vec<BlockNode>>
where
    P: PageApi + ?Sized,
{
    let mut all = Vec::new();
    let mut cursor = None;
    loop {
        let page = api.list_children(block_id, cursor.take()).await?;
        all.extend(page.results);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    Ok(all)
}
