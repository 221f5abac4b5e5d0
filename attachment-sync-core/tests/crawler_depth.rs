use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use attachment_sync_core::contract::{BlockNode, BlockPage, MediaReference, MockPageApi};
use attachment_sync_core::crawler::{crawl_media, MAX_DEPTH};
use attachment_sync_core::SyncError;

fn media_block(id: &str, block_type: &str, has_children: bool) -> BlockNode {
    BlockNode {
        id: id.to_string(),
        block_type: block_type.to_string(),
        has_children,
        media: Some(MediaReference {
            name: format!("{id}.png"),
            source_url: format!("https://files.example.com/{id}.png"),
            declared_size: None,
            mime_hint: None,
            origin: id.to_string(),
        }),
    }
}

fn text_block(id: &str, has_children: bool) -> BlockNode {
    BlockNode {
        id: id.to_string(),
        block_type: "paragraph".to_string(),
        has_children,
        media: None,
    }
}

/// Children per parent, split into pages of `page_size` with cursors "<parent>:<offset>".
fn paginated_api(tree: HashMap<String, Vec<BlockNode>>, page_size: usize) -> (MockPageApi, Arc<Mutex<Vec<String>>>) {
    let fetched = Arc::new(Mutex::new(Vec::new()));
    let log = fetched.clone();
    let mut api = MockPageApi::new();
    api.expect_list_children().returning(move |block_id, cursor| {
        log.lock().unwrap().push(block_id.to_string());
        let children = tree.get(block_id).cloned().unwrap_or_default();
        let offset = cursor
            .and_then(|c| c.rsplit(':').next().map(str::to_string))
            .and_then(|o| o.parse::<usize>().ok())
            .unwrap_or(0);
        let end = (offset + page_size).min(children.len());
        Ok(BlockPage {
            results: children[offset..end].to_vec(),
            next_cursor: (end < children.len()).then(|| format!("{block_id}:{end}")),
        })
    });
    (api, fetched)
}

#[tokio::test]
async fn returns_media_from_levels_zero_to_two_only() {
    // root → l0 → l1 → l2 → l3 → l4, every level holds one media block that has children
    let mut tree = HashMap::new();
    let mut parent = "root".to_string();
    for depth in 0..5 {
        let id = format!("media-{depth}");
        tree.insert(parent.clone(), vec![media_block(&id, "image", depth < 4)]);
        parent = id;
    }
    let (api, fetched) = paginated_api(tree, 100);

    let found = crawl_media(&api, "root").await.unwrap();

    let ids: Vec<_> = found.iter().map(|b| b.block_id.as_str()).collect();
    assert_eq!(ids, vec!["media-0", "media-1", "media-2"]);
    assert!(found.iter().all(|b| b.depth <= MAX_DEPTH));
    // media-2 sits at the last visited depth, its children are never requested
    assert!(!fetched.lock().unwrap().contains(&"media-2".to_string()));
}

#[tokio::test]
async fn follows_cursors_and_keeps_preorder() {
    let mut tree = HashMap::new();
    tree.insert(
        "root".to_string(),
        vec![
            media_block("a", "file", false),
            text_block("toggle", true),
            media_block("b", "video", false),
            text_block("para", false),
            media_block("c", "pdf", false),
        ],
    );
    tree.insert(
        "toggle".to_string(),
        vec![media_block("t1", "audio", false), media_block("t2", "image", false)],
    );
    let (api, fetched) = paginated_api(tree, 2);

    let found = crawl_media(&api, "root").await.unwrap();

    let ids: Vec<_> = found.iter().map(|b| b.block_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "t1", "t2", "b", "c"]);
    let calls = fetched.lock().unwrap();
    assert_eq!(calls.iter().filter(|id| *id == "root").count(), 3);
    assert_eq!(calls.iter().filter(|id| *id == "toggle").count(), 1);
}

#[tokio::test]
async fn non_media_types_are_ignored_and_childless_blocks_not_fetched() {
    let mut tree = HashMap::new();
    let mut embed = media_block("bookmark", "bookmark", false);
    embed.block_type = "embed".to_string();
    tree.insert(
        "root".to_string(),
        vec![embed, text_block("leaf", false), media_block("img", "image", false)],
    );
    let (api, fetched) = paginated_api(tree, 100);

    let found = crawl_media(&api, "root").await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].block_id, "img");
    assert_eq!(*fetched.lock().unwrap(), vec!["root".to_string()]);
}

#[tokio::test]
async fn a_failed_page_fetch_aborts_the_crawl() {
    let mut api = MockPageApi::new();
    api.expect_list_children().returning(|block_id, _| {
        if block_id == "root" {
            Ok(BlockPage {
                results: vec![media_block("m", "image", true)],
                next_cursor: None,
            })
        } else {
            Err(SyncError::UpstreamQuery("rate limited".into()))
        }
    });

    let err = crawl_media(&api, "root").await.unwrap_err();
    assert!(matches!(err, SyncError::UpstreamQuery(_)));
}
