use attachment_sync_core::contract::{BoardItem, ColumnText, MockBoardApi};
use attachment_sync_core::matcher::{exact_match, find_board_item, loose_match};
use mockall::predicate::eq;

fn row(id: &str, text: &str) -> ColumnText {
    ColumnText {
        item: BoardItem {
            id: id.to_string(),
            name: format!("Item {id}"),
        },
        text: text.to_string(),
    }
}

#[tokio::test]
async fn exact_match_ignores_longer_values() {
    let mut board = MockBoardApi::new();
    board
        .expect_items_by_column_value()
        .with(eq("link"), eq("https://x/y"))
        .returning(|_, _| Ok(vec![row("2", "https://x/y?ref=1"), row("1", "https://x/y")]));

    let item = exact_match(&board, "link", "https://x/y").await.unwrap();
    assert_eq!(item.map(|i| i.id), Some("1".to_string()));
}

#[tokio::test]
async fn exact_hit_skips_the_column_scan() {
    let mut board = MockBoardApi::new();
    board
        .expect_items_by_column_value()
        .returning(|_, _| Ok(vec![row("1", "https://x/y")]));
    board.expect_column_texts().never();

    let item = find_board_item(&board, "link", "https://x/y").await.unwrap();
    assert_eq!(item.unwrap().id, "1");
}

#[tokio::test]
async fn loose_fallback_is_case_insensitive_and_returns_first_hit() {
    let mut board = MockBoardApi::new();
    board
        .expect_items_by_column_value()
        .returning(|_, _| Ok(vec![]));
    board.expect_column_texts().with(eq("link")).returning(|_| {
        Ok(vec![
            row("9", "unrelated"),
            row("1", "see HTTPS://X/Y for details"),
            row("2", "https://x/y?ref=1"),
        ])
    });

    let item = find_board_item(&board, "link", "https://x/y").await.unwrap();
    assert_eq!(item.unwrap().id, "1");
}

#[tokio::test]
async fn loose_substring_query_finds_a_candidate() {
    let mut board = MockBoardApi::new();
    board
        .expect_column_texts()
        .returning(|_| Ok(vec![row("1", "https://x/y"), row("2", "https://x/y?ref=1")]));

    let item = loose_match(&board, "link", "x/y").await.unwrap().unwrap();
    assert!(item.id == "1" || item.id == "2");
}

#[tokio::test]
async fn no_candidate_is_not_an_error() {
    let mut board = MockBoardApi::new();
    board
        .expect_items_by_column_value()
        .returning(|_, _| Ok(vec![]));
    board
        .expect_column_texts()
        .returning(|_| Ok(vec![row("1", "https://elsewhere")]));

    let item = find_board_item(&board, "link", "https://x/y").await.unwrap();
    assert!(item.is_none());
}
