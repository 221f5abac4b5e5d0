use std::time::Duration;

use attachment_sync::http::build_client;
use attachment_sync::monday::MondayClient;
use attachment_sync_core::contract::BoardApi;
use attachment_sync_core::SyncError;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> MondayClient {
    MondayClient::new(
        build_client(Duration::from_secs(5)).unwrap(),
        format!("{}/v2", server.uri()),
        format!("{}/v2/file", server.uri()),
        "monday-token",
        "987",
    )
}

#[tokio::test]
async fn item_assets_prefers_public_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .and(header("Authorization", "monday-token"))
        .and(body_partial_json(json!({ "variables": { "ids": ["42"] } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "items": [{
                "id": "42",
                "name": "Launch video",
                "assets": [
                    {
                        "id": "a1",
                        "name": "clip.mp4",
                        "url": "https://acme.monday.com/protected_static/clip.mp4",
                        "public_url": "https://files.monday.com/signed/clip.mp4?X-Amz-Signature=abc",
                        "file_size": 1234
                    },
                    {
                        "id": "a2",
                        "name": null,
                        "url": "https://acme.monday.com/protected_static/scan.png",
                        "public_url": null,
                        "file_size": null
                    }
                ]
            }] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = client(&server).item_assets(42).await.unwrap().unwrap();

    assert_eq!(found.item.name, "Launch video");
    assert_eq!(found.assets.len(), 2);
    assert_eq!(
        found.assets[0].source_url,
        "https://files.monday.com/signed/clip.mp4?X-Amz-Signature=abc"
    );
    assert_eq!(found.assets[0].declared_size, Some(1234));
    assert_eq!(found.assets[0].origin, "a1");
    assert_eq!(found.assets[1].name, "scan.png");
}

#[tokio::test]
async fn missing_item_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "items": [] } })))
        .mount(&server)
        .await;

    assert!(client(&server).item_assets(1).await.unwrap().is_none());
}

#[tokio::test]
async fn graphql_errors_surface_as_upstream_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "Field 'assets' doesn't exist" }],
            "account_id": 1
        })))
        .mount(&server)
        .await;

    let err = client(&server).item_assets(1).await.unwrap_err();
    match err {
        SyncError::UpstreamQuery(msg) => assert_eq!(msg, "Field 'assets' doesn't exist"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn items_by_column_value_returns_column_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .and(body_partial_json(json!({
            "variables": { "board": "987", "column": "link", "value": "https://notion.so/p1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "items_page_by_column_values": { "cursor": null, "items": [
                { "id": "7", "name": "Row", "column_values": [{ "text": "https://notion.so/p1" }] },
                { "id": "8", "name": "Empty", "column_values": [{ "text": null }] }
            ] } }
        })))
        .mount(&server)
        .await;

    let rows = client(&server)
        .items_by_column_value("link", "https://notion.so/p1")
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].item.id, "7");
    assert_eq!(rows[0].text, "https://notion.so/p1");
    assert_eq!(rows[1].text, "");
}

#[tokio::test]
async fn column_texts_follows_cursor_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .and(body_string_contains("boards(ids"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "boards": [{ "items_page": { "cursor": "c-1", "items": [
                { "id": "1", "name": "One", "column_values": [{ "text": "a" }] }
            ] } }] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .and(body_partial_json(json!({ "variables": { "cursor": "c-1" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "next_items_page": { "cursor": null, "items": [
                { "id": "2", "name": "Two", "column_values": [{ "text": "b" }] }
            ] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let texts = client(&server).column_texts("link").await.unwrap();
    let ids: Vec<_> = texts.iter().map(|t| t.item.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn upload_to_column_posts_multipart_mutation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/file"))
        .and(header("Authorization", "monday-token"))
        .and(body_string_contains("add_file_to_column (item_id: 42, column_id: \"files\""))
        .and(body_string_contains("variables[file]"))
        .and(body_string_contains("filename=\"photo.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "add_file_to_column": { "id": "asset-9" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let id = client(&server)
        .upload_to_column("42", "files", "photo.png", "image/png", vec![1, 2, 3])
        .await
        .unwrap();
    assert_eq!(id, "asset-9");
}

#[tokio::test]
async fn upload_rejects_non_numeric_item_ids() {
    let server = MockServer::start().await;
    let err = client(&server)
        .upload_to_column("abc", "files", "a.png", "image/png", vec![1])
        .await
        .unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn http_failure_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server).column_texts("link").await.unwrap_err();
    assert!(matches!(err, SyncError::UpstreamQuery(msg) if msg.contains("boom")));
}
