//! monday.com board client.
//!
//! Reads go through the GraphQL endpoint; file uploads go through the
//! separate multipart file endpoint with an `add_file_to_column` mutation.
//! GraphQL answers HTTP 200 even on failure, so the `errors` array and the
//! legacy `error_message` field are checked on every response.

use async_trait::async_trait;
use attachment_sync_core::contract::{BoardApi, BoardItem, ColumnText, ItemAssets, MediaReference};
use attachment_sync_core::media::name_from_url;
use attachment_sync_core::{SyncError, SyncResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::http::{network_error, status_error};
use crate::load_config::CliConfig;

/// Items fetched per page when scanning a whole board column.
pub const BOARD_PAGE_LIMIT: usize = 500;

const ITEM_ASSETS_QUERY: &str = "query ($ids: [ID!]) { items(ids: $ids) { id name assets { id name url public_url file_size } } }";

const ITEMS_BY_VALUE_QUERY: &str = "query ($board: ID!, $column: String!, $columns: [String!], $value: String!) { items_page_by_column_values(board_id: $board, limit: 50, columns: [{column_id: $column, column_values: [$value]}]) { items { id name column_values(ids: $columns) { text } } } }";

const FIRST_ITEMS_PAGE_QUERY: &str = "query ($boards: [ID!], $columns: [String!], $limit: Int!) { boards(ids: $boards) { items_page(limit: $limit) { cursor items { id name column_values(ids: $columns) { text } } } } }";

const NEXT_ITEMS_PAGE_QUERY: &str = "query ($cursor: String!, $columns: [String!], $limit: Int!) { next_items_page(limit: $limit, cursor: $cursor) { cursor items { id name column_values(ids: $columns) { text } } } }";

pub struct MondayClient {
    client: Client,
    api_url: String,
    file_url: String,
    api_version: String,
    token: String,
    board_id: String,
}

impl MondayClient {
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        file_url: impl Into<String>,
        token: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            file_url: file_url.into(),
            api_version: "2024-10".to_string(),
            token: token.into(),
            board_id: board_id.into(),
        }
    }

    pub fn from_config(config: &CliConfig, client: Client) -> Self {
        let mut monday = Self::new(
            client,
            &config.monday.api_url,
            &config.monday.file_url,
            &config.env.monday_api_token,
            &config.env.monday_board_id,
        );
        monday.api_version = config.monday.api_version.clone();
        monday
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> SyncResult<T> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", &self.token)
            .header("API-Version", &self.api_version)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| network_error("monday query", e))?;
        if !response.status().is_success() {
            return Err(status_error("monday query", response).await);
        }
        let envelope: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| network_error("monday query body", e))?;
        envelope.into_data()
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

impl<T> GraphqlResponse<T> {
    fn into_data(self) -> SyncResult<T> {
        if !self.errors.is_empty() {
            let message = self
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            error!(error = %message, "[MONDAY][ERROR] GraphQL errors");
            return Err(SyncError::UpstreamQuery(message));
        }
        if let Some(message) = self.error_message {
            error!(error = %message, "[MONDAY][ERROR] API error message");
            return Err(SyncError::UpstreamQuery(message));
        }
        self.data
            .ok_or_else(|| SyncError::UpstreamQuery("monday response carried no data".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    id: String,
    name: String,
    #[serde(default)]
    assets: Vec<RawAsset>,
    #[serde(default)]
    column_values: Vec<RawColumnValue>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    id: String,
    name: Option<String>,
    url: Option<String>,
    public_url: Option<String>,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawColumnValue {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    cursor: Option<String>,
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct ByValueData {
    items_page_by_column_values: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    boards: Vec<BoardPage>,
}

#[derive(Debug, Deserialize)]
struct BoardPage {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct NextPageData {
    next_items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    add_file_to_column: UploadedAsset,
}

#[derive(Debug, Deserialize)]
struct UploadedAsset {
    id: String,
}

impl RawItem {
    fn board_item(&self) -> BoardItem {
        BoardItem {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    fn column_text(self) -> ColumnText {
        let item = self.board_item();
        let text = self
            .column_values
            .into_iter()
            .next()
            .and_then(|c| c.text)
            .unwrap_or_default();
        ColumnText { item, text }
    }
}

impl RawAsset {
    /// `public_url` is pre-signed; `url` needs the API token, so it is only
    /// a fallback.
    fn into_reference(self) -> Option<MediaReference> {
        let source_url = self.public_url.or(self.url)?;
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name_from_url(&source_url));
        Some(MediaReference {
            name,
            source_url,
            declared_size: self.file_size,
            mime_hint: None,
            origin: self.id,
        })
    }
}

#[async_trait]
impl BoardApi for MondayClient {
    async fn item_assets(&self, item_id: u64) -> SyncResult<Option<ItemAssets>> {
        let data: ItemsData = self
            .graphql(ITEM_ASSETS_QUERY, json!({ "ids": [item_id.to_string()] }))
            .await?;
        let Some(raw) = data.items.into_iter().next() else {
            return Ok(None);
        };
        let item = raw.board_item();
        let assets: Vec<_> = raw
            .assets
            .into_iter()
            .filter_map(RawAsset::into_reference)
            .collect();
        debug!(item_id, assets = assets.len(), "[MONDAY] Fetched item assets");
        Ok(Some(ItemAssets { item, assets }))
    }

    async fn items_by_column_value(
        &self,
        column_id: &str,
        value: &str,
    ) -> SyncResult<Vec<ColumnText>> {
        let data: ByValueData = self
            .graphql(
                ITEMS_BY_VALUE_QUERY,
                json!({
                    "board": self.board_id,
                    "column": column_id,
                    "columns": [column_id],
                    "value": value,
                }),
            )
            .await?;
        Ok(data
            .items_page_by_column_values
            .items
            .into_iter()
            .map(RawItem::column_text)
            .collect())
    }

    async fn column_texts(&self, column_id: &str) -> SyncResult<Vec<ColumnText>> {
        let first: BoardsData = self
            .graphql(
                FIRST_ITEMS_PAGE_QUERY,
                json!({
                    "boards": [self.board_id],
                    "columns": [column_id],
                    "limit": BOARD_PAGE_LIMIT,
                }),
            )
            .await?;
        let Some(board) = first.boards.into_iter().next() else {
            return Err(SyncError::NotFound(format!("board {}", self.board_id)));
        };

        let mut texts: Vec<ColumnText> = Vec::new();
        let mut page = board.items_page;
        loop {
            texts.extend(page.items.into_iter().map(RawItem::column_text));
            let Some(cursor) = page.cursor.filter(|c| !c.is_empty()) else {
                break;
            };
            let next: NextPageData = self
                .graphql(
                    NEXT_ITEMS_PAGE_QUERY,
                    json!({
                        "cursor": cursor,
                        "columns": [column_id],
                        "limit": BOARD_PAGE_LIMIT,
                    }),
                )
                .await?;
            page = next.next_items_page;
        }
        debug!(column_id, items = texts.len(), "[MONDAY] Scanned board column");
        Ok(texts)
    }

    async fn upload_to_column(
        &self,
        item_id: &str,
        column_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<String> {
        let numeric_item: u64 = item_id
            .parse()
            .map_err(|_| SyncError::Validation(format!("board item id {item_id:?} is not numeric")))?;
        let column_literal = serde_json::to_string(column_id)
            .map_err(|e| SyncError::Validation(format!("column id: {e}")))?;
        let mutation = format!(
            "mutation ($file: File!) {{ add_file_to_column (item_id: {numeric_item}, column_id: {column_literal}, file: $file) {{ id }} }}"
        );

        let size = bytes.len();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| SyncError::Validation(format!("content type {content_type:?}: {e}")))?;
        let form = Form::new()
            .text("query", mutation)
            .part("variables[file]", part);

        let response = self
            .client
            .post(&self.file_url)
            .header("Authorization", &self.token)
            .header("API-Version", &self.api_version)
            .multipart(form)
            .send()
            .await
            .map_err(|e| network_error("monday file upload", e))?;
        if !response.status().is_success() {
            return Err(status_error("monday file upload", response).await);
        }
        let envelope: GraphqlResponse<UploadData> = response
            .json()
            .await
            .map_err(|e| network_error("monday file upload body", e))?;
        let asset = envelope.into_data()?.add_file_to_column;
        info!(item_id, column_id, asset_id = %asset.id, size, "[MONDAY] Uploaded file to column");
        Ok(asset.id)
    }
}
