//! Notion page client.
//!
//! Covers the handful of REST calls the sync needs: page create/read/update,
//! block children listing and append, and the two-step file upload
//! (`POST /file_uploads`, then multipart `POST /file_uploads/{id}/send`).

use async_trait::async_trait;
use attachment_sync_core::contract::{
    BlockNode, BlockPage, FileEntry, MediaReference, PageApi, PageRef, PageSnapshot,
    PreviewBlock, UploadHandle,
};
use attachment_sync_core::media::{name_from_url, MediaKind};
use attachment_sync_core::{SyncError, SyncResult};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

use crate::http::network_error;
use crate::load_config::CliConfig;

/// Largest page size the block children endpoint accepts.
pub const CHILDREN_PAGE_SIZE: usize = 100;

/// Database and property names the client writes to.
#[derive(Debug, Clone)]
pub struct NotionSettings {
    pub api_url: String,
    pub version: String,
    pub database_id: String,
    pub bot_user_id: String,
    pub title_property: String,
    pub assignee_property: String,
    pub files_property: String,
}

impl NotionSettings {
    pub fn from_config(config: &CliConfig) -> Self {
        Self {
            api_url: config.notion.api_url.clone(),
            version: config.notion.version.clone(),
            database_id: config.env.notion_database_id.clone(),
            bot_user_id: config.env.notion_bot_user_id.clone(),
            title_property: config.notion.title_property.clone(),
            assignee_property: config.notion.assignee_property.clone(),
            files_property: config.notion.files_property.clone(),
        }
    }
}

pub struct NotionClient {
    client: Client,
    token: String,
    settings: NotionSettings,
}

impl NotionClient {
    pub fn new(client: Client, token: impl Into<String>, settings: NotionSettings) -> Self {
        Self {
            client,
            token: token.into(),
            settings,
        }
    }

    pub fn from_config(config: &CliConfig, client: Client) -> Self {
        Self::new(
            client,
            &config.env.notion_api_token,
            NotionSettings::from_config(config),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.api_url.trim_end_matches('/'), path)
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.settings.version)
    }

    async fn send<T: DeserializeOwned>(&self, context: &str, request: RequestBuilder) -> SyncResult<T> {
        let response = self
            .authorised(request)
            .send()
            .await
            .map_err(|e| network_error(context, e))?;
        if !response.status().is_success() {
            return Err(api_error(context, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| network_error(context, e))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Notion reports failures as `{object: "error", code, message}`; the message
/// is passed through as is.
async fn api_error(context: &str, response: Response) -> SyncError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    let message = body
        .as_ref()
        .and_then(|b| b.message.clone())
        .unwrap_or_else(|| format!("{context} failed with status {status}: {text}"));
    let code = body.and_then(|b| b.code).unwrap_or_default();
    error!(context, %status, code = %code, error = %message, "[NOTION][ERROR] Request failed");
    if status == StatusCode::NOT_FOUND {
        SyncError::NotFound(message)
    } else {
        SyncError::UpstreamQuery(message)
    }
}

#[derive(Debug, Deserialize)]
struct RawPage {
    id: String,
    url: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawChildren {
    results: Vec<RawBlock>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    has_children: bool,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawUpload {
    id: String,
    upload_url: Option<String>,
}

impl RawBlock {
    fn into_node(self) -> BlockNode {
        let media = self
            .rest
            .get(&self.block_type)
            .and_then(|payload| media_reference(&self.id, payload));
        BlockNode {
            id: self.id,
            block_type: self.block_type,
            has_children: self.has_children,
            media,
        }
    }
}

/// Hosted files expose `file.url`, external ones `external.url`.
fn media_reference(block_id: &str, payload: &Value) -> Option<MediaReference> {
    let url = payload
        .get("file")
        .or_else(|| payload.get("external"))
        .and_then(|f| f.get("url"))
        .and_then(Value::as_str)?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name_from_url(url));
    Some(MediaReference {
        name,
        source_url: url.to_string(),
        declared_size: None,
        mime_hint: None,
        origin: block_id.to_string(),
    })
}

/// Block JSON previewing one file: `{object, type, <type>: {...}}`.
pub fn preview_block_json(block: &PreviewBlock) -> Value {
    let block_type = block.kind.block_type();
    let mut payload = match &block.source {
        FileEntry::FileUpload { file_upload, .. } => {
            json!({ "type": "file_upload", "file_upload": { "id": file_upload.id } })
        }
        FileEntry::External { external, .. } => {
            json!({ "type": "external", "external": { "url": external.url } })
        }
        FileEntry::File { file, .. } => {
            json!({ "type": "external", "external": { "url": file.url } })
        }
    };
    if block.kind == MediaKind::File {
        payload["name"] = json!(block.source.name());
    }

    let mut object = Map::new();
    object.insert("object".into(), json!("block"));
    object.insert("type".into(), json!(block_type));
    object.insert(block_type.into(), payload);
    Value::Object(object)
}

#[async_trait]
impl PageApi for NotionClient {
    async fn create_page(&self, title: &str) -> SyncResult<PageRef> {
        let mut properties = Map::new();
        properties.insert(
            self.settings.title_property.clone(),
            json!({ "title": [{ "text": { "content": title } }] }),
        );
        properties.insert(
            self.settings.assignee_property.clone(),
            json!({ "people": [{ "id": self.settings.bot_user_id }] }),
        );
        let body = json!({
            "parent": { "database_id": self.settings.database_id },
            "properties": properties,
        });
        let page: RawPage = self
            .send("create page", self.client.post(self.url("pages")).json(&body))
            .await?;
        info!(page_id = %page.id, url = %page.url, "[NOTION] Created page");
        Ok(PageRef {
            id: page.id,
            url: page.url,
        })
    }

    async fn get_page(&self, page_id: &str) -> SyncResult<PageSnapshot> {
        let page: RawPage = self
            .send("get page", self.client.get(self.url(&format!("pages/{page_id}"))))
            .await?;
        let files = match page
            .properties
            .get(&self.settings.files_property)
            .and_then(|p| p.get("files"))
        {
            Some(files) => serde_json::from_value::<Vec<FileEntry>>(files.clone()).map_err(|e| {
                SyncError::UpstreamQuery(format!(
                    "unreadable {} property on page {page_id}: {e}",
                    self.settings.files_property
                ))
            })?,
            None => {
                warn!(
                    page_id,
                    property = %self.settings.files_property,
                    "[NOTION] Page has no files property, treating as empty"
                );
                Vec::new()
            }
        };
        Ok(PageSnapshot {
            page: PageRef {
                id: page.id,
                url: page.url,
            },
            files,
        })
    }

    async fn set_files(&self, page_id: &str, files: Vec<FileEntry>) -> SyncResult<()> {
        let count = files.len();
        let mut properties = Map::new();
        properties.insert(
            self.settings.files_property.clone(),
            json!({ "files": files }),
        );
        let _: Value = self
            .send(
                "update page files",
                self.client
                    .patch(self.url(&format!("pages/{page_id}")))
                    .json(&json!({ "properties": properties })),
            )
            .await?;
        debug!(page_id, files = count, "[NOTION] Updated files property");
        Ok(())
    }

    async fn append_blocks(
        &self,
        page_id: &str,
        blocks: Vec<PreviewBlock>,
    ) -> SyncResult<Vec<String>> {
        let children: Vec<Value> = blocks.iter().map(preview_block_json).collect();
        let created: RawChildren = self
            .send(
                "append blocks",
                self.client
                    .patch(self.url(&format!("blocks/{page_id}/children")))
                    .json(&json!({ "children": children })),
            )
            .await?;
        let ids: Vec<String> = created.results.into_iter().map(|b| b.id).collect();
        debug!(page_id, blocks = ids.len(), "[NOTION] Appended preview blocks");
        Ok(ids)
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<String>,
    ) -> SyncResult<BlockPage> {
        let mut query = vec![("page_size", CHILDREN_PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor));
        }
        let raw: RawChildren = self
            .send(
                "list block children",
                self.client
                    .get(self.url(&format!("blocks/{block_id}/children")))
                    .query(&query),
            )
            .await?;
        Ok(BlockPage {
            results: raw.results.into_iter().map(RawBlock::into_node).collect(),
            next_cursor: raw.next_cursor.filter(|_| raw.has_more),
        })
    }

    async fn create_upload(&self, filename: &str, content_type: &str) -> SyncResult<UploadHandle> {
        let raw: RawUpload = self
            .send(
                "create file upload",
                self.client
                    .post(self.url("file_uploads"))
                    .json(&json!({ "filename": filename, "content_type": content_type })),
            )
            .await?;
        Ok(UploadHandle {
            id: raw.id,
            upload_url: raw.upload_url,
        })
    }

    async fn send_upload(
        &self,
        handle: &UploadHandle,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> SyncResult<()> {
        let target = handle
            .upload_url
            .clone()
            .unwrap_or_else(|| self.url(&format!("file_uploads/{}/send", handle.id)));
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| SyncError::Validation(format!("content type {content_type:?}: {e}")))?;
        let _: Value = self
            .send(
                "send file upload",
                self.client
                    .post(target)
                    .multipart(Form::new().part("file", part)),
            )
            .await?;
        debug!(handle = %handle.id, file = filename, "[NOTION] Sent upload bytes");
        Ok(())
    }
}
