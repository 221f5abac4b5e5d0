//! HTTP surface.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/push` | Copy a board item's files onto a page |
//! | `HEAD` | `/api/webhook` | Keep-alive probe, always 200 |
//! | `POST` | `/api/webhook` | Page webhook: verification or content update |
//! | `GET`  | `/health` | Liveness with version |
//!
//! Wrong methods on known paths get axum's 405. Failures are reported as
//! `{ok: false, error}` with 400 for invalid input and 500 for everything
//! else.

use std::sync::Arc;

use anyhow::Context;
use attachment_sync_core::contract::{BoardApi, MediaFetcher, PageApi};
use attachment_sync_core::ledger::{JsonFileLedger, MemoryLedger, SeenLedger};
use attachment_sync_core::synchronise::{
    pull_page_to_board, push_item_to_page, PullOutcome, SyncSettings,
};
use attachment_sync_core::SyncError;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::fetch::HttpFetcher;
use crate::http::build_client;
use crate::load_config::CliConfig;
use crate::monday::MondayClient;
use crate::notion::NotionClient;

/// Webhook event type that triggers a pull.
pub const CONTENT_UPDATED: &str = "page.content_updated";

/// Shared handler state: upstream clients, ledger and sync settings.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<dyn BoardApi>,
    pub pages: Arc<dyn PageApi>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub ledger: Arc<dyn SeenLedger>,
    pub settings: Arc<SyncSettings>,
}

impl AppState {
    /// Real clients and the configured ledger.
    pub fn from_config(config: &CliConfig) -> anyhow::Result<Self> {
        let client = build_client(config.http.timeout())?;
        let ledger: Arc<dyn SeenLedger> = match &config.ledger.path {
            Some(path) => Arc::new(
                JsonFileLedger::open(path)
                    .with_context(|| format!("Failed to open ledger {}", path.display()))?,
            ),
            None => Arc::new(MemoryLedger::new()),
        };
        Ok(Self {
            board: Arc::new(MondayClient::from_config(config, client.clone())),
            pages: Arc::new(NotionClient::from_config(config, client.clone())),
            fetcher: Arc::new(HttpFetcher::new(client)),
            ledger,
            settings: Arc::new(config.sync_settings()),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/push", post(handle_push))
        .route(
            "/api/webhook",
            post(handle_webhook).head(|| async { StatusCode::OK }),
        )
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `server.bind` and serves until ctrl-c.
pub async fn serve(config: &CliConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(bind = %config.server.bind, "[SERVER] Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("[SERVER] Shutdown signal received");
        })
        .await?;
    Ok(())
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "ok": false, "error": self.message })),
        )
            .into_response()
    }
}

/// Validated push request.
#[derive(Debug, PartialEq, Eq)]
pub struct PushRequest {
    pub item_id: u64,
    pub page_id: Option<String>,
}

/// `itemId` must be a positive JSON integer. `pageId`, when present and not
/// null, must be a non-empty string.
pub fn parse_push_request(body: &[u8]) -> Result<PushRequest, String> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| format!("body is not valid JSON: {e}"))?;
    let item_id = value
        .get("itemId")
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or_else(|| "itemId must be a positive integer".to_string())?;
    let page_id = match value.get("pageId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
        Some(_) => return Err("pageId must be a non-empty string".to_string()),
    };
    Ok(PushRequest { item_id, page_id })
}

#[derive(Debug, Serialize)]
struct PushResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    attachments: usize,
}

async fn handle_push(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = parse_push_request(&body).map_err(|message| {
        warn!(error = %message, "[PUSH] Rejected request");
        ApiError::bad_request(message)
    })?;

    let report = push_item_to_page(
        state.board.as_ref(),
        state.pages.as_ref(),
        state.fetcher.as_ref(),
        state.ledger.as_ref(),
        &state.settings,
        request.item_id,
        request.page_id.as_deref(),
    )
    .await
    .map_err(|e| {
        error!(item_id = request.item_id, error = %e, "[PUSH][ERROR] Push failed");
        ApiError::from(e)
    })?;

    Ok(Json(PushResponse {
        ok: true,
        url: report.url,
        attachments: report.attachments,
    })
    .into_response())
}

/// Webhook envelope. Only the fields the handler branches on are typed.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    pub challenge: Option<Value>,
    pub verification_token: Option<Value>,
    pub entity: Option<WebhookEntity>,
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntity {
    pub id: String,
}

impl WebhookEvent {
    pub fn is_verification(&self) -> bool {
        matches!(
            self.event_type.as_deref(),
            Some("url_verification") | Some("verification")
        ) || self.challenge.is_some()
            || self.verification_token.is_some()
    }

    /// The updated page: `entity.id`, else `data.page_id`.
    pub fn page_id(&self) -> Option<String> {
        self.entity
            .as_ref()
            .map(|e| e.id.clone())
            .or_else(|| {
                self.data
                    .as_ref()
                    .and_then(|d| d.get("page_id"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|id| !id.trim().is_empty())
    }
}

async fn handle_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("body is not a webhook event: {e}")))?;

    if event.is_verification() {
        let challenge = event
            .challenge
            .or(event.verification_token)
            .unwrap_or(Value::Null);
        info!("[WEBHOOK] Answered verification handshake");
        return Ok(Json(json!({ "challenge": challenge })).into_response());
    }

    if event.event_type.as_deref() != Some(CONTENT_UPDATED) {
        info!(event_type = ?event.event_type, "[WEBHOOK] Ignored event");
        return Ok((StatusCode::OK, "ignored").into_response());
    }

    let page_id = event
        .page_id()
        .ok_or_else(|| ApiError::bad_request("webhook event has no page id"))?;

    let outcome = pull_page_to_board(
        state.board.as_ref(),
        state.pages.as_ref(),
        state.fetcher.as_ref(),
        state.ledger.as_ref(),
        &state.settings,
        &page_id,
    )
    .await
    .map_err(|e| {
        error!(page_id = %page_id, error = %e, "[WEBHOOK][ERROR] Pull failed");
        ApiError::from(e)
    })?;

    Ok(match outcome {
        PullOutcome::NoBoardItem => (StatusCode::OK, "no monday row").into_response(),
        PullOutcome::NothingNew => (StatusCode::OK, "nothing new").into_response(),
        PullOutcome::Added { added, .. } => Json(json!({ "ok": true, "added": added })).into_response(),
    })
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
