//! HTTP surface of the bridge.
//!
//! Four JSON endpoints under `/api`: direct send, campaign enqueue, session
//! status, and recent logs. Handlers own no state of their own: everything
//! lives in [`ApiState`] and is injected via axum's `State` extractor.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use zapcast_core::campaign::{CampaignJob, MediaFile, Target};
use zapcast_core::config::{ApiConfig, CampaignConfig};
use zapcast_core::error::BridgeError;
use zapcast_core::logbuf::LogBuffer;
use zapcast_core::phone;
use zapcast_core::traits::SessionClient;

use crate::queue::CampaignQueue;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    session: Arc<dyn SessionClient>,
    queue: Arc<CampaignQueue>,
    campaign_config: CampaignConfig,
    logs: LogBuffer,
}

/// `POST /api/send` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    phone: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    media_files: Vec<MediaFile>,
}

/// `POST /api/campaign` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CampaignRequest {
    #[serde(default)]
    targets: Vec<Target>,
    #[serde(default)]
    media_files: Vec<MediaFile>,
}

type ApiError = (StatusCode, Json<Value>);

fn err(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({"error": msg.into()})))
}

fn not_ready() -> ApiError {
    err(
        StatusCode::SERVICE_UNAVAILABLE,
        "WhatsApp session not connected. Scan the QR code from /api/status.",
    )
}

/// `POST /api/send`: direct one-target dispatch, bypassing the queue.
async fn send(
    State(state): State<ApiState>,
    body: Result<Json<SendRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    if !state.session.is_ready() {
        return Err(not_ready());
    }

    let Json(request) = body
        .map_err(|e| err(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))?;

    if request.phone.trim().is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "phone is required"));
    }
    // A blank message counts as absent.
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());
    if message.is_none() && request.media_files.is_empty() {
        return Err(err(
            StatusCode::BAD_REQUEST,
            "either message or mediaFiles must be provided",
        ));
    }

    let digits = phone::normalize(&request.phone, &state.campaign_config.country_code);
    let dest = match state.session.resolve(&digits).await {
        Ok(dest) => dest,
        Err(BridgeError::NumberNotFound(n)) => {
            error!("number {n} not found on WhatsApp");
            return Err(err(StatusCode::NOT_FOUND, "number not found on WhatsApp"));
        }
        Err(e) => {
            error!("resolve failed for {digits}: {e}");
            return Err(err(StatusCode::INTERNAL_SERVER_ERROR, "dispatch failed"));
        }
    };

    let outcome = if !request.media_files.is_empty() {
        let mut result = Ok(());
        for (i, media) in request.media_files.iter().enumerate() {
            let caption = if i == 0 { message } else { None };
            result = state.session.send_media(&dest, media, caption).await;
            if result.is_err() {
                break;
            }
        }
        result
    } else {
        // Validated above: message is present when media is empty.
        state.session.send_text(&dest, message.unwrap_or_default()).await
    };

    match outcome {
        Ok(()) => {
            info!("dispatched -> {digits}");
            Ok(Json(json!({"success": true, "message": "dispatched"})))
        }
        Err(e) => {
            error!("dispatch to {digits} failed: {e}");
            Err(err(StatusCode::INTERNAL_SERVER_ERROR, "dispatch failed"))
        }
    }
}

/// `POST /api/campaign`: enqueue a bulk job and return immediately.
async fn campaign(
    State(state): State<ApiState>,
    body: Result<Json<CampaignRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if !state.session.is_ready() {
        return Err(not_ready());
    }

    let Json(request) = body
        .map_err(|e| err(StatusCode::BAD_REQUEST, format!("invalid request: {e}")))?;

    if request.targets.is_empty() {
        return Err(err(StatusCode::BAD_REQUEST, "no targets in list"));
    }

    let total = request.targets.len();
    state.queue.enqueue(CampaignJob {
        targets: request.targets,
        media_files: request.media_files,
    });
    info!("campaign enqueued: {total} targets");

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": "campaign enqueued for background dispatch",
            "targets": total,
        })),
    ))
}

/// `GET /api/status`: readiness, queue depth, last failure, pairing QR.
async fn status(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "ready": state.session.is_ready(),
        "pending": state.queue.pending(),
        "lastError": state.session.last_error().await,
        "qr": state.session.qr_data_url().await,
    }))
}

/// `GET /api/logs`: most recent in-memory log lines, oldest first.
async fn logs(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({"lines": state.logs.lines()}))
}

/// Build the axum router with shared state.
fn build_router(state: ApiState, body_limit_mb: usize) -> Router {
    Router::new()
        .route("/api/send", post(send))
        .route("/api/campaign", post(campaign))
        .route("/api/status", get(status))
        .route("/api/logs", get(logs))
        // Media arrives base64-inline, so the limit is generous.
        .layer(axum::extract::DefaultBodyLimit::max(
            body_limit_mb * 1024 * 1024,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server. Runs until the process exits.
pub async fn serve(
    config: ApiConfig,
    campaign_config: CampaignConfig,
    session: Arc<dyn SessionClient>,
    queue: Arc<CampaignQueue>,
    logs: LogBuffer,
) -> anyhow::Result<()> {
    let state = ApiState {
        session,
        queue,
        campaign_config,
        logs,
    };

    let app = build_router(state, config.body_limit_mb);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
