//! Loopback HTTP callback listener.
//!
//! Three endpoints: a health probe, the plain JSON callback, and the
//! channel-callback that accepts the opaque `ag:<verb>:<id>` token.
//! Unknown or already-resolved ids are reported as `resolved: false`, never
//! as errors — the callback layer silently drops duplicate resolutions.
//!
//! CORS is wide open (wildcard origin, permissive preflight) to simplify
//! browser-based approval UIs during local development; the listener is
//! loopback-only, so this exposes nothing off-host.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use keyward_core::CallbackData;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::broker::Broker;
use crate::registry::Resolution;

/// Shared state for the callback handlers.
#[derive(Clone)]
struct AppState {
    broker: Arc<Broker>,
}

/// Build the callback router.
#[must_use]
pub fn router(broker: Arc<Broker>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/callback", post(callback))
        .route("/channel-callback", post(channel_callback))
        .layer(CorsLayer::permissive())
        .with_state(AppState { broker })
}

/// Bind the loopback listener on the configured port.
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(addr = %listener.local_addr()?, "http callback listener bound");
    Ok(listener)
}

/// Serve the router on an already-bound listener.
///
/// # Errors
///
/// Returns an error if the server fails.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>) -> std::io::Result<()> {
    axum::serve(listener, router(broker)).await
}

/// `GET /health`.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "pending": state.broker.pending_count().await,
    }))
}

#[derive(Debug, Deserialize)]
struct CallbackBody {
    #[serde(rename = "requestId")]
    request_id: Option<String>,
    approved: Option<bool>,
}

/// `POST /callback` with `{requestId, approved}`.
async fn callback(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let Ok(body) = serde_json::from_slice::<CallbackBody>(&body) else {
        return bad_request("Invalid JSON body");
    };
    let Some(raw_id) = body.request_id else {
        return bad_request("Missing requestId");
    };
    let Ok(id) = raw_id.parse::<keyward_core::RequestId>() else {
        return bad_request("Invalid requestId");
    };
    let Some(approved) = body.approved else {
        return bad_request("Missing approved");
    };

    let resolution = if approved {
        Resolution::Approved
    } else {
        Resolution::Denied
    };
    let resolved = state.broker.registry().resolve(id, resolution).await;
    (StatusCode::OK, Json(json!({"ok": true, "resolved": resolved})))
}

#[derive(Debug, Deserialize)]
struct ChannelCallbackBody {
    callback_data: Option<String>,
}

/// `POST /channel-callback` with `{callback_data: "ag:<verb>:<id>"}`.
async fn channel_callback(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let Ok(body) = serde_json::from_slice::<ChannelCallbackBody>(&body) else {
        return bad_request("Invalid JSON body");
    };
    let Some(raw) = body.callback_data else {
        return bad_request("Missing callback_data");
    };
    let Ok(data) = raw.parse::<CallbackData>() else {
        return bad_request("Invalid callback_data");
    };

    let resolution = if data.approved() {
        Resolution::Approved
    } else {
        Resolution::Denied
    };
    let resolved = state
        .broker
        .registry()
        .resolve(data.request_id(), resolution)
        .await;
    (StatusCode::OK, Json(json!({"ok": true, "resolved": resolved})))
}

fn bad_request(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message})))
}
