//! Local request transport.
//!
//! A Unix stream server carrying newline-delimited JSON: one request object
//! per line in, one response object per line out, order preserved per
//! connection. Empty lines are ignored; malformed JSON gets
//! `{"error":"Invalid JSON"}` and the connection stays open.

use serde::Deserialize;
use serde_json::{json, Value};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::broker::Broker;

/// One request line. Unknown actions are dispatched by name, so `action`
/// is the only required field.
#[derive(Debug, Deserialize)]
struct Request {
    action: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Bind the socket, replacing any stale endpoint, and serve forever.
///
/// The endpoint is made world-read/writable: the caller runs under a
/// different OS identity and the containing directory carries the real
/// access control.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound.
pub async fn serve(path: &Path, broker: Arc<Broker>) -> std::io::Result<()> {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let listener = UnixListener::bind(path)?;
    let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666));
    info!(path = %path.display(), "listening on unix socket");

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let broker = Arc::clone(&broker);
                tokio::spawn(async move {
                    handle_connection(stream, broker).await;
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to accept socket connection");
            }
        }
    }
}

/// Sequential request/response loop for one connection.
///
/// Requests on a single connection are processed in order, so responses
/// preserve request order. A caller that disconnects mid-wait does not
/// cancel the approval: the request completes (and is audited) and the
/// response write to the dead connection is simply discarded.
async fn handle_connection(stream: UnixStream, broker: Arc<Broker>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(error = %e, "socket read failed");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Ok(value) => dispatch(&broker, value).await,
            Err(_) => json!({"error": "Invalid JSON"}),
        };

        let mut payload = response.to_string();
        payload.push('\n');
        if write_half.write_all(payload.as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Route one parsed request to its handler.
async fn dispatch(broker: &Broker, value: Value) -> Value {
    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(_) => return json!({"error": "Missing action"}),
    };

    match request.action.as_str() {
        "read" => {
            let Some(uri) = request.uri.as_deref() else {
                return json!({"error": "Missing uri"});
            };
            match broker.handle_read(uri, request.reason.as_deref()).await {
                Ok(value) => json!({"value": value}),
                Err(error) => json!({"error": error}),
            }
        }
        "ping" => json!({
            "status": "ok",
            "pending": broker.pending_count().await,
        }),
        "status" => json!({
            "status": "running",
            "pending": broker.pending_count().await,
            "cacheSize": broker.cache_size().await,
            "uptimeSeconds": broker.uptime_seconds(),
            "channels": broker.channel_names(),
            "provider": broker.provider_name(),
        }),
        other => json!({"error": format!("Unknown action: {other}")}),
    }
}
