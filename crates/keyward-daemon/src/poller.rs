//! Drop-directory callback poller.
//!
//! The third callback ingress: a file named `<requestId>.json` containing
//! `{"approved": bool}` in the pending drop directory resolves that
//! request. One shared scanner runs on a fixed cadence, keyed off the
//! registry's outstanding ids; files naming unknown ids are left in place
//! (an external writer may still be racing a registration), as are files
//! that do not parse (the writer may not have finished).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::registry::{PendingRegistry, Resolution};

/// Scan cadence. A design constant, not tunable: it dominates perceived
/// latency only when the HTTP callback path is unavailable.
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct DropFile {
    approved: bool,
}

/// Spawn the scanner task.
#[must_use]
pub fn spawn(dir: PathBuf, registry: Arc<PendingRegistry>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %e, "cannot create pending drop directory");
        }
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            scan(&dir, &registry).await;
        }
    })
}

/// One pass over the drop directory for every currently pending id.
async fn scan(dir: &Path, registry: &PendingRegistry) {
    let pending = registry.pending_ids().await;
    for id in pending {
        let path = dir.join(format!("{id}.json"));
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(_) => continue,
        };
        let Ok(body) = serde_json::from_str::<DropFile>(&raw) else {
            debug!(path = %path.display(), "drop file does not parse yet; leaving in place");
            continue;
        };

        // Unlink is the commit point: the file must be gone before the
        // waiter wakes, so a later scan can never observe it again.
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %e, "cannot unlink drop file");
            continue;
        }

        let resolution = if body.approved {
            Resolution::Approved
        } else {
            Resolution::Denied
        };
        registry.resolve(id, resolution).await;
    }
}
