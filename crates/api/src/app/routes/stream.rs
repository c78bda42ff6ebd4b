//! Live update stream endpoint.
//!
//! Bridges a blocking `ClientFeed` onto a Server-Sent Events response.
//! The client first receives a `snapshot` event, then incremental
//! `update` events. When the feed falls behind, the bridge performs the
//! resync itself and emits a fresh `snapshot` instead of forwarding the
//! marker.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::Extension,
    response::{
        IntoResponse,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::get,
};
use tokio::sync::mpsc::unbounded_channel;
use tokio_stream::wrappers::UnboundedReceiverStream;

use tillsync_auth::ConnectionIdentity;
use tillsync_live::ClientUpdate;

use crate::app::errors;
use crate::app::services::AppServices;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub fn router() -> Router {
    Router::new().route("/stream", get(stream_updates))
}

/// GET /stream
pub async fn stream_updates(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<ConnectionIdentity>,
) -> axum::response::Response {
    let (feed, snapshot) = match services.hub().subscribe(identity) {
        Ok(pair) => pair,
        Err(err) => return errors::ledger_error_to_response(err),
    };

    let (tx, rx) = unbounded_channel::<Result<SseEvent, std::convert::Infallible>>();

    let hub = Arc::clone(services.hub());
    tokio::task::spawn_blocking(move || {
        let snapshot_event = |snapshot: &tillsync_live::SyncSnapshot| {
            serde_json::to_string(snapshot)
                .map(|json| SseEvent::default().event("snapshot").data(json))
        };

        match snapshot_event(&snapshot) {
            Ok(event) => {
                if tx.send(Ok(event)).is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize snapshot");
                return;
            }
        }

        let mut last_heartbeat = std::time::Instant::now();
        loop {
            match feed.recv_timeout(Duration::from_secs(1)) {
                Ok(ClientUpdate::Resync) => {
                    // Resync on the client's behalf; over SSE the browser
                    // cannot call back into the hub.
                    let snapshot = match hub.resync(&feed) {
                        Ok(snapshot) => snapshot,
                        Err(err) => {
                            tracing::warn!(error = %err, "resync failed; closing stream");
                            return;
                        }
                    };
                    match snapshot_event(&snapshot) {
                        Ok(event) => {
                            if tx.send(Ok(event)).is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize snapshot");
                            return;
                        }
                    }
                    last_heartbeat = std::time::Instant::now();
                }
                Ok(update) => {
                    let json = match serde_json::to_string(&update) {
                        Ok(json) => json,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize update");
                            continue;
                        }
                    };
                    let event = SseEvent::default().event("update").data(json);
                    if tx.send(Ok(event)).is_err() {
                        return;
                    }
                    last_heartbeat = std::time::Instant::now();
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    if last_heartbeat.elapsed() > HEARTBEAT_INTERVAL {
                        let heartbeat = SseEvent::default().event("heartbeat").data("{}");
                        if tx.send(Ok(heartbeat)).is_err() {
                            return;
                        }
                        last_heartbeat = std::time::Instant::now();
                    }
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => return,
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL))
        .into_response()
}
