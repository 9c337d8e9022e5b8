//! Realtime publisher transport (spec.md §6 `Publish(userId, {job})`).
//!
//! The engine models `Publish` as an external collaborator and "does not
//! care about transport"; this WebSocket endpoint is the concrete delivery
//! mechanism layered over `vclip_queue::ProgressChannel`'s Redis pub/sub.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, warn};

use vclip_models::JobId;

use crate::metrics;
use crate::state::AppState;

static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// `GET /ws/jobs/:job_id` — subscribe to progress events for one job.
///
/// Ownership is not enforced here: the HTTP-auth layer this endpoint sits
/// behind is out of scope, so the job id itself (an unguessable UUID) is
/// the capability.
pub async fn ws_job_progress(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("job_progress");

    ws.on_upgrade(move |socket| async move {
        handle_progress_socket(socket, state, JobId::from_string(job_id)).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_progress_socket(socket: WebSocket, state: AppState, job_id: JobId) {
    let (ws_sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut stream = match state.progress.subscribe(&job_id).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx
                .send(Message::Text(format!("{{\"error\":\"subscribe failed: {e}\"}}")))
                .await;
            drop(tx);
            let _ = send_task.await;
            return;
        }
    };

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    info!(job_id = %job_id, "progress subscriber connected");

    loop {
        tokio::select! {
            event = stream.next() => {
                match event {
                    Some(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(p) => p,
                            Err(_) => continue,
                        };
                        metrics::record_ws_message_sent("job_progress", event.status.as_str());
                        if tx.send(Message::Text(payload)).await.is_err() {
                            warn!(job_id = %job_id, "progress subscriber send failed");
                            break;
                        }
                        if event.status.is_terminal() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
    info!(job_id = %job_id, "progress subscriber disconnected");
}
