/**
 * Streaming Upgrade
 *
 * `GET /v1/sync?jwt=...` upgrades an authenticated client into the
 * subscriber hub. The token travels as a query parameter because browser
 * WebSocket clients cannot set an Authorization header on the upgrade;
 * unauthenticated upgrades are refused before any frame is exchanged.
 *
 * Each connection runs two loops: the read loop decodes JSON frames and
 * dispatches them on the header's `type` field, exiting on the first
 * malformed frame; the write loop drains the subscriber's three bounded
 * queues with a per-message deadline and observes both the per-connection
 * closing token and the server shutdown token.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::backend::auth::tokens::verify_token;
use crate::backend::server::state::AppState;
use crate::backend::sync::subscriber::SLOW_CONSUMER_REASON;
use crate::backend::sync::{Subscriber, SubscriberChannels};
use crate::shared::{ChunkMessage, CursorMessage, EventMessage, MessageType};

/// Per-message write deadline on the outbound loop.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
pub struct SyncQuery {
    pub jwt: Option<String>,
}

/// `GET /v1/sync`
pub async fn sync_handler(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(token) = query.jwt else {
        tracing::warn!("sync upgrade rejected: missing jwt query parameter");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let workspace_id = match verify_token(&state.options.jwt_secret, &token) {
        Ok(workspace_id) => workspace_id,
        Err(_) => {
            tracing::warn!("sync upgrade rejected: invalid token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(state, socket, workspace_id))
}

async fn handle_socket(state: AppState, socket: WebSocket, workspace_id: i64) {
    let (ws_tx, ws_rx) = socket.split();

    let hub = state.sync.hub().clone();
    let (subscriber, channels) = hub.subscribe(workspace_id).await;
    subscriber.mark_connected();

    tracing::info!(
        client_id = %subscriber.client_id,
        workspace_id,
        "client connected"
    );

    let write_task = tokio::spawn(write_loop(
        ws_tx,
        channels,
        subscriber.clone(),
        state.shutdown.clone(),
    ));

    read_loop(ws_rx, &state, &subscriber).await;

    subscriber.begin_close("client disconnected");
    let _ = write_task.await;

    hub.remove(subscriber.client_id).await;
    tracing::info!(
        client_id = %subscriber.client_id,
        workspace_id,
        "client disconnected"
    );
}

/// Decode inbound frames and dispatch them until the client goes away or
/// sends something unreadable.
async fn read_loop(mut ws_rx: SplitStream<WebSocket>, state: &AppState, subscriber: &Subscriber) {
    while let Some(frame) = ws_rx.next().await {
        if !subscriber.is_connected() {
            return;
        }

        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => return,
            Ok(_) => continue,
            Err(err) => {
                tracing::debug!(client_id = %subscriber.client_id, "read error: {err}");
                return;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(client_id = %subscriber.client_id, "malformed frame: {err}");
                return;
            }
        };

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_i64)
            .and_then(|raw| MessageType::try_from(raw).ok());

        match kind {
            Some(MessageType::Chunk) => match serde_json::from_value::<ChunkMessage>(value) {
                Ok(msg) => state.sync.on_chunk_message(subscriber, msg).await,
                Err(err) => {
                    tracing::warn!(client_id = %subscriber.client_id, "bad chunk frame: {err}");
                    return;
                }
            },
            Some(MessageType::Create) | Some(MessageType::Delete) | Some(MessageType::Rename) => {
                match serde_json::from_value::<EventMessage>(value) {
                    Ok(msg) => state.sync.on_event_message(subscriber, msg).await,
                    Err(err) => {
                        tracing::warn!(client_id = %subscriber.client_id, "bad event frame: {err}");
                        return;
                    }
                }
            }
            Some(MessageType::Cursor) => match serde_json::from_value::<CursorMessage>(value) {
                Ok(msg) => state.sync.on_cursor_message(subscriber, msg).await,
                Err(err) => {
                    tracing::warn!(client_id = %subscriber.client_id, "bad cursor frame: {err}");
                    return;
                }
            },
            None => {
                tracing::warn!(client_id = %subscriber.client_id, "frame without a known type");
                return;
            }
        }
    }
}

/// Drain the subscriber queues onto the socket. Exits when the connection
/// or the server is winding down, sending the appropriate close frame.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut channels: SubscriberChannels,
    subscriber: Arc<Subscriber>,
    shutdown: tokio_util::sync::CancellationToken,
) {
    let closing = subscriber.closing_token();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                send_close(&mut ws_tx, close_code::NORMAL, "server shutting down").await;
                break;
            }
            _ = closing.cancelled() => {
                let reason = subscriber.close_reason().unwrap_or_default();
                let code = if reason == SLOW_CONSUMER_REASON {
                    close_code::POLICY
                } else {
                    close_code::NORMAL
                };
                send_close(&mut ws_tx, code, &reason).await;
                break;
            }
            msg = channels.chunk_rx.recv() => {
                let Some(msg) = msg else { break };
                if write_json(&mut ws_tx, &msg).await.is_err() {
                    break;
                }
            }
            msg = channels.event_rx.recv() => {
                let Some(msg) = msg else { break };
                if write_json(&mut ws_tx, &msg).await.is_err() {
                    break;
                }
            }
            msg = channels.cursor_rx.recv() => {
                let Some(msg) = msg else { break };
                if write_json(&mut ws_tx, &msg).await.is_err() {
                    break;
                }
            }
        }
    }

    subscriber.mark_closed();
}

async fn write_json<T: serde::Serialize>(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &T,
) -> Result<(), ()> {
    let text = serde_json::to_string(msg).map_err(|_| ())?;

    match tokio::time::timeout(WRITE_TIMEOUT, ws_tx.send(Message::Text(text.into()))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) | Err(_) => Err(()),
    }
}

async fn send_close(ws_tx: &mut SplitSink<WebSocket, Message>, code: u16, reason: &str) {
    let frame = CloseFrame {
        code,
        reason: reason.to_string().into(),
    };
    let _ = tokio::time::timeout(WRITE_TIMEOUT, ws_tx.send(Message::Close(Some(frame)))).await;
}
