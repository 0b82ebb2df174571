//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and streams monitor snapshots to each
//! connection until either side goes away.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::messages::{ClientMessage, ServerMessage};
use crate::api::{ApiError, AppState};

/// WebSocket upgrade handler
///
/// Rejects the upgrade with 503 once `max_ws_connections` are open.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let max = state.config.max_ws_connections;
    let reserved = state
        .ws_connections
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
            (count < max).then_some(count + 1)
        })
        .is_ok();

    if !reserved {
        tracing::warn!(max_connections = max, "WebSocket connection limit reached");
        return ApiError::ServiceUnavailable(format!(
            "Maximum WebSocket connections ({}) reached",
            max
        ))
        .into_response();
    }

    // Released when the connection ends or the upgrade never completes
    let slot = ConnectionSlot(Arc::clone(&state.ws_connections));
    ws.on_upgrade(move |socket| async move {
        let _slot = slot;
        handle_socket(socket, state).await;
    })
}

/// One reserved unit of the connection limit
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();
    let mut snapshots = state.monitor.subscribe();

    tracing::debug!(connection_id = %connection_id, "WebSocket connected");

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let initial = ServerMessage::snapshot(&snapshots.borrow_and_update());
    if !send_message(&mut sender, &connected).await || !send_message(&mut sender, &initial).await
    {
        tracing::debug!(connection_id = %connection_id, "Failed to send greeting");
        return;
    }

    // Replies to client messages (pong, errors)
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let conn_id_for_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                reply = reply_rx.recv() => match reply {
                    Some(message) => message,
                    None => break,
                },
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        // Monitor is gone
                        break;
                    }
                    ServerMessage::snapshot(&snapshots.borrow_and_update())
                }
            };

            if !send_message(&mut sender, &message).await {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let conn_id_for_recv = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&reply_tx, &conn_id_for_recv, msg) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::debug!(connection_id = %connection_id, "WebSocket disconnected");
}

/// Serialize and send one message; false if the socket is unusable
async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> bool {
    match serde_json::to_string(message) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            true
        }
    }
}

/// Handle a received WebSocket message
///
/// Returns false if the connection should be closed.
fn handle_ws_message(
    replies: &mpsc::UnboundedSender<ServerMessage>,
    connection_id: &str,
    message: Message,
) -> bool {
    let reply = match message {
        Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => ServerMessage::Pong,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    text = %text,
                    "Invalid client message"
                );
                ServerMessage::Error {
                    message: format!("Invalid message format: {}", e),
                }
            }
        },
        Message::Binary(_) => ServerMessage::Error {
            message: "Binary messages not supported".to_string(),
        },
        // Axum answers protocol pings itself
        Message::Ping(_) | Message::Pong(_) => return true,
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            return false;
        }
    };

    replies.send(reply).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_gets_pong() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(handle_ws_message(&tx, "c1", Message::Text(r#"{"type":"ping"}"#.to_string())));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Pong)));
    }

    #[test]
    fn test_invalid_message_keeps_connection_open() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(handle_ws_message(&tx, "c1", Message::Text("not json".to_string())));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));

        assert!(handle_ws_message(&tx, "c1", Message::Binary(vec![1, 2, 3])));
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Error { .. })));
    }

    #[test]
    fn test_connection_slot_releases_on_drop() {
        let counter = Arc::new(AtomicUsize::new(1));
        drop(ConnectionSlot(Arc::clone(&counter)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_close_ends_connection() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(!handle_ws_message(&tx, "c1", Message::Close(None)));
        assert!(rx.try_recv().is_err());
    }
}
