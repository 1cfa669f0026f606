//! WebSocket push channel

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use campus_core::FeedMessage;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler for `/ws/twins/{twin}`
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(twin_id): Path<String>,
) -> Response {
    if let Err(e) = state.check_twin(&twin_id) {
        return e.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, twin_id))
}

type Sender = SplitSink<WebSocket, Message>;

/// Serialize and send one feed message; `false` once the client is gone
async fn send_message(sender: &mut Sender, msg: &FeedMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode feed message");
            true
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, twin_id: String) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the snapshot so nothing published in between is lost
    let mut events = state.subscribe();

    info!(twin = %twin_id, "WebSocket client connected");

    let snapshot = FeedMessage::SensorSnapshot(state.snapshot().await);
    if !send_message(&mut sender, &snapshot).await {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(msg) => {
                        if !send_message(&mut sender, &msg).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        // Resync a slow client with a full snapshot
                        debug!(skipped = n, "Feed channel lagged");
                        let snapshot = FeedMessage::SensorSnapshot(state.snapshot().await);
                        if !send_message(&mut sender, &snapshot).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        if text.as_str() == "ping" && !send_message(&mut sender, &FeedMessage::Pong).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!(twin = %twin_id, "WebSocket client disconnected");
}
