//! Session socket endpoint
//!
//! Each WebSocket connection becomes a hub connection: text frames are
//! decoded into [`ClientEvent`]s and forwarded, hub events are encoded and
//! written back. Closing either direction tears the connection down.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use jamsync_common::events::ClientEvent;
use tracing::{debug, warn};

use super::hub::HubHandle;
use crate::AppState;

/// GET /ws
pub async fn session_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(socket, state.hub))
}

async fn run_connection(socket: WebSocket, hub: HubHandle) {
    let (conn, mut inbox) = hub.connect();
    let (mut sink, mut stream) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let frame = match event.to_json() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Failed to encode session event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(frame) => match ClientEvent::from_json(&frame) {
                    Ok(event) => recv_hub.send(conn, event),
                    Err(e) => warn!(conn = %conn, "Dropping undecodable frame: {}", e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    debug!(conn = %conn, "Socket closed");
    hub.disconnect(conn);
}
