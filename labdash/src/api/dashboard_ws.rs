//! WebSocket endpoint for real-time dashboard updates
//!
//! `/ws` registers the socket with the [`BroadcastHub`], then runs two tasks:
//! a writer that drains the hub's queue for this connection (plus periodic
//! Ping frames), and a reader that forwards control frames to the hub.
//! Whichever finishes first tears the connection down.

use crate::events::{BroadcastHub, ClientHandle};
use crate::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use labdash_common::protocol::ControlMessage;
use std::time::Duration;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

/// WebSocket upgrade handler for dashboard clients
pub async fn dashboard_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    let heartbeat = state.heartbeat_interval;
    ws.on_upgrade(move |socket| handle_socket(socket, hub, heartbeat))
}

async fn handle_socket(socket: WebSocket, hub: BroadcastHub, heartbeat: Duration) {
    let ClientHandle { id, mut frames } = hub.connect().await;
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
        loop {
            tokio::select! {
                frame = frames.recv() => {
                    // None: the hub dropped this connection
                    let Some(frame) = frame else { break };
                    if let Err(e) = sender.send(Message::Text(frame.to_string())).await {
                        debug!(connection = %id, error = %e, "Failed to write frame");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    let recv_hub = hub.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => match ControlMessage::parse(&text) {
                    Ok(control) => {
                        if let Err(e) = recv_hub.handle_control_message(id, control).await {
                            warn!(connection = %id, error = %e, "Failed to handle control message");
                        }
                    }
                    Err(e) => debug!(connection = %id, error = %e, "Ignoring malformed frame"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    debug!(connection = %id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.disconnect(id).await;
}
