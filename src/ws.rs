//! WebSocket session endpoint
//!
//! Each connection gets its own read loop plus a pump task that owns the
//! socket's write half and drains the session's outbound channel. The
//! read loop handles one command at a time, so notifications reach the
//! pump in emission order and a generation turn can never deadlock
//! against the socket write path. Both tasks end with the connection.

use crate::api::AppState;
use crate::protocol::{ClientCommand, ServerEvent};
use crate::session::ChatSession;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    tracing::info!("WebSocket client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Outgoing pump; exits when the channel closes or the send fails,
    // which in turn surfaces the disconnect to the session
    let pump = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode outbound event");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let mut session = ChatSession::new(state.db.clone(), state.ollama.clone(), out_tx);

    while let Some(frame) = ws_rx.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read failed");
                break;
            }
        };

        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => continue,
        };

        let command: ClientCommand = match serde_json::from_str(&text) {
            Ok(command) => command,
            Err(e) => {
                // A frame that does not decode means the connection is
                // unusable
                tracing::warn!(error = %e, "Malformed frame, closing connection");
                break;
            }
        };

        if session.handle(command).await.is_err() {
            break;
        }
    }

    pump.abort();
    tracing::info!("WebSocket client disconnected");
}
