//! Carries the bridge protocol over a WebSocket: one text frame per message.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use bridge::Attachment;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::AppState;

pub async fn bridge_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// Serves one surface until either side goes away or a newer surface
/// replaces it.
async fn run_session(socket: WebSocket, state: AppState) {
    let conn = Uuid::new_v4();
    let Attachment {
        session,
        mut outbound,
    } = state.attach();
    info!(%conn, session, "surface connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut sender = tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("failed to serialize {}: {e}", msg.kind());
                    continue;
                }
            };
            if let Err(e) = ws_tx.send(Message::Text(text)).await {
                warn!("failed to send to surface: {e}");
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                let Some(frame) = frame else { break };
                match frame {
                    Ok(Message::Text(text)) => state.handle_text(&text),
                    Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                        Ok(text) => state.handle_text(text),
                        Err(_) => debug!(%conn, "ignoring non-UTF-8 binary frame"),
                    },
                    Ok(Message::Close(_)) => {
                        info!(%conn, session, "surface closed the connection");
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Err(e) => {
                        warn!(%conn, "surface receive error: {e}");
                        break;
                    }
                }
            }
            // The outlet was replaced by a newer surface or the socket broke.
            _ = &mut sender => {
                info!(%conn, session, "surface session superseded");
                break;
            }
        }
    }

    sender.abort();
    if state.detach(session) {
        info!(%conn, session, "surface disconnected");
    }
}
