use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::commands::FrameOutcome;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// One client connection: a setup frame, then request/response pairs in order
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!("Client {} connected", client_id);

    let mut authorized = false;

    while let Some(msg) = socket.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                debug!("Client {} socket error: {}", client_id, e);
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        if !authorized {
            if state.engine.authorize(text.as_str()) {
                authorized = true;
                debug!("Client {} authorized", client_id);
                continue;
            }
            warn!("Client {} failed setup, closing", client_id);
            let _ = socket.send(Message::Close(None)).await;
            break;
        }

        match state.engine.handle_frame(text.as_str()).await {
            FrameOutcome::Reply(reply) => {
                if socket.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            FrameOutcome::Silent => {}
        }
    }

    info!("Client {} disconnected", client_id);
}
