// WebSocket handler for the remote-control relay.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::AppState;

/// WebSocket upgrade handler for desktop and mobile control clients.
pub async fn ws_control(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let id = Uuid::new_v4();
    let (outbox, mut rx) = mpsc::unbounded_channel::<String>();
    tracing::debug!("Control socket {id} connected");

    loop {
        tokio::select! {
            // Frame routed to this client by the hub
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            // Frame sent by this client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        state.control.handle_frame(id, &outbox, text.as_str());
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    state.control.disconnect(id);
}
