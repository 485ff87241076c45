// Subscription socket handler - upgrade, registration, message loop, cleanup.
use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::Message, ws::WebSocket},
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;
use crate::ws::messages::{ClientMessage, ServerMessage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsQuery {
    pub user_id: String,
}

/// HTTP endpoint: upgrade to the push-event socket for one user.
///
/// Identity is taken from the `userId` query parameter; authentication is
/// the outer layer's concern.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, query.user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let connection_id = Uuid::new_v4();

    state
        .hub
        .register_connection(&user_id, connection_id, tx.clone())
        .await;
    tracing::info!("WebSocket connected: user {} ({})", user_id, connection_id);

    // Writer task pumps hub events (and acks) into the socket so hub sends
    // never await socket backpressure.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        let parsed: ClientMessage = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Ignoring malformed client frame: {}", e);
                continue;
            }
        };

        let ack = match parsed {
            ClientMessage::Subscribe { game_id } => {
                state.hub.subscribe(&user_id, game_id).await;
                tracing::debug!("User {} subscribed to game {}", user_id, game_id);
                ServerMessage::Subscribed { game_id }
            }
            ClientMessage::Unsubscribe { game_id } => {
                state.hub.unsubscribe(&user_id, game_id).await;
                ServerMessage::Unsubscribed { game_id }
            }
            ClientMessage::Ping => ServerMessage::Pong,
        };

        if let Ok(json) = serde_json::to_string(&ack) {
            if tx.send(Message::Text(json.into())).is_err() {
                break;
            }
        }
    }

    state.hub.unregister_connection(connection_id).await;
    writer.abort();
    tracing::info!("WebSocket disconnected: user {} ({})", user_id, connection_id);
}
