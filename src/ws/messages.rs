// Client <-> server frames for the subscription socket.
//
// Game events themselves (`GAME_UPDATE`, `GAME_COMPLETE`,
// `TURN_NOTIFICATION`) are defined in `models::event` and share this
// socket; the frames here only manage the subscription set.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client -> server messages.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Subscribe { game_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { game_id: Uuid },
    Ping,
}

/// Server -> client acks, discriminated by `type` like the event frames.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "SUBSCRIBED", rename_all = "camelCase")]
    Subscribed { game_id: Uuid },
    #[serde(rename = "UNSUBSCRIBED", rename_all = "camelCase")]
    Unsubscribed { game_id: Uuid },
    #[serde(rename = "PONG")]
    Pong,
}
