// Subscriber hub: connection registry, per-game subscriptions, fan-out.
use std::collections::{HashMap, HashSet};

use axum::extract::ws::Message;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use crate::models::GameEvent;

/// Unicast sink for one connection. The socket handler pumps this channel
/// into the websocket, so hub sends never block the move pipeline.
pub type EventSender = mpsc::UnboundedSender<Message>;

#[derive(Debug)]
struct Connection {
    user_id: String,
    sender: EventSender,
}

#[derive(Debug, Default)]
struct HubInner {
    /// All live connections keyed by connection id.
    connections: HashMap<Uuid, Connection>,
    /// Index by user id -> connection ids (multi-tab support).
    by_user: HashMap<String, HashSet<Uuid>>,
    /// game id -> subscribed user ids.
    game_subscribers: HashMap<Uuid, HashSet<String>>,
    /// user id -> subscribed game ids (reverse index for cleanup).
    user_subscriptions: HashMap<String, HashSet<Uuid>>,
}

impl HubInner {
    fn remove_connection(&mut self, connection_id: Uuid) {
        let Some(conn) = self.connections.remove(&connection_id) else {
            return;
        };

        let user_gone = if let Some(set) = self.by_user.get_mut(&conn.user_id) {
            set.remove(&connection_id);
            set.is_empty()
        } else {
            true
        };

        // A user with no live connections keeps no subscriptions.
        if user_gone {
            self.by_user.remove(&conn.user_id);
            if let Some(games) = self.user_subscriptions.remove(&conn.user_id) {
                for game_id in games {
                    if let Some(users) = self.game_subscribers.get_mut(&game_id) {
                        users.remove(&conn.user_id);
                        if users.is_empty() {
                            self.game_subscribers.remove(&game_id);
                        }
                    }
                }
            }
        }
    }

    /// Send `text` to every live connection of `user_id`, collecting the
    /// connection ids whose sink is gone.
    fn send_to_user_connections(&self, user_id: &str, text: &str, dead: &mut Vec<Uuid>) {
        let Some(conn_ids) = self.by_user.get(user_id) else {
            return;
        };
        for conn_id in conn_ids {
            if let Some(conn) = self.connections.get(conn_id) {
                if conn.sender.send(Message::Text(text.into())).is_err() {
                    dead.push(*conn_id);
                }
            }
        }
    }
}

/// Tracks push-channel subscriptions and fans game events out to them.
///
/// Delivery is best-effort: closed sinks are skipped and reaped, and no send
/// failure ever propagates to the caller.
#[derive(Default)]
pub struct SubscriberHub {
    inner: Mutex<HubInner>,
}

impl SubscriberHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_connection(
        &self,
        user_id: &str,
        connection_id: Uuid,
        sender: EventSender,
    ) {
        let mut inner = self.inner.lock().await;
        inner.connections.insert(
            connection_id,
            Connection {
                user_id: user_id.to_string(),
                sender,
            },
        );
        inner
            .by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(connection_id);
        tracing::debug!("Registered connection {} for user {}", connection_id, user_id);
    }

    /// Drop a connection and, when it was the user's last one, every
    /// subscription that user held.
    pub async fn unregister_connection(&self, connection_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner.remove_connection(connection_id);
        tracing::debug!("Unregistered connection {}", connection_id);
    }

    /// Idempotent: subscribing twice is a no-op.
    pub async fn subscribe(&self, user_id: &str, game_id: Uuid) {
        let mut inner = self.inner.lock().await;
        inner
            .game_subscribers
            .entry(game_id)
            .or_default()
            .insert(user_id.to_string());
        inner
            .user_subscriptions
            .entry(user_id.to_string())
            .or_default()
            .insert(game_id);
    }

    pub async fn unsubscribe(&self, user_id: &str, game_id: Uuid) {
        let mut inner = self.inner.lock().await;
        if let Some(users) = inner.game_subscribers.get_mut(&game_id) {
            users.remove(user_id);
            if users.is_empty() {
                inner.game_subscribers.remove(&game_id);
            }
        }
        if let Some(games) = inner.user_subscriptions.get_mut(user_id) {
            games.remove(&game_id);
            if games.is_empty() {
                inner.user_subscriptions.remove(user_id);
            }
        }
    }

    /// Deliver `event` to every live sink of every user subscribed to the
    /// game. Serializes once; failures are logged and the dead sinks reaped.
    pub async fn broadcast_to_game(&self, game_id: Uuid, event: &GameEvent) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize event for game {}: {}", game_id, e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        let Some(users) = inner.game_subscribers.get(&game_id) else {
            return;
        };

        let mut dead = Vec::new();
        for user_id in users.iter() {
            inner.send_to_user_connections(user_id, &text, &mut dead);
        }
        for conn_id in dead {
            tracing::warn!("Reaping dead connection {}", conn_id);
            inner.remove_connection(conn_id);
        }
    }

    pub async fn send_to_user(&self, user_id: &str, event: &GameEvent) {
        let text = match serde_json::to_string(event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to serialize event for user {}: {}", user_id, e);
                return;
            }
        };

        let mut inner = self.inner.lock().await;
        let mut dead = Vec::new();
        inner.send_to_user_connections(user_id, &text, &mut dead);
        for conn_id in dead {
            tracing::warn!("Reaping dead connection {}", conn_id);
            inner.remove_connection(conn_id);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.lock().await.connections.len()
    }

    pub async fn subscriber_count(&self, game_id: Uuid) -> usize {
        self.inner
            .lock()
            .await
            .game_subscribers
            .get(&game_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}
