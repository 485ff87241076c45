// Shared test harness: spawn the app on an ephemeral port with the
// in-memory store and drive it over real HTTP and WebSocket connections.
#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use turn_arena_be::build_router;
use turn_arena_be::state::AppState;

pub struct TestApp {
    pub base_url: String,
    pub ws_url: String,
    pub state: AppState,
    client: reqwest::Client,
}

/// Bind the full router to an ephemeral port and serve it in the background.
pub async fn spawn_app() -> TestApp {
    let state = AppState::for_tests();
    let app = build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind ephemeral port");
    let addr = listener.local_addr().expect("Failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });

    TestApp {
        base_url: format!("http://{addr}"),
        ws_url: format!("ws://{addr}"),
        state,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub async fn post(&self, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get_text(&self, path: &str) -> (u16, String) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("Request failed");
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        (status, body)
    }

    /// Create a tic-tac-toe game with the given seats and return its state.
    pub async fn create_tic_tac_toe(&self, players: Value) -> Value {
        let (status, body) = self
            .post(
                "/api/games",
                &json!({
                    "gameType": "tic-tac-toe",
                    "name": "test game",
                    "players": players,
                }),
            )
            .await;
        assert_eq!(status, 200, "create failed: {body}");
        body
    }

    /// Submit a move and return `(status, body)`.
    pub async fn send_move(
        &self,
        game_id: &str,
        player_id: &str,
        row: usize,
        col: usize,
        expected_version: i64,
    ) -> (u16, Value) {
        self.post(
            &format!("/api/games/{game_id}/moves"),
            &json!({
                "playerId": player_id,
                "action": "place",
                "parameters": {"row": row, "col": col},
                "expectedVersion": expected_version,
            }),
        )
        .await
    }
}

/// WebSocket connection wrapper for testing
pub struct WsConnection {
    sender: futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        Message,
    >,
    receiver: futures_util::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    >,
}

impl WsConnection {
    /// Connect to the push-event socket as `user_id`.
    pub async fn connect(
        ws_url: &str,
        user_id: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let url = format!("{ws_url}/ws?userId={user_id}");
        let (ws_stream, _) = connect_async(&url).await?;
        let (sender, receiver) = ws_stream.split();
        Ok(Self { sender, receiver })
    }

    /// Send a JSON message
    pub async fn send_json(&mut self, msg: &Value) -> Result<(), Box<dyn std::error::Error>> {
        self.sender
            .send(Message::Text(msg.to_string().into()))
            .await?;
        Ok(())
    }

    /// Receive the next JSON message
    pub async fn recv_json(&mut self) -> Result<Value, Box<dyn std::error::Error>> {
        while let Some(msg) = self.receiver.next().await {
            if let Message::Text(text) = msg? {
                let value: Value = serde_json::from_str(&text)?;
                return Ok(value);
            }
        }
        Err("No message received".into())
    }

    /// Receive the next message with a timeout
    pub async fn recv_json_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Value, Box<dyn std::error::Error>> {
        tokio::time::timeout(timeout, self.recv_json())
            .await
            .map_err(|_| Box::<dyn std::error::Error>::from("Timeout waiting for message"))?
    }

    /// Subscribe to a game and wait for the ack.
    pub async fn subscribe(&mut self, game_id: &str) -> Result<(), Box<dyn std::error::Error>> {
        self.send_json(&json!({"type": "subscribe", "gameId": game_id}))
            .await?;
        let ack = self.recv_json_timeout(Duration::from_secs(2)).await?;
        if ack.get("type").and_then(Value::as_str) != Some("SUBSCRIBED") {
            return Err(format!("Expected SUBSCRIBED ack, got {ack}").into());
        }
        Ok(())
    }

    /// Skip frames until one with the given `type` arrives.
    pub async fn wait_for_type(
        &mut self,
        expected_type: &str,
        timeout_attempts: usize,
    ) -> Result<Value, String> {
        for _ in 0..timeout_attempts {
            if let Ok(msg) = self.recv_json_timeout(Duration::from_secs(1)).await {
                if msg.get("type").and_then(Value::as_str) == Some(expected_type) {
                    return Ok(msg);
                }
            }
        }
        Err(format!("Timed out waiting for {expected_type}"))
    }

    /// Drain whatever frames arrive within `window`.
    pub async fn drain_frames(&mut self, window: Duration) -> Vec<Value> {
        let mut frames = Vec::new();
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.recv_json_timeout(remaining).await {
                Ok(frame) => frames.push(frame),
                Err(_) => break,
            }
        }
        frames
    }
}
