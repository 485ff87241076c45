// WebSocket integration tests: subscriptions and push-event fan-out.

#[path = "common/mod.rs"]
mod common;

use serde_json::{Value, json};
use std::time::Duration;

fn two_humans() -> Value {
    json!([
        {"id": "A", "name": "Alice"},
        {"id": "B", "name": "Bob"},
    ])
}

#[tokio::test]
async fn subscribers_receive_game_updates() {
    let app = common::spawn_app().await;
    let game = app.create_tic_tac_toe(two_humans()).await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut ws = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    ws.subscribe(game_id).await.expect("subscribe");

    let (status, _) = app.send_move(game_id, "A", 1, 1, 1).await;
    assert_eq!(status, 200);

    let update = ws.wait_for_type("GAME_UPDATE", 5).await.unwrap();
    assert_eq!(update["gameId"].as_str(), Some(game_id));
    assert_eq!(update["lastMoveByAI"], Value::Bool(false));
    assert_eq!(update["gameState"]["version"], 2);

    // while the game stays active, the current seat is announced
    let turn = ws.wait_for_type("TURN_NOTIFICATION", 5).await.unwrap();
    assert_eq!(turn["currentPlayer"], "B");
}

#[tokio::test]
async fn unsubscribed_connections_stay_silent() {
    let app = common::spawn_app().await;
    let game = app.create_tic_tac_toe(two_humans()).await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut ws = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    // connected but never subscribed

    app.send_move(game_id, "A", 1, 1, 1).await;

    let frames = ws.drain_frames(Duration::from_millis(300)).await;
    assert!(frames.is_empty(), "unexpected frames: {frames:?}");
}

#[tokio::test]
async fn unsubscribe_stops_the_stream() {
    let app = common::spawn_app().await;
    let game = app.create_tic_tac_toe(two_humans()).await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut ws = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    ws.subscribe(game_id).await.expect("subscribe");

    ws.send_json(&json!({"type": "unsubscribe", "gameId": game_id}))
        .await
        .unwrap();
    let ack = ws.recv_json_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(ack["type"], "UNSUBSCRIBED");

    app.send_move(game_id, "A", 1, 1, 1).await;
    let frames = ws.drain_frames(Duration::from_millis(300)).await;
    assert!(frames.is_empty(), "unexpected frames: {frames:?}");
}

#[tokio::test]
async fn winning_move_publishes_game_complete_exactly_once() {
    let app = common::spawn_app().await;
    let game = app.create_tic_tac_toe(two_humans()).await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut ws = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    ws.subscribe(game_id).await.expect("subscribe");

    let moves = [
        ("A", 0, 0),
        ("B", 1, 0),
        ("A", 0, 1),
        ("B", 1, 1),
        ("A", 0, 2),
    ];
    let mut version = 1;
    for (player, row, col) in moves {
        let (status, state) = app.send_move(game_id, player, row, col, version).await;
        assert_eq!(status, 200);
        version = state["version"].as_i64().unwrap();
    }

    let frames = ws.drain_frames(Duration::from_secs(1)).await;
    let completes: Vec<&Value> = frames
        .iter()
        .filter(|f| f["type"] == "GAME_COMPLETE")
        .collect();
    assert_eq!(completes.len(), 1, "frames: {frames:?}");
    assert_eq!(completes[0]["winner"], "A");
    assert_eq!(completes[0]["winnerIsAI"], Value::Bool(false));

    let updates = frames
        .iter()
        .filter(|f| f["type"] == "GAME_UPDATE")
        .count();
    assert_eq!(updates, 5);
}

#[tokio::test]
async fn ai_chain_publishes_a_second_update_marked_as_ai() {
    let app = common::spawn_app().await;
    let game = app
        .create_tic_tac_toe(json!([
            {"id": "human", "name": "Human"},
            {"name": "Bot", "isAI": true, "strategyId": "random"},
        ]))
        .await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut ws = common::WsConnection::connect(&app.ws_url, "human")
        .await
        .expect("connect");
    ws.subscribe(game_id).await.expect("subscribe");

    let (status, state) = app.send_move(game_id, "human", 1, 1, 1).await;
    assert_eq!(status, 200);
    assert!(state["version"].as_i64().unwrap() >= 3);

    let frames = ws.drain_frames(Duration::from_secs(1)).await;
    let updates: Vec<&Value> = frames
        .iter()
        .filter(|f| f["type"] == "GAME_UPDATE")
        .collect();
    assert_eq!(updates.len(), 2, "frames: {frames:?}");
    assert_eq!(updates[0]["lastMoveByAI"], Value::Bool(false));
    assert_eq!(updates[1]["lastMoveByAI"], Value::Bool(true));
    assert_eq!(updates[1]["gameState"]["version"], 3);
}

#[tokio::test]
async fn every_connection_of_a_subscribed_user_gets_the_event() {
    let app = common::spawn_app().await;
    let game = app.create_tic_tac_toe(two_humans()).await;
    let game_id = game["gameId"].as_str().unwrap();

    let mut first = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    let mut second = common::WsConnection::connect(&app.ws_url, "B")
        .await
        .expect("connect");
    first.subscribe(game_id).await.expect("subscribe");

    app.send_move(game_id, "A", 1, 1, 1).await;

    // the subscription belongs to the user, so both tabs hear it
    assert!(first.wait_for_type("GAME_UPDATE", 5).await.is_ok());
    assert!(second.wait_for_type("GAME_UPDATE", 5).await.is_ok());
}

#[tokio::test]
async fn ping_pong_keeps_the_socket_alive() {
    let app = common::spawn_app().await;
    let mut ws = common::WsConnection::connect(&app.ws_url, "A")
        .await
        .expect("connect");

    ws.send_json(&json!({"type": "ping"})).await.unwrap();
    let pong = ws.recv_json_timeout(Duration::from_secs(2)).await.unwrap();
    assert_eq!(pong["type"], "PONG");
}
