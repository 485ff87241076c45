use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::models::Lifecycle;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unknown game type: {0}")]
    UnknownGameType(String),

    #[error("Game not found: {0}")]
    GameNotFound(Uuid),

    #[error("Game is full")]
    GameFull,

    #[error("Operation not allowed while game is {0}")]
    InvalidLifecycle(Lifecycle),

    #[error("Player already in game: {0}")]
    PlayerAlreadyPresent(String),

    #[error("Unauthorized move: {0}")]
    UnauthorizedMove(String),

    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Stale state: expected version {expected}, stored version is {stored}")]
    StaleState { expected: i64, stored: i64 },

    #[error("No legal move available")]
    NoLegalMove,

    #[error("Game type already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Env error: {0}")]
    EnvError(String),

    #[error("Internal server error")]
    InternalError,
}

impl AppError {
    pub fn to_response(&self) -> (StatusCode, String) {
        match self {
            AppError::UnknownGameType(tag) => (
                StatusCode::BAD_REQUEST,
                format!("Unknown game type: {tag}"),
            ),
            AppError::GameNotFound(_) => (StatusCode::NOT_FOUND, "Game not found".into()),
            AppError::GameFull => (StatusCode::CONFLICT, "Game is full".into()),
            AppError::InvalidLifecycle(lifecycle) => (
                StatusCode::CONFLICT,
                format!("Operation not allowed while game is {lifecycle}"),
            ),
            AppError::PlayerAlreadyPresent(id) => (
                StatusCode::CONFLICT,
                format!("Player already in game: {id}"),
            ),
            AppError::UnauthorizedMove(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::InvalidMove(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::StaleState { .. } => (StatusCode::CONFLICT, self.to_string()),
            // NoLegalMove stays internal; it only ever ends an AI chain
            AppError::NoLegalMove => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".into(),
            ),
            AppError::AlreadyRegistered(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::AlreadyExists(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Serialization(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::EnvError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected server error".into(),
            ),
        }
    }
}
