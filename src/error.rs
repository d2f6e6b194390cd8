use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("RPC transport error: {0}")]
    Rpc(#[from] alloy::transports::TransportError),

    #[error("Contract call error: {0}")]
    Contract(#[from] alloy::contract::Error),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("All data sources failed: {0}")]
    Exhausted(String),

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// Stable machine tag carried in consumer-facing error states.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Http(_) => "HTTP",
            AppError::Json(_) => "DECODE",
            AppError::Database(_) | AppError::Migration(_) => "DB",
            AppError::Rpc(_) => "RPC",
            AppError::Contract(_) => "CONTRACT",
            AppError::ChannelSend(_) => "CHANNEL",
            AppError::Config(_) => "CONFIG",
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Exhausted(_) => "EXHAUSTED",
            AppError::Cancelled => "CANCELLED",
            AppError::Io(_) => "IO",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Exhausted(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
