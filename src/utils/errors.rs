use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the dataset store, the chart aggregator and the sync protocol
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("No dataset with name {0} exists")]
    MissingDataset(String),
    #[error("A dataset with name {0} already exists")]
    DuplicateDataset(String),
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ChartError {
    /// HTTP-equivalent status used by both the REST routes and the RPC error payload
    pub fn status(&self) -> StatusCode {
        match self {
            ChartError::MissingDataset(_) => StatusCode::NOT_FOUND,
            ChartError::DuplicateDataset(_) | ChartError::InvalidDataset(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ChartError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChartError::Storage(_) | ChartError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to a client
    pub fn client_message(&self) -> String {
        match self {
            ChartError::Storage(e) => extract_clean_error(&e.to_string()),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ChartError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }
        (status, Json(json!({ "detail": self.client_message() }))).into_response()
    }
}

/// Extract clean error message from database error strings
///
/// Removes driver prefixes like:
/// "error returned from database: (code: 1) no such table: ds_637075"
///
/// Returns only the meaningful error message:
/// "no such table: ds_637075"
pub fn extract_clean_error(error_msg: &str) -> String {
    if error_msg.contains("error returned from database:") {
        // SQLite messages come as "(code: N) message"
        if let Some(last_colon) = error_msg.rfind(") ") {
            error_msg[last_colon + 2..].trim().to_string()
        } else if let Some(last_colon) = error_msg.rfind(": ") {
            error_msg[last_colon + 2..].trim().to_string()
        } else {
            error_msg.to_string()
        }
    } else {
        error_msg.to_string()
    }
}
