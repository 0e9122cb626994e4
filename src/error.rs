// Error taxonomy for the Mintbook API
//
// Domain failures carry a kind the gateway can map to a status code plus a
// human-readable detail. Store-level failures are surfaced as a generic
// internal error and are safe to retry from scratch.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketError>;

#[derive(Debug, Error)]
pub enum MarketError {
    /// Unknown market or user id
    #[error("{0}")]
    NotFound(String),

    /// Malformed outcome, non-positive or over-ceiling amount, bad field
    #[error("{0}")]
    InvalidArgument(String),

    /// Resolved market, closed market, double resolution, insufficient balance
    #[error("{0}")]
    InvalidState(String),

    /// Missing or unknown API key
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is not allowed to perform the operation
    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),

    #[error("encoding failure: {0}")]
    Codec(#[from] bincode::Error),
}

impl MarketError {
    pub fn kind(&self) -> &'static str {
        match self {
            MarketError::NotFound(_) => "not_found",
            MarketError::InvalidArgument(_) => "invalid_argument",
            MarketError::InvalidState(_) => "invalid_state",
            MarketError::Unauthorized(_) => "unauthorized",
            MarketError::Forbidden(_) => "forbidden",
            MarketError::Storage(_) | MarketError::Codec(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            MarketError::NotFound(_) => StatusCode::NOT_FOUND,
            MarketError::InvalidArgument(_) | MarketError::InvalidState(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            MarketError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketError::Storage(_) | MarketError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        // Internal details stay in the log, not the response body
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("{}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message, "kind": kind }))).into_response()
    }
}
