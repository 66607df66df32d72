//! API error type and its JSON rendering
//!
//! Every failure leaves the server as
//! `{"success": false, "error": "<message>", "code": "<MACHINE_CODE>"}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::economy::UnknownItem;
use crate::leaderboard::UnknownCategory;
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: i64, need: i64 },
    #[error("already claimed, next claim at {next_claim_at}")]
    Cooldown { next_claim_at: i64 },
    #[error("{0}")]
    Forbidden(String),
    #[error("storage error: {0}")]
    Storage(StorageError),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    /// Only present for cooldown errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_claim_at: Option<i64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Cooldown { .. } => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            ApiError::Cooldown { .. } => "COOLDOWN",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Storage(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Storage(e) => {
                error!("Request failed: {}", e);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let next_claim_at = match &self {
            ApiError::Cooldown { next_claim_at } => Some(*next_claim_at),
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code(),
            next_claim_at,
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StorageError::InsufficientFunds { have, need } => {
                ApiError::InsufficientBalance { have, need }
            }
            StorageError::Cooldown { next_claim_at } => ApiError::Cooldown { next_claim_at },
            StorageError::Invalid(msg) => ApiError::BadRequest(msg),
            other => ApiError::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<UnknownCategory> for ApiError {
    fn from(e: UnknownCategory) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<UnknownItem> for ApiError {
    fn from(e: UnknownItem) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InsufficientBalance { have: 1, need: 2 }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Cooldown { next_claim_at: 0 }.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_storage_errors_map_to_client_errors() {
        let e: ApiError = StorageError::InsufficientFunds { have: 10, need: 50 }.into();
        assert_eq!(e.code(), "INSUFFICIENT_BALANCE");

        let e: ApiError = StorageError::NotFound("player 'x'".into()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);

        let e: ApiError = StorageError::Migration("boom".into()).into();
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.code(), "INTERNAL");
    }
}
