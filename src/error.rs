use axum::response::IntoResponse;
use axum::Json;
use hyper::StatusCode;
use serde_json::json;
use tracing::error;

use crate::models::session::SessionId;
use crate::store::StoreError;

/// Application errors that can be automatically turned into an appropriate
/// HTTP response. `FlushIOError` and `BootstrapFailure` are deliberately
/// absent here — both are handled at their call sites (logged-and-continue,
/// and process-exit, respectively) rather than surfacing as a client
/// response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("malformed request body: {0}")]
    BadShape(String),

    #[error("expected {expected}-paired reads but found pair with {found} reads")]
    PairCountMismatch { expected: usize, found: usize },

    #[error("no context with id {0} found")]
    NoSuchContext(SessionId),

    #[error("chunk exceeds the configured buffer size")]
    ChunkTooLarge {
        processed_reads: i64,
        retry_after: f64,
    },

    #[error("budget exceeded, retry later")]
    BudgetExceeded {
        pending_bytes: i64,
        processed_reads: i64,
        retry_after: f64,
    },

    #[error("context still has pending reads")]
    StillPending {
        pending_bytes: i64,
        processed_reads: i64,
        retry_after: f64,
    },

    #[error("state store unavailable")]
    StoreUnavailable(#[from] StoreError),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadShape(_) => StatusCode::BAD_REQUEST,
            AppError::PairCountMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::NoSuchContext(_) => StatusCode::NOT_FOUND,
            AppError::ChunkTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::BudgetExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StillPending { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = ?status, message = %self, "request failed");
        }

        // Flat bodies (e.g. `{"processedReads":7,"retryAfter":...}`) rather
        // than a generic envelope, so clients can read these fields directly.
        let mut body = json!({ "message": self.to_string() });
        let obj = body.as_object_mut().expect("body is always an object");
        match &self {
            AppError::ChunkTooLarge {
                processed_reads,
                retry_after,
            } => {
                obj.insert("processedReads".into(), json!(processed_reads));
                obj.insert("retryAfter".into(), json!(retry_after));
            }
            AppError::BudgetExceeded {
                pending_bytes,
                processed_reads,
                retry_after,
            } => {
                obj.insert("pendingBytes".into(), json!(pending_bytes));
                obj.insert("processedReads".into(), json!(processed_reads));
                obj.insert("retryAfter".into(), json!(retry_after));
            }
            AppError::StillPending {
                pending_bytes,
                processed_reads,
                retry_after,
            } => {
                obj.insert("pendingBytes".into(), json!(pending_bytes));
                obj.insert("processedReads".into(), json!(processed_reads));
                obj.insert("retryAfter".into(), json!(retry_after));
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
