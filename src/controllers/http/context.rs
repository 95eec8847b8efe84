use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;

use crate::context::AppContext;
use crate::controllers::ws::messages::ServerEvent;
use crate::error::AppError;
use crate::models::batch::{
    Batch, CloseResponse, CreateContextRequest, CreateContextResponse, RequestDataRequest,
    UploadAccepted,
};
use crate::models::SessionId;

/// `POST /context/create`.
pub async fn create_context(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<CreateContextResponse>, AppError> {
    let request: CreateContextRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BadShape(e.to_string()))?;

    let session_id = ctx.registry.create(&request.filenames).await?;

    Ok(Json(CreateContextResponse {
        context: session_id.to_string(),
    }))
}

/// `POST /context/<sessionId>/reads`.
///
/// The session existence check happens before the body is even parsed,
/// matching the source's ordering: a malformed body against an unknown
/// session still yields `404`, not `400`.
pub async fn upload_reads(
    State(ctx): State<AppContext>,
    Path(session_id): Path<SessionId>,
    body: Bytes,
) -> Result<Json<UploadAccepted>, AppError> {
    if !ctx.registry.exists(session_id).await? {
        return Err(AppError::NoSuchContext(session_id));
    }

    let batch: Batch = serde_json::from_slice(&body).map_err(|e| AppError::BadShape(e.to_string()))?;

    let outcome = ctx.admission.admit(session_id, batch).await?;

    Ok(Json(UploadAccepted {
        processed_reads: outcome.processed_reads,
        pending_bytes: outcome.pending_bytes,
    }))
}

/// `POST /context/<sessionId>/close`.
pub async fn close_context(
    State(ctx): State<AppContext>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<CloseResponse>, AppError> {
    if !ctx.registry.exists(session_id).await? {
        return Err(AppError::NoSuchContext(session_id));
    }

    let (processed_reads, saved_read_ids) = ctx
        .registry
        .close_if_drained(session_id, ctx.settings.ingest.hands_off)
        .await?;

    Ok(Json(CloseResponse {
        reads_saved: saved_read_ids,
        reads_processed: processed_reads,
    }))
}

/// `POST /context/<sessionId>/request-data` — tells the server to address
/// a `dataRequest` to the session's message-transport room; used by filter
/// workers after they've drained some bytes.
///
/// Existence is checked before the body is parsed, and parse failures map
/// to `BadShape`, matching `create_context`/`upload_reads` — a malformed
/// body against an unknown session still yields `404`, not `400`.
pub async fn request_data(
    State(ctx): State<AppContext>,
    Path(session_id): Path<SessionId>,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if !ctx.registry.exists(session_id).await? {
        return Err(AppError::NoSuchContext(session_id));
    }

    let request: RequestDataRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::BadShape(e.to_string()))?;

    let buffer_fill = ctx.registry.pending_bytes(session_id).await?;
    let processed_reads = ctx.registry.processed_reads(session_id).await?;

    ctx.rooms.broadcast(
        session_id,
        ServerEvent::DataRequest {
            bytes: request.bytes_to_request,
            context_id: session_id,
            buffer_fill,
            processed_reads,
        },
    );

    Ok(StatusCode::OK)
}
