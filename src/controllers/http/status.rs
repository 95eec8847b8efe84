use axum::extract::State;
use axum::Json;

use crate::context::AppContext;
use crate::models::batch::ServerStatus;

/// `GET /server-status`.
pub async fn server_status(State(ctx): State<AppContext>) -> Json<ServerStatus> {
    Json(ServerStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: ctx.uptime_seconds(),
        buffer_size: ctx.settings.ingest.maximum_pending_bytes,
    })
}
