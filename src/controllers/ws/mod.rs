//! Message Transport — a single long-lived WebSocket connection per client,
//! multiplexed to logical sessions via [`rooms::Rooms`].

pub mod messages;
pub mod rooms;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::context::AppContext;
use crate::models::SessionId;
use crate::services::keys;

use messages::{ClientEvent, ServerEvent};

pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(socket: WebSocket, ctx: AppContext) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let forward = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut joined_rooms: Vec<SessionId> = Vec::new();

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        let event: ClientEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                debug!(error = %err, "malformed message transport event");
                continue;
            }
        };

        match event {
            ClientEvent::CreateContext { filenames } => {
                handle_create_context(&ctx, &tx, &mut joined_rooms, filenames).await;
            }
            ClientEvent::DataUpload {
                data, context_id, ..
            } => {
                handle_data_upload(&ctx, context_id, data).await;
            }
            ClientEvent::CloseContext { context_id } => {
                handle_close_context(&ctx, context_id).await;
            }
        }
    }

    for session_id in joined_rooms {
        ctx.rooms.leave(session_id, &tx);
    }
    forward.abort();
}

async fn handle_create_context(
    ctx: &AppContext,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    joined_rooms: &mut Vec<SessionId>,
    filenames: Vec<String>,
) {
    let session_id = match ctx.registry.create(&filenames).await {
        Ok(id) => id,
        Err(err) => {
            let _ = tx.send(ServerEvent::ContextCreationError {
                message: err.to_string(),
            });
            return;
        }
    };

    ctx.rooms.join(session_id, tx.clone());
    joined_rooms.push(session_id);

    // Fan out R independent dataRequest messages from the first moment, so
    // filter worker capacity is solicited before any client data arrives.
    let (factor, size) = initial_request_fanout(ctx).await;
    for _ in 0..factor {
        ctx.rooms.broadcast(
            session_id,
            ServerEvent::DataRequest {
                bytes: size,
                context_id: session_id,
                buffer_fill: 0,
                processed_reads: 0,
            },
        );
    }
}

/// Reads `(request_size_factor, request_size)` from the store — published
/// at bootstrap into `config:*` keys — falling back to the process's own
/// settings if they were never published there.
async fn initial_request_fanout(ctx: &AppContext) -> (u32, i64) {
    let factor = ctx
        .store
        .get(keys::CONFIG_REQUEST_SIZE_FACTOR)
        .await
        .ok()
        .flatten()
        .and_then(|v| std::str::from_utf8(&v).ok().and_then(|s| s.parse().ok()))
        .unwrap_or(ctx.settings.ingest.request_size_factor);

    let size = ctx
        .store
        .get(keys::CONFIG_REQUEST_SIZE)
        .await
        .ok()
        .flatten()
        .and_then(|v| std::str::from_utf8(&v).ok().and_then(|s| s.parse().ok()))
        .unwrap_or(ctx.settings.ingest.request_size);

    (factor, size)
}

async fn handle_data_upload(ctx: &AppContext, context_id: SessionId, data: crate::models::Batch) {
    // Validation, pricing, budget, and enqueue semantics are identical to
    // the HTTP frontend; only the error surface differs.
    if let Err(err) = ctx.admission.admit(context_id, data).await {
        ctx.rooms.broadcast(
            context_id,
            ServerEvent::DataUploadError {
                message: err.to_string(),
            },
        );
    }
}

async fn handle_close_context(ctx: &AppContext, context_id: SessionId) {
    match ctx
        .registry
        .close_if_drained(context_id, ctx.settings.ingest.hands_off)
        .await
    {
        Ok((processed_reads, saved_reads)) => {
            ctx.rooms.broadcast(
                context_id,
                ServerEvent::ContextClosed {
                    context_id,
                    saved_reads,
                    processed_reads,
                },
            );
        }
        Err(err) => {
            ctx.rooms.broadcast(
                context_id,
                ServerEvent::ContextCloseError {
                    message: err.to_string(),
                },
            );
        }
    }
}
