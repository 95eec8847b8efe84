use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::context::AppContext;
use crate::controllers::{http, ws};
use crate::cors;

/// A generous ceiling on simultaneously in-flight requests, independent of
/// the state store's own connection pool size — protects the process from
/// unbounded task growth under a thundering-herd of uploads.
const MAX_CONCURRENT_REQUESTS: usize = 1024;

pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/server-status", get(http::status::server_status))
        .route("/context/create", post(http::context::create_context))
        .route("/context/:session_id/reads", post(http::context::upload_reads))
        .route("/context/:session_id/close", post(http::context::close_context))
        .route(
            "/context/:session_id/request-data",
            post(http::context::request_data),
        )
        .route("/ws", get(ws::ws_handler))
        .layer(cors::layer(&ctx.settings.application))
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
        .with_state(ctx)
}

pub async fn run_server(ctx: AppContext, addr: SocketAddr) -> anyhow::Result<()> {
    let router = build_router(ctx);

    info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
