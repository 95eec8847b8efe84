use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ingest_api::config::{ApplicationSettings, IngestSettings, LoggingSettings, RedisSettings, Settings};
use ingest_api::context::AppContext;
use ingest_api::controllers::ws::rooms::Rooms;
use ingest_api::services::{AdmissionController, QueuePublisher, SessionRegistry};
use ingest_api::startup::build_router;
use ingest_api::store::{InMemoryStore, StateStore};
use serde_json::Value;
use tower::ServiceExt;

/// Builds the router under test against an [`InMemoryStore`], the same
/// wiring `cmd::serve::run` does against a real Redis store, so the
/// scenarios in `http_sessions.rs` run without a live Redis instance.
pub struct TestContext {
    router: Router,
    pub settings: &'static Settings,
    pub store: Arc<dyn StateStore>,
    pub registry: Arc<SessionRegistry>,
    pub upload_directory: PathBuf,
}

impl TestContext {
    pub fn new(maximum_pending_bytes: i64) -> Self {
        let settings = leak_test_settings(maximum_pending_bytes, 2, 1000);
        let (ctx, registry, store) = build_context(settings);

        Self {
            router: build_router(ctx),
            settings,
            store,
            registry,
            upload_directory: settings.ingest.upload_directory.clone(),
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap();
        self.dispatch(request).await
    }

    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

/// A real, bound server for `ws_transport.rs`'s scenarios — the one
/// integration test that can't go through `tower::ServiceExt::oneshot`,
/// because a WebSocket upgrade needs a real TCP connection to drive the
/// handshake and subsequent frames (DESIGN.md's `tests/it/` ledger entry).
pub struct SpawnedApp {
    pub addr: SocketAddr,
    pub store: Arc<dyn StateStore>,
    pub registry: Arc<SessionRegistry>,
}

impl SpawnedApp {
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub async fn spawn(maximum_pending_bytes: i64, request_size_factor: u32, request_size: i64) -> Self {
        let settings = leak_test_settings(maximum_pending_bytes, request_size_factor, request_size);
        let (ctx, registry, store) = build_context(settings);
        let router = build_router(ctx);

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        Self {
            addr,
            store,
            registry,
        }
    }
}

fn build_context(
    settings: &'static Settings,
) -> (AppContext, Arc<SessionRegistry>, Arc<dyn StateStore>) {
    let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
    let ttl = Duration::from_secs(settings.ingest.context_timeout_secs);

    let registry = Arc::new(SessionRegistry::new(
        store.clone(),
        ttl,
        settings.ingest.upload_directory.clone(),
    ));
    let queue = Arc::new(QueuePublisher::new(store.clone()));
    let admission = Arc::new(AdmissionController::new(
        store.clone(),
        registry.clone(),
        queue.clone(),
        settings.ingest.maximum_pending_bytes,
    ));
    let rooms = Arc::new(Rooms::new());

    let ctx = AppContext::new(
        store.clone(),
        registry.clone(),
        admission,
        queue,
        rooms,
        settings,
    );

    (ctx, registry, store)
}

fn leak_test_settings(
    maximum_pending_bytes: i64,
    request_size_factor: u32,
    request_size: i64,
) -> &'static Settings {
    let settings = Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".into(),
            port: 0,
            cors_allowed_origins: vec!["*".into()],
        },
        redis: RedisSettings {
            server: "unused".into(),
        },
        ingest: IngestSettings {
            maximum_pending_bytes,
            context_timeout_secs: 60,
            hands_off: false,
            upload_directory: std::env::temp_dir().join(format!("ingest-it-{}", uuid::Uuid::new_v4())),
            request_size_factor,
            request_size,
        },
        logging: LoggingSettings::default(),
    };
    Box::leak(Box::new(settings))
}
