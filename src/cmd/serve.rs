use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args as ClapArgs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{self, Settings};
use crate::context::AppContext;
use crate::controllers::ws::rooms::Rooms;
use crate::services::{keys, AdmissionController, QueuePublisher, SessionRegistry};
use crate::startup;
use crate::store::{RedisStore, StateStore};

#[derive(Debug, ClapArgs)]
pub struct ServeArgs {
    /// Directory holding `base.yaml` and the per-environment overlay.
    #[arg(long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// An optional additional config file layered on top of the rest.
    #[arg(long, env = "CONFIG_FILE")]
    config_file: Option<PathBuf>,
}

pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    let settings = config::load_settings(args.config_dir, args.config_file)?;

    let _log_guard = init_tracing(settings.logging.log_file.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(settings))
}

async fn serve(settings: &'static Settings) -> anyhow::Result<()> {
    let store: Arc<dyn StateStore> = Arc::new(
        RedisStore::connect(&settings.redis.server)
            .map_err(|e| anyhow::anyhow!("failed to construct redis client: {e}"))?,
    );

    // Process exits with a non-zero code if the store is unreachable at
    // startup.
    if let Err(err) = store.ping().await {
        error!(error = %err, "state store unreachable at startup");
        std::process::exit(1);
    }

    publish_config(&store, settings).await?;

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

    let ctx = AppContext::new(store, registry, admission, queue, rooms, settings);

    let addr: SocketAddr = settings.application.address().parse()?;
    startup::run_server(ctx, addr).await
}

/// Publishes the config values filter workers observe: `CONTEXT_TIMEOUT`,
/// `MAXIMUM_PENDING_BYTES`, and `REQUEST_SIZE_FACTOR`, plus `REQUEST_SIZE`
/// so the message transport's initial fan-out doesn't need the process's
/// own settings once it has a store handle.
async fn publish_config(
    store: &Arc<dyn StateStore>,
    settings: &Settings,
) -> anyhow::Result<()> {
    store
        .set(
            keys::CONFIG_CONTEXT_TIMEOUT,
            settings.ingest.context_timeout_secs.to_string().into_bytes(),
        )
        .await?;
    store
        .set(
            keys::CONFIG_MAXIMUM_PENDING_BYTES,
            settings.ingest.maximum_pending_bytes.to_string().into_bytes(),
        )
        .await?;
    store
        .set(
            keys::CONFIG_REQUEST_SIZE_FACTOR,
            settings.ingest.request_size_factor.to_string().into_bytes(),
        )
        .await?;
    store
        .set(
            keys::CONFIG_REQUEST_SIZE,
            settings.ingest.request_size.to_string().into_bytes(),
        )
        .await?;

    info!("published config snapshot to the state store");
    Ok(())
}

/// Initializes `tracing_subscriber`, matching the format selection
/// `flow_cli_common`'s logging helper uses: pretty/color on an interactive
/// terminal, structured JSON otherwise or when logging to a file.
fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .json()
            .init();
        Ok(Some(guard))
    } else if atty::is(atty::Stream::Stdout) {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        Ok(None)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
        Ok(None)
    }
}
