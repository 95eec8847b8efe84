use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::Deserialize;

pub mod app_env;

pub use app_env::app_env;

/// The complete, process-wide configuration snapshot.
///
/// Loaded once at startup from a layered stack of config files plus
/// environment variables, and immutable thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub ingest: IngestSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// `REDIS_SERVER` — host[:port] of the state store.
    pub server: String,
}

/// Settings published into `config:*` keys so that filter workers can
/// observe them, plus the settings that govern the admission controller
/// and close's flush step.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    /// `MAXIMUM_PENDING_BYTES` — per-session upload budget.
    pub maximum_pending_bytes: i64,
    /// `CONTEXT_TIMEOUT` — key TTL in seconds.
    pub context_timeout_secs: u64,
    /// `HANDS_OFF` — if true, close deletes state but writes no files.
    #[serde(default)]
    pub hands_off: bool,
    /// `UPLOAD_DIRECTORY` — root under which flushed files are written.
    pub upload_directory: PathBuf,
    /// `REQUEST_SIZE_FACTOR` — initial data-request fan-out count.
    pub request_size_factor: u32,
    /// `REQUEST_SIZE` — bytes requested per `dataRequest` message.
    pub request_size: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// `LOG_FILE` — optional path to also log to, in addition to stderr.
    pub log_file: Option<PathBuf>,
}

pub fn settings() -> &'static Settings {
    SETTINGS
        .get()
        .expect("settings() called before load_settings()")
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

/// Loads settings from `<config_dir>/base.{yaml,json,...}`, overlaid by
/// `<config_dir>/<app_env>.*`, an optional extra `CONFIG_FILE` to overlay on
/// top of those, and finally `INGEST_*` environment variables. Must be
/// called exactly once; subsequent calls to [`settings`] read the cached
/// result.
pub fn load_settings(
    config_dir: PathBuf,
    extra_config_file: Option<PathBuf>,
) -> Result<&'static Settings, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base")).required(true))
        .add_source(config::File::from(config_dir.join(app_env().as_str())).required(false));

    if let Some(path) = extra_config_file {
        if path.exists() {
            tracing::info!(path = %path.display(), "found additional config file, overwriting defaults");
            builder = builder.add_source(config::File::from(path).required(true));
        }
    }

    let settings: Settings = builder
        .add_source(config::Environment::with_prefix("INGEST").separator("__"))
        .build()?
        .try_deserialize()?;

    Ok(SETTINGS.get_or_init(|| settings))
}
