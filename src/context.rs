use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::controllers::ws::rooms::Rooms;
use crate::services::{AdmissionController, QueuePublisher, SessionRegistry};
use crate::store::StateStore;

/// The shared handle threaded through every HTTP and message-transport
/// handler. Replaces the process-global store client the source used with
/// an explicit, constructed-at-startup value that is threaded through
/// every handler instead of reached for as a global.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn StateStore>,
    pub registry: Arc<SessionRegistry>,
    pub admission: Arc<AdmissionController>,
    pub queue: Arc<QueuePublisher>,
    pub rooms: Arc<Rooms>,
    pub settings: &'static Settings,
    launched_at: Instant,
}

impl AppContext {
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<SessionRegistry>,
        admission: Arc<AdmissionController>,
        queue: Arc<QueuePublisher>,
        rooms: Arc<Rooms>,
        settings: &'static Settings,
    ) -> Self {
        Self {
            store,
            registry,
            admission,
            queue,
            rooms,
            settings,
            launched_at: Instant::now(),
        }
    }

    /// Seconds since process start, used by `GET /server-status`.
    pub fn uptime_seconds(&self) -> f64 {
        self.launched_at.elapsed().as_secs_f64()
    }
}
