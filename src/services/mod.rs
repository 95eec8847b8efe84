//! The session, admission, and queue services that sit between the
//! transport layer (`controllers/`) and the [`crate::store`] façade.

pub mod admission;
pub mod queue;
pub mod session_registry;

pub use admission::{AdmissionController, AdmissionOutcome};
pub use queue::QueuePublisher;
pub use session_registry::SessionRegistry;

/// Builds the `context:<id>:*` key names used throughout the session and
/// admission services.
pub(crate) mod keys {
    use crate::models::SessionId;

    pub fn pair_count(id: SessionId) -> String {
        format!("context:{id}:pair_count")
    }

    pub fn filename(id: SessionId, i: usize) -> String {
        format!("context:{id}:pair:{i}:filename")
    }

    pub fn pair_reads(id: SessionId, i: usize) -> String {
        format!("context:{id}:pair:{i}:reads")
    }

    pub fn pending_bytes(id: SessionId) -> String {
        format!("context:{id}:pending_bytes")
    }

    pub fn processed_reads(id: SessionId) -> String {
        format!("context:{id}:processed_reads")
    }

    pub fn speed(id: SessionId) -> String {
        format!("context:{id}:speed")
    }

    pub const STATS_BASES: &str = "stats:bases";
    pub const WORK_QUEUE: &str = "work:queue";

    pub fn work_job(job_id: &str) -> String {
        format!("work:{job_id}")
    }

    /// Config values published at bootstrap so filter workers observe them.
    pub const CONFIG_REQUEST_SIZE_FACTOR: &str = "config:request_size_factor";
    pub const CONFIG_REQUEST_SIZE: &str = "config:request_size";
    pub const CONFIG_CONTEXT_TIMEOUT: &str = "config:context_timeout";
    pub const CONFIG_MAXIMUM_PENDING_BYTES: &str = "config:maximum_pending_bytes";
}
