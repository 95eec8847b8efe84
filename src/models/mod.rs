//! Wire and domain types for the ingest pipeline. A `Session` is
//! deliberately not materialized here as a struct — its fields live as
//! separate keys in the state store and are only ever read through
//! [`crate::services::session_registry::SessionRegistry`].

pub mod batch;
pub mod job;
pub mod session;

pub use batch::{Batch, Pair, Read};
pub use job::JobRecord;
pub use session::SessionId;
