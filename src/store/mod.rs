//! A typed façade over the external key-value service. Every multi-key
//! mutation elsewhere in the crate goes
//! through [`Pipeline`] and [`StateStore::commit`]; no other component talks
//! to a backend directly.

use std::time::Duration;

use async_trait::async_trait;

pub mod memory;
pub mod redis;

pub use self::redis::RedisStore;
pub use memory::InMemoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection to the backend was lost or never established. No retry
    /// policy lives here — callers decide whether to surface this as a 503
    /// or treat it as fatal at bootstrap.
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    #[error("state store protocol error: {0}")]
    Protocol(String),
}

/// A single operation queued onto a [`Pipeline`]. Mirrors the handful of
/// write operations the rest of the crate actually needs to batch; reads are
/// always issued individually since nothing in this system reads inside a
/// pipeline.
#[derive(Debug, Clone)]
pub enum StoreOp {
    SetWithTtl {
        key: String,
        value: Vec<u8>,
        ttl: Duration,
    },
    Delete {
        key: String,
    },
    ListPushRight {
        key: String,
        value: Vec<u8>,
    },
}

/// A builder for a set of writes committed as a single atomic transaction —
/// e.g. a job payload must be visible before its `work:queue` pointer,
/// enforced by placing both in one transaction.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub(crate) ops: Vec<StoreOp>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_with_ttl(
        mut self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        ttl: Duration,
    ) -> Self {
        self.ops.push(StoreOp::SetWithTtl {
            key: key.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.ops.push(StoreOp::Delete { key: key.into() });
        self
    }

    pub fn list_push_right(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.ops.push(StoreOp::ListPushRight {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Typed façade over the external key-value service.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Sets a key with no expiry — used only for the handful of
    /// process-lifetime `config:*` values published at bootstrap, which are
    /// not part of any session's TTL-refreshed state.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn set_with_ttl(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), StoreError>;
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, StoreError>;
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn set_add(&self, key: &str, member: Vec<u8>) -> Result<(), StoreError>;
    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError>;
    async fn set_cardinality(&self, key: &str) -> Result<u64, StoreError>;

    async fn list_push_right(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn list_range(&self, key: &str, start: isize, stop: isize)
        -> Result<Vec<Vec<u8>>, StoreError>;

    /// Commits every queued operation in `pipeline` as a single atomic
    /// transaction.
    async fn commit(&self, pipeline: Pipeline) -> Result<(), StoreError>;
}
