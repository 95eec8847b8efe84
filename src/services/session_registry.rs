use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;
use crate::models::session::read_id_prefix;
use crate::models::SessionId;
use crate::store::{Pipeline, StateStore};

use super::keys;

/// Moving-average seed used by [`SessionRegistry::queue_speed`] before any
/// filter worker has reported a service-time sample.
pub const SEED_QUEUE_SPEED_SECS_PER_BYTE: f64 = 9e-6;

/// Owns the `context:<id>:*` key schema and refreshes TTLs on every write.
/// Holds no session state itself — the store is the single source of
/// truth.
pub struct SessionRegistry {
    store: Arc<dyn StateStore>,
    ttl: Duration,
    upload_directory: PathBuf,
}

fn parse_i64(bytes: &[u8]) -> Result<i64, AppError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| AppError::BadShape("non-numeric counter value in store".into()))
}

fn parse_f64(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok())
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn StateStore>, ttl: Duration, upload_directory: PathBuf) -> Self {
        Self {
            store,
            ttl,
            upload_directory,
        }
    }

    /// Creates a fresh session. Rejects an empty filename list and
    /// duplicate basenames — a tightening of the source's permissive
    /// behavior (see DESIGN.md), because two pairs flushing to the same
    /// file would silently clobber one another.
    pub async fn create(&self, filenames: &[String]) -> Result<SessionId, AppError> {
        if filenames.is_empty() {
            return Err(AppError::BadShape("filenames must not be empty".into()));
        }

        let basenames: Vec<String> = filenames
            .iter()
            .map(|f| {
                PathBuf::from(f)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect();

        if basenames.iter().any(|b| b.is_empty()) {
            return Err(AppError::BadShape("filenames must not be empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        if !basenames.iter().all(|b| seen.insert(b.clone())) {
            return Err(AppError::BadShape(
                "duplicate filenames are not allowed".into(),
            ));
        }

        let session_id = SessionId::new();

        let mut pipeline = Pipeline::new()
            .set_with_ttl(keys::pending_bytes(session_id), b"0".to_vec(), self.ttl)
            .set_with_ttl(keys::processed_reads(session_id), b"0".to_vec(), self.ttl);

        for (i, basename) in basenames.iter().enumerate() {
            pipeline = pipeline.set_with_ttl(
                keys::filename(session_id, i),
                basename.clone().into_bytes(),
                self.ttl,
            );
        }

        // pair_count is written last, matching the source's reliance on it
        // being the last key to materialize — though since our pipeline
        // commits as a single atomic transaction, every key becomes visible
        // at once regardless of push order; this ordering is kept for
        // fidelity with the source's documented contract.
        pipeline = pipeline.set_with_ttl(
            keys::pair_count(session_id),
            basenames.len().to_string().into_bytes(),
            self.ttl,
        );

        self.store.commit(pipeline).await?;

        Ok(session_id)
    }

    /// True iff `pair_count` exists — the session's single presence flag.
    pub async fn exists(&self, id: SessionId) -> Result<bool, AppError> {
        Ok(self.store.exists(&keys::pair_count(id)).await?)
    }

    async fn require_exists(&self, id: SessionId) -> Result<(), AppError> {
        if !self.exists(id).await? {
            return Err(AppError::NoSuchContext(id));
        }
        Ok(())
    }

    pub async fn pair_count(&self, id: SessionId) -> Result<i64, AppError> {
        self.require_exists(id).await?;
        match self.store.get(&keys::pair_count(id)).await? {
            Some(v) => parse_i64(&v),
            None => Err(AppError::NoSuchContext(id)),
        }
    }

    pub async fn pending_bytes(&self, id: SessionId) -> Result<i64, AppError> {
        self.require_exists(id).await?;
        match self.store.get(&keys::pending_bytes(id)).await? {
            Some(v) => parse_i64(&v),
            None => Ok(0),
        }
    }

    pub async fn processed_reads(&self, id: SessionId) -> Result<i64, AppError> {
        self.require_exists(id).await?;
        match self.store.get(&keys::processed_reads(id)).await? {
            Some(v) => parse_i64(&v),
            None => Ok(0),
        }
    }

    pub async fn saved_read_count(&self, id: SessionId) -> Result<u64, AppError> {
        Ok(self.store.set_cardinality(&keys::pair_reads(id, 0)).await?)
    }

    /// Atomically increments `pending_bytes` and refreshes its TTL.
    pub async fn change_pending_bytes(&self, id: SessionId, delta: i64) -> Result<i64, AppError> {
        let new_value = self.store.incr_by(&keys::pending_bytes(id), delta).await?;
        self.store.expire(&keys::pending_bytes(id), self.ttl).await?;
        Ok(new_value)
    }

    pub async fn increment_processed_reads(
        &self,
        id: SessionId,
        delta: i64,
    ) -> Result<i64, AppError> {
        let new_value = self
            .store
            .incr_by(&keys::processed_reads(id), delta)
            .await?;
        self.store
            .expire(&keys::processed_reads(id), self.ttl)
            .await?;
        Ok(new_value)
    }

    /// Arithmetic mean of recent service-time samples, or the seed constant
    /// if no worker has reported one yet.
    pub async fn queue_speed(&self, id: SessionId) -> Result<f64, AppError> {
        let samples = self.store.list_range(&keys::speed(id), 0, -1).await?;
        if samples.is_empty() {
            return Ok(SEED_QUEUE_SPEED_SECS_PER_BYTE);
        }

        let values: Vec<f64> = samples.iter().filter_map(|s| parse_f64(s)).collect();
        if values.is_empty() {
            return Ok(SEED_QUEUE_SPEED_SECS_PER_BYTE);
        }

        Ok(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Checks `pending_bytes == 0` and, if so, runs the flush algorithm;
    /// otherwise returns `StillPending` with a retry hint. Shared verbatim
    /// between the HTTP and message-transport frontends.
    pub async fn close_if_drained(
        &self,
        id: SessionId,
        hands_off: bool,
    ) -> Result<(i64, Vec<String>), AppError> {
        let pending_bytes = self.pending_bytes(id).await?;
        if pending_bytes > 0 {
            let queue_speed = self.queue_speed(id).await?;
            let processed_reads = self.processed_reads(id).await?;
            return Err(AppError::StillPending {
                pending_bytes,
                processed_reads,
                retry_after: pending_bytes as f64 * queue_speed,
            });
        }

        self.close(id, hands_off).await
    }

    /// Runs the five-step flush algorithm. Callers are responsible for
    /// having already checked `pending_bytes == 0` — this method does not
    /// re-check it.
    ///
    /// `pair_count`'s deletion in step 1 is the session's single
    /// synchronization point for the close race: once it's gone, `exists`
    /// is false and any upload racing this close observes `NoSuchContext`.
    pub async fn close(
        &self,
        id: SessionId,
        hands_off: bool,
    ) -> Result<(i64, Vec<String>), AppError> {
        let pair_count = match self.store.get(&keys::pair_count(id)).await? {
            Some(v) => parse_i64(&v)?,
            None => return Err(AppError::NoSuchContext(id)),
        };
        self.store.delete(&keys::pair_count(id)).await?;

        let pair0 = self.store.set_members(&keys::pair_reads(id, 0)).await?;
        let saved_read_ids: Vec<String> = pair0.iter().map(|m| read_id_prefix(m)).collect();

        for i in 0..pair_count {
            let i = i as usize;
            let filename = self
                .store
                .get(&keys::filename(id, i))
                .await?
                .map(|v| String::from_utf8_lossy(&v).into_owned())
                .unwrap_or_default();
            self.store.delete(&keys::filename(id, i)).await?;

            let members = self.store.set_members(&keys::pair_reads(id, i)).await?;

            if !hands_off {
                if let Err(err) = self.flush_pair_to_disk(id, &filename, &members).await {
                    // Failures here are logged but never abort the flush:
                    // remaining pairs are still attempted and the session
                    // is still fully deleted.
                    warn!(session = %id, pair = i, error = %err, "failed to flush pair to disk");
                }
            }

            self.store.delete(&keys::pair_reads(id, i)).await?;
        }

        let processed_reads = match self.store.get(&keys::processed_reads(id)).await? {
            Some(v) => parse_i64(&v)?,
            None => 0,
        };
        self.store.delete(&keys::processed_reads(id)).await?;
        self.store.delete(&keys::pending_bytes(id)).await?;
        self.store.delete(&keys::speed(id)).await?;

        Ok((processed_reads, saved_read_ids))
    }

    async fn flush_pair_to_disk(
        &self,
        id: SessionId,
        filename: &str,
        members: &[Vec<u8>],
    ) -> std::io::Result<()> {
        let dir = self.upload_directory.join(id.to_string());
        tokio::fs::create_dir_all(&dir).await?;

        let contents = members
            .iter()
            .map(|m| String::from_utf8_lossy(m).into_owned())
            .collect::<Vec<_>>()
            .join("\n");

        tokio::fs::write(dir.join(filename), contents).await
    }
}
