use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::AppError;
use crate::models::batch::{Batch, Pair, READ_SEQUENCE};
use crate::models::{JobRecord, SessionId};
use crate::store::StateStore;

use super::keys;
use super::queue::QueuePublisher;
use super::session_registry::SessionRegistry;

/// Result of a successfully accepted upload.
pub struct AdmissionOutcome {
    pub processed_reads: i64,
    pub pending_bytes: i64,
}

/// Validates, prices, and budgets upload batches, then hands accepted
/// pairs to the [`QueuePublisher`]. Shared verbatim between the HTTP and
/// message-transport frontends, since both are just two ways in to the
/// same admission decision.
pub struct AdmissionController {
    store: Arc<dyn StateStore>,
    registry: Arc<SessionRegistry>,
    queue: Arc<QueuePublisher>,
    maximum_pending_bytes: i64,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: Arc<SessionRegistry>,
        queue: Arc<QueuePublisher>,
        maximum_pending_bytes: i64,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            maximum_pending_bytes,
        }
    }

    /// Validates, prices, and admits `batch` against `id`'s budget,
    /// enqueuing accepted pairs as a single job.
    pub async fn admit(&self, id: SessionId, batch: Batch) -> Result<AdmissionOutcome, AppError> {
        if !self.registry.exists(id).await? {
            return Err(AppError::NoSuchContext(id));
        }
        let pair_count = self.registry.pair_count(id).await? as usize;

        let mut chunk_cost: i64 = 0;
        let mut accepted: Vec<Pair> = Vec::new();
        let mut dropped_bases: i64 = 0;

        for pair in &batch {
            if pair.len() != pair_count {
                return Err(AppError::PairCountMismatch {
                    expected: pair_count,
                    found: pair.len(),
                });
            }

            let mut pair_cost: i64 = 0;
            let mut pair_fits = true;

            for read in pair {
                let len = read[READ_SEQUENCE].len() as i64;
                if len <= self.maximum_pending_bytes {
                    pair_cost += len;
                } else {
                    // The global bases counter is incremented regardless of
                    // whether the rest of the pair would have fit; the pair
                    // itself is discarded entirely and the remaining reads
                    // in it are skipped.
                    dropped_bases += len;
                    pair_fits = false;
                    break;
                }
            }

            if pair_fits {
                chunk_cost += pair_cost;
                accepted.push(pair.clone());
            }
        }

        if dropped_bases > 0 {
            self.store.incr_by(keys::STATS_BASES, dropped_bases).await?;
        }

        let queue_speed = self.registry.queue_speed(id).await?;
        let current_pending = self.registry.pending_bytes(id).await?;
        let excess = current_pending + chunk_cost - self.maximum_pending_bytes;

        if chunk_cost > self.maximum_pending_bytes {
            let processed_reads = self.registry.processed_reads(id).await?;
            return Err(AppError::ChunkTooLarge {
                processed_reads,
                retry_after: excess as f64 * queue_speed,
            });
        }

        if excess > 0 {
            let processed_reads = self.registry.processed_reads(id).await?;
            return Err(AppError::BudgetExceeded {
                pending_bytes: current_pending,
                processed_reads,
                retry_after: excess as f64 * queue_speed,
            });
        }

        let rejected_pairs = (batch.len() - accepted.len()) as i64;
        let new_pending = self.registry.change_pending_bytes(id, chunk_cost).await?;
        let new_processed = self
            .registry
            .increment_processed_reads(id, rejected_pairs)
            .await?;

        // Empty batches are never enqueued — and a batch whose every pair
        // was dropped for oversize reads has nothing to enqueue either.
        if !accepted.is_empty() {
            let read_pair_count = accepted.len() as i64;
            let job = JobRecord {
                session_id: id,
                chunk_cost,
                read_pair_count,
                pair_count: pair_count as i64,
                enqueued_at: unix_time_secs(),
                accepted,
            };
            self.queue.publish(job).await?;
        }

        Ok(AdmissionOutcome {
            processed_reads: new_processed,
            pending_bytes: new_pending,
        })
    }
}

fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
