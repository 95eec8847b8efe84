use std::sync::Arc;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::JobRecord;
use crate::store::{Pipeline, StateStore};

use super::keys;

/// Serialises accepted batches into work-queue records.
pub struct QueuePublisher {
    store: Arc<dyn StateStore>,
}

impl QueuePublisher {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Appends `job`'s record to `work:<jobId>` and then `jobId` to
    /// `work:queue`, both in one atomic transaction, so no worker can ever
    /// observe the pointer before its payload.
    ///
    /// Never called with an empty accepted list — the admission controller
    /// short-circuits before reaching here.
    pub async fn publish(&self, job: JobRecord) -> Result<(), AppError> {
        let job_id = Uuid::new_v4().to_string();
        let mut pipeline = Pipeline::new();

        for value in job.encode() {
            pipeline = pipeline.list_push_right(keys::work_job(&job_id), value);
        }
        pipeline = pipeline.list_push_right(keys::WORK_QUEUE, job_id.into_bytes());

        self.store.commit(pipeline).await?;
        Ok(())
    }
}
