use super::batch::{encode_read, Pair};
use super::session::SessionId;

/// One accepted batch, converted into a single work-queue record. Pushed
/// onto `work:<jobId>` as an ordered run of scalars rather than a single
/// serialized blob — see DESIGN.md for why this encoding was chosen over
/// the alternative.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub session_id: SessionId,
    /// Effective cumulated chunk size in bytes.
    pub chunk_cost: i64,
    /// Number of accepted read-pairs in this job.
    pub read_pair_count: i64,
    pub pair_count: i64,
    /// Seconds since epoch, at the moment the batch was accepted.
    pub enqueued_at: f64,
    pub accepted: Vec<Pair>,
}

impl JobRecord {
    /// Encodes this record into the ordered run of values to be pushed onto
    /// `work:<jobId>`. Receivers (filter workers) read the list back in
    /// this same head-to-tail order.
    pub fn encode(&self) -> Vec<Vec<u8>> {
        let mut values = Vec::new();
        values.push(self.enqueued_at.to_string().into_bytes());
        values.push(self.pair_count.to_string().into_bytes());
        values.push(self.read_pair_count.to_string().into_bytes());
        values.push(self.chunk_cost.to_string().into_bytes());
        values.push(self.session_id.to_string().into_bytes());

        for pair in &self.accepted {
            for read in pair {
                values.push(encode_read(read));
            }
        }

        values
    }
}
