//! Raw key-schema helpers for fixture setup — tests poke these directly to
//! simulate what a filter worker would do, since filter workers themselves
//! live in a separate process this crate never runs.

use ingest_api::models::SessionId;

pub fn pending_bytes(id: SessionId) -> String {
    format!("context:{id}:pending_bytes")
}

pub fn pair_reads(id: SessionId, i: usize) -> String {
    format!("context:{id}:pair:{i}:reads")
}
