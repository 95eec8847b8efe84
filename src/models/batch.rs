use serde::{Deserialize, Serialize};

/// A single 4-line record: identifier, sequence, separator, qualities. Only
/// the sequence line contributes to byte accounting.
pub type Read = [String; 4];

/// One logically aligned group of reads, one per parallel input stream.
pub type Pair = Vec<Read>;

/// A client-submitted ordered sequence of pairs.
pub type Batch = Vec<Pair>;

pub const READ_IDENTIFIER: usize = 0;
pub const READ_SEQUENCE: usize = 1;
pub const READ_SEPARATOR: usize = 2;
pub const READ_QUALITIES: usize = 3;

/// Joins a read's four lines with `\n`, the exact encoding stored in
/// `pair:i:reads` set members and written verbatim to output files on close.
pub fn encode_read(read: &Read) -> Vec<u8> {
    read.join("\n").into_bytes()
}

/// Request body for `POST /context/create`.
#[derive(Debug, Deserialize)]
pub struct CreateContextRequest {
    pub filenames: Vec<String>,
}

/// Response body for `POST /context/create`.
#[derive(Debug, Serialize)]
pub struct CreateContextResponse {
    pub context: String,
}

/// Response body for a successfully accepted upload.
#[derive(Debug, Serialize)]
pub struct UploadAccepted {
    #[serde(rename = "processedReads")]
    pub processed_reads: i64,
    #[serde(rename = "pendingBytes")]
    pub pending_bytes: i64,
}

/// Response body for a successful close.
#[derive(Debug, Serialize)]
pub struct CloseResponse {
    #[serde(rename = "readsSaved")]
    pub reads_saved: Vec<String>,
    #[serde(rename = "readsProcessed")]
    pub reads_processed: i64,
}

/// Request body for `POST /context/<id>/request-data`.
#[derive(Debug, Deserialize)]
pub struct RequestDataRequest {
    pub bytes_to_request: i64,
}

/// Response body for `GET /server-status`.
#[derive(Debug, Serialize)]
pub struct ServerStatus {
    pub version: String,
    pub uptime_seconds: f64,
    #[serde(rename = "bufferSize")]
    pub buffer_size: i64,
}
