use serde::{Deserialize, Serialize};

use crate::models::batch::Batch;
use crate::models::SessionId;

/// Client→server messages, carried as a JSON envelope
/// `{"event": "<name>", "payload": {...}}` over a plain WebSocket —
/// see DESIGN.md for why this replaces the source's Socket.IO framing.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "createContext")]
    CreateContext { filenames: Vec<String> },
    #[serde(rename = "dataUpload")]
    DataUpload {
        data: Batch,
        #[allow(dead_code)]
        bytes: i64,
        #[serde(rename = "contextId")]
        context_id: SessionId,
    },
    #[serde(rename = "closeContext")]
    CloseContext {
        #[serde(rename = "contextId")]
        context_id: SessionId,
    },
}

/// Server→client messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload")]
pub enum ServerEvent {
    #[serde(rename = "dataRequest")]
    DataRequest {
        bytes: i64,
        #[serde(rename = "contextId")]
        context_id: SessionId,
        #[serde(rename = "bufferFill")]
        buffer_fill: i64,
        #[serde(rename = "processedReads")]
        processed_reads: i64,
    },
    #[serde(rename = "contextCreationError")]
    ContextCreationError { message: String },
    #[serde(rename = "contextCloseError")]
    ContextCloseError { message: String },
    #[serde(rename = "contextClosed")]
    ContextClosed {
        #[serde(rename = "contextId")]
        context_id: SessionId,
        #[serde(rename = "savedReads")]
        saved_reads: Vec<String>,
        #[serde(rename = "processedReads")]
        processed_reads: i64,
    },
    #[serde(rename = "dataUploadError")]
    DataUploadError { message: String },
}
