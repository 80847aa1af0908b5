//! Wire types for the multipart upload API.

use serde::{Deserialize, Serialize};

/// Body of `POST /init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitUploadRequest {
    pub filename: String,
    pub total_size: u64,
    pub chunk_count: usize,
}

/// Response of `POST /init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitUploadResponse {
    #[serde(default)]
    pub upload_id: Option<String>,
}

/// Body of `POST /complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteUploadRequest {
    pub upload_id: String,
}

/// Multipart form field names of `POST /chunk`.
pub mod chunk_fields {
    pub const UPLOAD_ID: &str = "upload_id";
    pub const CHUNK_INDEX: &str = "chunk_index";
    pub const CHUNK_DATA: &str = "chunk_data";
    pub const CHUNK_CONTENT_TYPE: &str = "application/octet-stream";

    /// File name attached to the `chunk_data` part.
    pub fn chunk_file_name(index: usize) -> String {
        format!("chunk_{index}")
    }
}
