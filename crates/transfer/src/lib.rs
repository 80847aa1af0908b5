//! Chunk planning, upload session state and payload access for the probe.
//!
//! Everything here is transport-agnostic: the load crate pairs these types
//! with an upload transport and a fault policy.

mod chunked;
mod plan;
mod session;

pub use chunked::{ChunkReader, PayloadSource, ensure_payload_file};
pub use plan::{ChunkPlan, ChunkSpan, plan};
pub use session::{SessionStatus, UploadSession};

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk span ends at {end} but payload is {size} bytes")]
    SpanOutOfBounds { end: u64, size: u64 },

    #[error("session already bound to {0}")]
    SessionAlreadyBound(String),

    #[error("session has no upload id yet")]
    SessionNotBound,

    #[error("chunk {got} confirmed out of order (next is {expected})")]
    ChunkOutOfOrder { expected: usize, got: usize },

    #[error("chunk {index} out of range ({count} chunks)")]
    ChunkOutOfRange { index: usize, count: usize },

    #[error("only {confirmed} of {count} chunks confirmed")]
    IncompleteSession { confirmed: usize, count: usize },
}
