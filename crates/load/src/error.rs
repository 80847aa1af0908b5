//! Session error types.

use std::time::Duration;

use capyprobe_transfer::TransferError;
use capyprobe_upload_api::TransportError;

/// Errors produced while driving one upload session.
///
/// [`SimulatedInterruption`](Self::SimulatedInterruption) and
/// [`ChunkTransportError`](Self::ChunkTransportError) are resumed in place
/// until their per-chunk budget runs out; everything else ends the session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("init rejected: {0}")]
    InitiateRejected(#[source] TransportError),

    #[error("chunk {index} rejected: {source}")]
    ChunkRejected {
        index: usize,
        #[source]
        source: TransportError,
    },

    #[error("chunk {index} failed after {attempts} attempt(s): {source}")]
    ChunkTransportError {
        index: usize,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("simulated interruption at chunk {index} ({attempts} in a row)")]
    SimulatedInterruption { index: usize, attempts: u32 },

    #[error("complete rejected: {0}")]
    FinalizeRejected(#[source] TransportError),

    #[error("session timed out after {0:?}")]
    TimedOut(Duration),

    #[error("payload error: {0}")]
    Payload(#[source] TransferError),

    #[error("session state error: {0}")]
    Session(#[from] TransferError),
}

impl SessionError {
    /// Returns `true` for errors the controller resumes from in place.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SimulatedInterruption { .. } | Self::ChunkTransportError { .. }
        )
    }
}
