//! Upload transport trait.
//!
//! `HttpTransport` is the production implementation; controllers only see
//! this trait, which keeps the resume logic testable with mocks.

use std::future::Future;
use std::pin::Pin;

use crate::error::TransportError;

/// Boxed future returned by [`UploadTransport`] operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// The three remote operations of a resumable upload.
pub trait UploadTransport: Send + Sync {
    /// Opens an upload session and returns its server-issued id.
    fn initiate<'a>(
        &'a self,
        object_name: &'a str,
        total_size: u64,
        chunk_count: usize,
    ) -> TransportFuture<'a, String>;

    /// Sends one chunk. Success means the remote recorded it durably.
    fn send_chunk<'a>(
        &'a self,
        upload_id: &'a str,
        chunk_index: usize,
        data: Vec<u8>,
    ) -> TransportFuture<'a, ()>;

    /// Completes the upload once every chunk has been recorded.
    fn finalize<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, ()>;
}
