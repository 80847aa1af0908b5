//! Client for the multipart upload API.
//!
//! Provides the [`UploadTransport`] trait the load crate drives and an
//! [`HttpTransport`] implementation over `reqwest`.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::HttpTransport;
pub use error::TransportError;
pub use transport::{TransportFuture, UploadTransport};
pub use types::{CompleteUploadRequest, InitUploadRequest, InitUploadResponse};
