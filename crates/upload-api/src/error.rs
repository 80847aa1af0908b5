//! Transport error types.

/// Errors from an upload transport.
///
/// Callers classify with [`is_rejected`](Self::is_rejected) and
/// [`is_transport`](Self::is_transport); the transport itself never retries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection failure reported as a plain I/O error. `HttpTransport`
    /// surfaces these through [`Http`](Self::Http); this variant is for
    /// transports that are not built on `reqwest`.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error("API error {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("init response carried no upload_id")]
    MissingUploadId,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid auth token")]
    InvalidToken,
}

impl TransportError {
    /// The remote answered but refused the request.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::Rejected { .. } | Self::MissingUploadId | Self::Json(_)
        )
    }

    /// The request never got a usable answer (connect, timeout, broken body).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_))
    }
}
