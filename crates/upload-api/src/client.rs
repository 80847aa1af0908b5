//! HTTP upload transport.
//!
//! Async client using `reqwest` with Bearer token authentication.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{TransportFuture, UploadTransport};
use crate::types::{CompleteUploadRequest, InitUploadRequest, InitUploadResponse, chunk_fields};

/// Multipart upload API client.
///
/// `endpoint` is the upload API prefix (`<base_url><upload_path>`); the
/// operations post to `/init`, `/chunk` and `/complete` beneath it.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a client for `endpoint` authenticated with `token`.
    pub fn new(
        endpoint: &str,
        token: &str,
        request_timeout: Option<Duration>,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| TransportError::InvalidToken)?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Returns the upload API prefix.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, op: &str) -> String {
        format!("{}/{op}", self.endpoint)
    }

    /// Sends a prepared request and returns the body of a success response.
    async fn execute(&self, req: reqwest::RequestBuilder) -> Result<Vec<u8>, TransportError> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    async fn do_initiate(
        &self,
        object_name: &str,
        total_size: u64,
        chunk_count: usize,
    ) -> Result<String, TransportError> {
        let body = InitUploadRequest {
            filename: object_name.to_string(),
            total_size,
            chunk_count,
        };
        let bytes = self
            .execute(self.http.post(self.url("init")).json(&body))
            .await?;
        let resp: InitUploadResponse = serde_json::from_slice(&bytes)?;
        let upload_id = resp.upload_id.ok_or(TransportError::MissingUploadId)?;
        debug!(object = %object_name, upload_id = %upload_id, "upload initiated");
        Ok(upload_id)
    }

    async fn do_send_chunk(
        &self,
        upload_id: &str,
        chunk_index: usize,
        data: Vec<u8>,
    ) -> Result<(), TransportError> {
        let len = data.len();
        let part = Part::bytes(data)
            .file_name(chunk_fields::chunk_file_name(chunk_index))
            .mime_str(chunk_fields::CHUNK_CONTENT_TYPE)?;
        let form = Form::new()
            .text(chunk_fields::UPLOAD_ID, upload_id.to_string())
            .text(chunk_fields::CHUNK_INDEX, chunk_index.to_string())
            .part(chunk_fields::CHUNK_DATA, part);

        self.execute(self.http.post(self.url("chunk")).multipart(form))
            .await?;
        debug!(upload_id = %upload_id, chunk = chunk_index, bytes = len, "chunk accepted");
        Ok(())
    }

    async fn do_finalize(&self, upload_id: &str) -> Result<(), TransportError> {
        let body = CompleteUploadRequest {
            upload_id: upload_id.to_string(),
        };
        self.execute(self.http.post(self.url("complete")).json(&body))
            .await?;
        Ok(())
    }
}

impl UploadTransport for HttpTransport {
    fn initiate<'a>(
        &'a self,
        object_name: &'a str,
        total_size: u64,
        chunk_count: usize,
    ) -> TransportFuture<'a, String> {
        Box::pin(self.do_initiate(object_name, total_size, chunk_count))
    }

    fn send_chunk<'a>(
        &'a self,
        upload_id: &'a str,
        chunk_index: usize,
        data: Vec<u8>,
    ) -> TransportFuture<'a, ()> {
        Box::pin(self.do_send_chunk(upload_id, chunk_index, data))
    }

    fn finalize<'a>(&'a self, upload_id: &'a str) -> TransportFuture<'a, ()> {
        Box::pin(self.do_finalize(upload_id))
    }
}
