//! HTTP gateway
//!
//! The data components only depend on the [`HttpGateway`] contract: a
//! response with any status is `Ok`, a missing response or an unsendable
//! request is a [`GatewayError`]. [`ReqwestGateway`] is the production
//! implementation.

use crate::error::GatewayError;
use crate::validation::BinaryPayload;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use upsync_common::config::GatewayConfig;

const USER_AGENT: &str = concat!("upsync/", env!("CARGO_PKG_VERSION"));

/// Upload body is streamed in chunks of this size; one progress callback per chunk
pub const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Upload progress callback: `(bytes_sent, bytes_total)`
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Status and JSON body of a received response
///
/// A body that is not JSON is represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Exactly HTTP 200
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport contract consumed by the scheduler and the orchestrator
#[async_trait]
pub trait HttpGateway: Send + Sync {
    /// `GET url`
    async fn get_json(&self, url: &str) -> Result<GatewayResponse, GatewayError>;

    /// `POST url` with a JSON body
    async fn post_json(&self, url: &str, body: &Value) -> Result<GatewayResponse, GatewayError>;

    /// `POST url` with a multipart body whose `file` field carries `payload`
    async fn post_file(
        &self,
        url: &str,
        payload: &BinaryPayload,
        on_progress: ProgressFn,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// reqwest-backed gateway
pub struct ReqwestGateway {
    http_client: reqwest::Client,
}

impl ReqwestGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http_client = builder
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self { http_client })
    }

    async fn finish(
        url: &str,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<GatewayResponse, GatewayError> {
        let response = sent.map_err(|e| classify(url, e))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| classify(url, e))?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        debug!(url = %url, status, "Response received");
        Ok(GatewayResponse { status, body })
    }
}

/// Builder errors never reached the network; everything else did
fn classify(url: &str, error: reqwest::Error) -> GatewayError {
    if error.is_builder() {
        GatewayError::Request(error.to_string())
    } else {
        GatewayError::Transport {
            url: url.to_string(),
            reason: error.to_string(),
        }
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn get_json(&self, url: &str) -> Result<GatewayResponse, GatewayError> {
        debug!(url = %url, "GET");
        let sent = self.http_client.get(url).send().await;
        Self::finish(url, sent).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<GatewayResponse, GatewayError> {
        debug!(url = %url, "POST json");
        let sent = self.http_client.post(url).json(body).send().await;
        Self::finish(url, sent).await
    }

    async fn post_file(
        &self,
        url: &str,
        payload: &BinaryPayload,
        on_progress: ProgressFn,
    ) -> Result<GatewayResponse, GatewayError> {
        let total = payload.bytes.len() as u64;
        debug!(url = %url, file = %payload.name, bytes = total, "POST multipart");

        let chunks: Vec<Vec<u8>> = payload
            .bytes
            .chunks(UPLOAD_CHUNK_BYTES)
            .map(<[u8]>::to_vec)
            .collect();
        let mut sent_bytes = 0u64;
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            sent_bytes += chunk.len() as u64;
            on_progress(sent_bytes, total);
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(payload.name.clone())
            .mime_str(&payload.mime_type)
            .map_err(|e| GatewayError::Request(e.to_string()))?;
        let form = Form::new().part("file", part);

        let sent = self.http_client.post(url).multipart(form).send().await;
        Self::finish(url, sent).await
    }
}
