//! Network send capability and its reqwest implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::GuardError;
use crate::request::{ApiRequest, ApiResponse, Body};

/// HTTP request timeout in seconds.
/// The guard imposes no timeout of its own, so this governs hung calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Performs the actual network send for a request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GuardError>;
}

/// Transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    api_root: String,
}

impl HttpTransport {
    pub fn new(api_root: impl Into<String>) -> Result<Self, GuardError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    /// Resolve a request target against the API root. Absolute URLs pass through.
    pub fn resolve(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.api_root, target)
        } else {
            format!("{}/{}", self.api_root, target)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, GuardError> {
        let url = self.resolve(&request.target);
        debug!(method = %request.method, url = %url, "Sending request");

        let builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);

        let builder = match request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(url = %url, status = %status, bytes = body.len(), "Received response");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
