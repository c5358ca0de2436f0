//! reqwest-backed [`HttpBackend`]

use super::{HttpBackend, Method, WireError, WireRequest, WireResponse};
use crate::error::ConfigError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    /// Build a client; `timeout` of `None` leaves requests unbounded
    pub fn new(timeout: Option<Duration>) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Reuse an existing client (shared pool, custom TLS, ...)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, WireError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, request.url)
            .header(AUTHORIZATION, request.authorization)
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await.map_err(|e| WireError {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| WireError {
            timed_out: e.is_timeout(),
            message: format!("failed to read response body: {e}"),
        })?;

        Ok(WireResponse { status, body })
    }
}
