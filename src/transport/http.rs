// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! `reqwest` implementation of [`Transport`].
//!
//! REST requests are GETs under the API base URL with the key in the
//! [`API_KEY_HEADER`] header. JSON-RPC requests are POSTs of a JSON-RPC 2.0
//! envelope; the `result` member becomes the response body and an `error`
//! member becomes [`TransportError::Rpc`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::trace;
use url::Url;

use super::{ApiRequest, ApiResponse, RateLimitHint, Transport, TransportError};
use crate::config::WalletscanConfig;
use crate::errors::ConfigError;

/// Header carrying the REST API key.
pub const API_KEY_HEADER: &str = "token";

/// HTTP transport for the REST API and the JSON-RPC endpoint.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    rest_base: Url,
    rpc_url: Url,
    api_key: Option<String>,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Creates a transport whose every attempt is bounded by `timeout`.
    pub fn new(
        rest_base: Url,
        rpc_url: Url,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::invalid_value("http_client", e.to_string()))?;

        Ok(Self {
            client,
            rest_base,
            rpc_url,
            api_key,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &WalletscanConfig) -> Result<Self, ConfigError> {
        Self::new(
            config.api_base_url.clone(),
            config.rpc_url.clone(),
            config.api_key.clone(),
            config.request_timeout,
        )
    }

    async fn send_rest(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<ApiResponse, TransportError> {
        let url = self
            .rest_base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("{endpoint}: {e}")))?;

        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(classify)?;
        let (status, text) = read_response(response).await?;

        serde_json::from_str(&text)
            .map(|body| ApiResponse { status, body })
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn send_rpc(&self, method: &str, params: &Value) -> Result<ApiResponse, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&envelope)
            .send()
            .await
            .map_err(classify)?;
        let (status, text) = read_response(response).await?;

        let mut document: Value =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;

        if let Some(error) = document.get("error").filter(|e| !e.is_null()) {
            return Err(TransportError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown JSON-RPC error")
                    .to_string(),
            });
        }

        match document.get_mut("result") {
            Some(result) => Ok(ApiResponse {
                status,
                body: result.take(),
            }),
            None => Err(TransportError::Decode(format!(
                "JSON-RPC response for {method} has neither result nor error"
            ))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        trace!(endpoint = request.label(), "Sending request");
        match &request {
            ApiRequest::Rest { endpoint, params } => self.send_rest(endpoint, params).await,
            ApiRequest::Rpc { method, params } => self.send_rpc(method, params).await,
        }
    }
}

/// Reads status and body; non-2xx becomes [`TransportError::Http`] with any
/// rate-limit hint the headers carry.
async fn read_response(response: reqwest::Response) -> Result<(u16, String), TransportError> {
    let status = response.status();
    let hint = RateLimitHint::from_headers(response.headers());
    let text = response.text().await.map_err(classify)?;

    if status.is_success() {
        Ok((status.as_u16(), text))
    } else {
        Err(TransportError::Http {
            status: status.as_u16(),
            body: text,
            hint,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        return TransportError::InvalidRequest(error.to_string());
    }
    TransportError::Network {
        timeout: error.is_timeout(),
        details: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = WalletscanConfig::minimal();
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.rest_base, config.api_base_url);
        assert_eq!(transport.rpc_url, config.rpc_url);
        assert!(transport.api_key.is_none());
    }
}
