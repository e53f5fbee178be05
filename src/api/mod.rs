// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Rate-limited client for the REST API and the Solana JSON-RPC endpoint.
//!
//! [`ApiClient`] owns the tower stack from [`crate::transport`] and exposes
//! `fetch` (REST, `{success, data}` envelope unwrapped) and `rpc` (JSON-RPC
//! `result`). Typed wrappers for individual endpoints live in [`rest`] and
//! [`rpc`].
//!
//! # Example
//!
//! ```rust,no_run
//! use walletscan::{Address, ApiClient, WalletscanConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::from_config(&WalletscanConfig::from_env()?)?;
//! let address = Address::parse("GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S")?;
//! let detail = client.account_detail(&address).await?;
//! println!("{detail}");
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::future::poll_fn;
use serde_json::Value;
use tower::{Layer, Service};
use tracing::debug;

use crate::config::WalletscanConfig;
use crate::errors::{ApiError, ConfigError};
use crate::transport::{
    ApiRequest, ApiResponse, HttpTransport, LoggingLayer, LoggingService, RateLimitLayer,
    RateLimitService, RetryLayer, RetryService, Transport, TransportService,
};

pub mod rest;
pub mod rpc;
mod types;

pub use rest::{Endpoint, RestQuery};
pub use types::{
    ActivityFilter, ActivityRecord, ActivityRouters, SignatureInfo, SortOrder, TransactionStatus,
};

type ClientService = RetryService<RateLimitService<LoggingService<TransportService>>>;

/// Client for every upstream call the crate makes.
///
/// Cloning is cheap; clones share the transport and the rate-limit bucket.
#[derive(Clone, Debug)]
pub struct ApiClient {
    service: ClientService,
}

impl ApiClient {
    /// Assembles the stack `retry -> rate limit -> logging -> transport`.
    pub fn new(transport: Arc<dyn Transport>, retry: RetryLayer, rate_limit: RateLimitLayer) -> Self {
        Self::with_logging(transport, retry, rate_limit, LoggingLayer::new())
    }

    pub fn with_logging(
        transport: Arc<dyn Transport>,
        retry: RetryLayer,
        rate_limit: RateLimitLayer,
        logging: LoggingLayer,
    ) -> Self {
        let service = retry.layer(rate_limit.layer(logging.layer(TransportService::new(transport))));
        Self { service }
    }

    /// Client over HTTP using the retry, rate-limit and timeout settings of
    /// `config`.
    pub fn from_config(config: &WalletscanConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::from_config(config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Client over an arbitrary transport using the policies of `config`.
    pub fn with_transport(config: &WalletscanConfig, transport: Arc<dyn Transport>) -> Self {
        let logging = if config.verbose {
            LoggingLayer::new().verbose()
        } else {
            LoggingLayer::new()
        };
        Self::with_logging(
            transport,
            RetryLayer::from_config(config.retry.clone()),
            RateLimitLayer::per_second(config.rate_limit_per_second),
            logging,
        )
    }

    /// Sends one logical request through retry and rate limiting.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut service = self.service.clone();
        poll_fn(|cx| service.poll_ready(cx)).await?;
        service.call(request).await
    }

    /// GETs a REST endpoint and returns the `data` member of the envelope.
    ///
    /// A body with `success: false` is reported as [`ApiError::Http`] with
    /// the body verbatim. Bodies without an envelope are returned whole.
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value, ApiError> {
        debug!(endpoint = endpoint, params = params.len(), "Fetching REST endpoint");
        let response = self.execute(ApiRequest::rest(endpoint, params)).await?;
        unwrap_envelope(endpoint, response)
    }

    /// Calls a JSON-RPC method and returns its `result`.
    pub async fn rpc(&self, method: &str, params: Value) -> Result<Value, ApiError> {
        debug!(method = method, "Calling JSON-RPC method");
        let response = self.execute(ApiRequest::rpc(method, params)).await?;
        Ok(response.body)
    }
}

fn unwrap_envelope(endpoint: &str, response: ApiResponse) -> Result<Value, ApiError> {
    let ApiResponse { status, mut body } = response;

    if body.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(ApiError::Http {
            endpoint: endpoint.to_string(),
            status,
            body: body.to_string(),
        });
    }

    match body.get_mut("data") {
        Some(data) => Ok(data.take()),
        None => Ok(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_envelope() {
        let ok = ApiResponse {
            status: 200,
            body: json!({"success": true, "data": [1, 2]}),
        };
        assert_eq!(unwrap_envelope("e", ok).unwrap(), json!([1, 2]));

        let bare = ApiResponse {
            status: 200,
            body: json!({"price": 1}),
        };
        assert_eq!(unwrap_envelope("e", bare).unwrap(), json!({"price": 1}));

        let failed = ApiResponse {
            status: 200,
            body: json!({"success": false, "errors": {"code": 1100, "message": "bad address"}}),
        };
        match unwrap_envelope("account/detail", failed).unwrap_err() {
            ApiError::Http { status, body, .. } => {
                assert_eq!(status, 200);
                assert!(body.contains("bad address"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
