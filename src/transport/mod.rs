// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Transport layer for upstream REST and JSON-RPC calls.
//!
//! Requests flow through a stack of Tower services:
//!
//! ```text
//! RetryService          backoff with jitter, rate-limit hints, retry budget
//!   RateLimitService    token bucket shared by all attempts
//!     LoggingService    one debug line and span per attempt
//!       TransportService  adapter over a `Transport` (reqwest in production)
//! ```
//!
//! The [`Transport`] trait is the seam for tests: the HTTP implementation
//! ([`HttpTransport`]) can be replaced with a scripted fake while the retry
//! and rate-limit layers stay real.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tower::Layer;
//! use walletscan::transport::{HttpTransport, RateLimitLayer, RetryLayer, TransportService};
//!
//! let transport = TransportService::new(Arc::new(HttpTransport::from_config(&config)?));
//! let service = RetryLayer::new().layer(RateLimitLayer::per_second(5).layer(transport));
//! ```

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use serde_json::Value;

mod backoff;
mod hint;
mod http;
mod logging;
mod rate_limit;
mod retry;

pub use backoff::{next_delay, AttemptOutcome, RetryState};
pub use hint::{RateLimitHint, EPOCH_THRESHOLD_SECS, RATE_LIMIT_RESET_HEADER};
pub use http::{HttpTransport, API_KEY_HEADER};
pub use logging::{LoggingLayer, LoggingService};
pub use rate_limit::{RateLimitLayer, RateLimitService};
pub use retry::{
    JitterSource, RetryConfig, RetryLayer, RetryLayerBuilder, RetryService,
    DEFAULT_RETRYABLE_STATUSES,
};

/// JSON-RPC error codes that indicate a transient upstream condition.
///
/// -32005: node is behind / request limit reached; -32004: block not available;
/// 429: some providers mirror the HTTP status into the JSON-RPC code.
pub const RETRYABLE_RPC_CODES: &[i64] = &[-32005, -32004, 429];

/// A request to the upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    /// Header-authenticated REST GET against the API base URL.
    Rest {
        /// Path relative to the API base, e.g. `account/defi/activities`
        endpoint: String,
        /// Query string pairs, in order (repeated keys allowed)
        params: Vec<(String, String)>,
    },
    /// JSON-RPC 2.0 POST against the RPC URL.
    Rpc {
        method: String,
        params: Value,
    },
}

impl ApiRequest {
    pub fn rest(endpoint: impl Into<String>, params: Vec<(String, String)>) -> Self {
        ApiRequest::Rest {
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn rpc(method: impl Into<String>, params: Value) -> Self {
        ApiRequest::Rpc {
            method: method.into(),
            params,
        }
    }

    /// Endpoint path or RPC method, for logs and errors.
    pub fn label(&self) -> &str {
        match self {
            ApiRequest::Rest { endpoint, .. } => endpoint,
            ApiRequest::Rpc { method, .. } => method,
        }
    }
}

/// A successful upstream response.
///
/// For JSON-RPC requests `body` is the `result` member; for REST it is the
/// whole decoded document.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// A single failed attempt, before retry classification.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// No response: connection failure, reset, or request timeout.
    #[error("network failure (timeout={timeout}): {details}")]
    Network { details: String, timeout: bool },

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http {
        status: u16,
        body: String,
        hint: Option<RateLimitHint>,
    },

    /// JSON-RPC error object inside a 2xx response.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// 2xx response whose body is not the JSON we expect.
    #[error("undecodable response: {0}")]
    Decode(String),

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Rate-limit hint attached to the failure, if any.
    pub fn hint(&self) -> Option<RateLimitHint> {
        match self {
            TransportError::Http { hint, .. } => *hint,
            _ => None,
        }
    }

    /// HTTP status of the failure, if it had one.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Sends one request attempt to the upstream.
///
/// Implementations must not retry; the retry layer owns that policy.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Tower adapter over a shared [`Transport`].
#[derive(Clone)]
pub struct TransportService {
    inner: Arc<dyn Transport>,
}

impl TransportService {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for TransportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportService").finish_non_exhaustive()
    }
}

impl tower::Service<ApiRequest> for TransportService {
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.send(request).await })
    }
}
