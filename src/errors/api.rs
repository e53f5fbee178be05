// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Errors surfaced by the rate-limited API client.
//!
//! These are the failures a caller sees *after* the retry layer has given up.
//! Transient conditions that were retried successfully never reach the caller.

/// Errors that can occur when calling the upstream REST or JSON-RPC API.
///
/// # Examples
///
/// ```rust
/// use walletscan::ApiError;
///
/// let error = ApiError::Http {
///     endpoint: "account/detail".to_string(),
///     status: 404,
///     body: "{\"success\":false}".to_string(),
/// };
/// assert!(error.to_string().contains("404"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No response was received (connection failure or timeout) and the
    /// retry budget is exhausted.
    #[error("Network error calling {endpoint} after {attempts} attempt(s): {details}")]
    Network {
        /// Endpoint or RPC method being called
        endpoint: String,
        /// Total attempts made, including the first
        attempts: u32,
        /// Whether the final failure was a request timeout
        timeout: bool,
        /// Description of the last underlying failure
        details: String,
    },

    /// The upstream answered with a non-success status.
    ///
    /// For retryable statuses this is returned once `max_retries` is exhausted;
    /// for all other statuses it is returned immediately.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        /// Endpoint or RPC method being called
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// A JSON-RPC error object was returned in an otherwise successful response.
    #[error("JSON-RPC error from {method}: code={code}, message={message}")]
    Rpc {
        /// RPC method name
        method: String,
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The upstream kept asking us to wait (rate-limit hints) more times than
    /// the configured hint budget allows.
    #[error("Rate limited by {endpoint}: gave up after {waits} hinted wait(s)")]
    RateLimited {
        /// Endpoint or RPC method being called
        endpoint: String,
        /// Number of hinted waits that were honored
        waits: u32,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("Failed to decode response from {endpoint}: {details}")]
    Decode {
        /// Endpoint or RPC method being called
        endpoint: String,
        /// Details about the decode failure
        details: String,
    },

    /// The request could not be built (bad URL, bad parameters).
    #[error("Invalid request to {endpoint}: {details}")]
    InvalidRequest {
        /// Endpoint or RPC method being called
        endpoint: String,
        /// What was wrong with the request
        details: String,
    },
}

impl ApiError {
    /// Create a `Decode` error from any error type.
    pub fn decode(endpoint: impl Into<String>, source: impl std::fmt::Display) -> Self {
        ApiError::Decode {
            endpoint: endpoint.into(),
            details: source.to_string(),
        }
    }

    /// Create an `InvalidRequest` error.
    pub fn invalid_request(endpoint: impl Into<String>, details: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
