// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Test helpers for walletscan integration tests
//!
//! Provides a scripted [`Transport`] so the real retry, rate-limit and
//! pagination code can run without network access.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use walletscan::transport::{
    ApiRequest, ApiResponse, JitterSource, RateLimitLayer, RetryLayer, Transport, TransportError,
};
use walletscan::ApiClient;

pub const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";
pub const WSOL: &str = "So11111111111111111111111111111111111111112";
pub const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

type Handler = Box<dyn Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync>;

/// Transport answering every request from a closure.
///
/// The closure receives the request and the zero-based index of the call,
/// so scripts can fail the first N attempts and then succeed.
///
/// # Example
///
/// ```rust,ignore
/// let transport = ScriptedTransport::new(|request, call| match call {
///     0 => Err(network_error()),
///     _ => Ok(rpc_ok(json!([]))),
/// });
/// let client = test_client(transport.clone());
/// ```
pub struct ScriptedTransport {
    handler: Handler,
    latency: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self::build(None, handler)
    }

    /// Like [`new`](Self::new), but every call sleeps for `latency` first,
    /// so concurrent callers overlap.
    pub fn with_latency<F>(latency: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self::build(Some(latency), handler)
    }

    fn build<F>(latency: Option<Duration>, handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            latency,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Transport that fails the test if anything is sent.
    pub fn unreachable() -> Arc<Self> {
        Self::new(|request, _| panic!("unexpected upstream call: {}", request.label()))
    }

    /// Number of attempts sent so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Attempts sent to `label` (REST endpoint or RPC method).
    pub fn calls_to(&self, label: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.label() == label)
            .count()
    }

    /// Highest number of calls observed in progress at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = (self.handler)(&request, call);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Client with short deterministic backoff and no client-side rate limit.
pub fn test_client(transport: Arc<ScriptedTransport>) -> ApiClient {
    let retry = RetryLayer::builder()
        .max_retries(2)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .jitter(JitterSource::fixed(0.0))
        .build();
    ApiClient::new(transport, retry, RateLimitLayer::disabled())
}

/// `{success: true, data}` REST envelope.
pub fn rest_ok(data: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse {
        status: 200,
        body: json!({"success": true, "data": data}),
    })
}

/// JSON-RPC `result`.
pub fn rpc_ok(result: Value) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse {
        status: 200,
        body: result,
    })
}

pub fn http_error(status: u16) -> Result<ApiResponse, TransportError> {
    Err(TransportError::Http {
        status,
        body: format!("{{\"success\":false,\"status\":{status}}}"),
        hint: None,
    })
}

pub fn network_error() -> TransportError {
    TransportError::Network {
        details: "connection reset".to_string(),
        timeout: false,
    }
}

/// A newest-first signature history served like `getSignaturesForAddress`.
#[derive(Debug, Clone)]
pub struct SignatureHistory {
    signatures: Vec<Value>,
}

impl SignatureHistory {
    /// `total` signatures named `sig-0000`, `sig-0001`, ... one minute apart,
    /// newest first. Every tenth transaction failed.
    pub fn new(total: usize) -> Self {
        let signatures = (0..total)
            .map(|i| {
                let err = if i % 10 == 9 {
                    json!({"InstructionError": [0, "Custom"]})
                } else {
                    Value::Null
                };
                json!({
                    "signature": format!("sig-{i:04}"),
                    "slot": 300_000_000u64 - i as u64,
                    "err": err,
                    "blockTime": 1_700_000_000i64 - (i as i64) * 60,
                    "confirmationStatus": "finalized",
                })
            })
            .collect();
        Self { signatures }
    }

    /// Answers one `getSignaturesForAddress` request.
    pub fn serve(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let ApiRequest::Rpc { params, .. } = request else {
            return Err(TransportError::InvalidRequest(format!(
                "unexpected REST call {}",
                request.label()
            )));
        };
        let options = &params[1];
        let limit = options["limit"].as_u64().unwrap_or(1000) as usize;
        let start = match options["before"].as_str() {
            Some(before) => self
                .signatures
                .iter()
                .position(|s| s["signature"] == before)
                .map_or(self.signatures.len(), |i| i + 1),
            None => 0,
        };
        let page: Vec<Value> = self.signatures.iter().skip(start).take(limit).cloned().collect();
        rpc_ok(Value::Array(page))
    }
}

/// Two swaps and a transfer touching wSOL and USDC.
pub fn sample_activities() -> Value {
    json!([
        {
            "trans_id": "act-1",
            "block_time": 1_700_000_000,
            "activity_type": "ACTIVITY_TOKEN_SWAP",
            "platform": ["JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4"],
            "routers": {
                "token1": WSOL, "token1_decimals": 9, "amount1": "1000000000",
                "token2": USDC, "token2_decimals": 6, "amount2": "150000000"
            }
        },
        {
            "trans_id": "act-2",
            "block_time": 1_699_900_000,
            "activity_type": "ACTIVITY_TOKEN_SWAP",
            "platform": ["JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4"],
            "routers": {
                "token1": USDC, "token1_decimals": 6, "amount1": "50000000",
                "token2": WSOL, "token2_decimals": 9, "amount2": "300000000"
            }
        },
        {
            "trans_id": "act-3",
            "block_time": 1_690_000_000,
            "activity_type": "ACTIVITY_SPL_TRANSFER",
            "from_address": "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU",
            "to_address": ADDRESS,
            "token_address": USDC,
            "token_decimals": 6,
            "amount": "25000000"
        }
    ])
}
