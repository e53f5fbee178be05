// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Tower-based retry layer with exponential backoff, jitter and rate-limit
//! hint compliance.
//!
//! The layer drives the pure [`RetryState`] machine: each failed attempt is
//! classified, the machine decides whether to retry and how long to wait, and
//! the service sleeps on the Tokio timer. Only the requesting task is
//! suspended.
//!
//! When a retryable response carries a rate-limit hint (`Retry-After` or
//! `X-RateLimit-Reset`), the service waits exactly the hinted duration instead
//! of the computed backoff, and the attempt does not consume a retry slot.
//! Hinted waits have their own budget (`max_rate_limit_waits`) so a permanently
//! throttled upstream cannot stall a run forever.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use chrono::Utc;
use futures::future::poll_fn;
use tower::Layer;
use tracing::{debug, warn};

use super::backoff::{AttemptOutcome, RetryState};
use super::{ApiRequest, ApiResponse, TransportError, RETRYABLE_RPC_CODES};
use crate::errors::{ApiError, ConfigError};

/// Default maximum number of retry attempts.
const DEFAULT_MAX_RETRIES: u32 = 5;
/// Default delay before the first retry (1 second).
const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;
/// Default maximum delay between retries (60 seconds).
const DEFAULT_MAX_DELAY_MS: u64 = 60_000;
/// Default backoff multiplier.
const DEFAULT_FACTOR: f64 = 2.0;
/// Default jitter fraction.
const DEFAULT_JITTER_FRACTION: f64 = 0.1;
/// Default budget of hinted rate-limit waits per request.
const DEFAULT_MAX_RATE_LIMIT_WAITS: u32 = 10;

/// HTTP statuses retried by default: request timeout, too many requests and
/// the transient server errors.
pub const DEFAULT_RETRYABLE_STATUSES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Configuration for retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial request).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier applied to the previous delay. Must be at least 1.
    pub factor: f64,
    /// Relative jitter added on top of the multiplied delay, in `[0, 1]`.
    pub jitter_fraction: f64,
    /// HTTP statuses treated as transient.
    pub retryable_statuses: Vec<u16>,
    /// Maximum number of hinted rate-limit waits honored per request.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            factor: DEFAULT_FACTOR,
            jitter_fraction: DEFAULT_JITTER_FRACTION,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
            max_rate_limit_waits: DEFAULT_MAX_RATE_LIMIT_WAITS,
        }
    }
}

impl RetryConfig {
    /// Checks the invariants the backoff math relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ConfigError::invalid_value(
                "retry.factor",
                format!("{} must be a finite number >= 1", self.factor),
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter_fraction) {
            return Err(ConfigError::invalid_value(
                "retry.jitter_fraction",
                format!("{} must be within [0, 1]", self.jitter_fraction),
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(ConfigError::invalid_value(
                "retry.initial_delay",
                format!(
                    "{:?} exceeds max_delay {:?}",
                    self.initial_delay, self.max_delay
                ),
            ));
        }
        Ok(())
    }

    /// Whether a failed attempt may be retried.
    ///
    /// Network failures (including timeouts) and undecodable 2xx bodies are
    /// retried; HTTP failures only when their status is in
    /// `retryable_statuses`; JSON-RPC errors only for [`RETRYABLE_RPC_CODES`].
    pub fn is_retryable(&self, error: &TransportError) -> bool {
        match error {
            TransportError::Network { .. } => true,
            TransportError::Http { status, .. } => self.retryable_statuses.contains(status),
            TransportError::Rpc { code, .. } => RETRYABLE_RPC_CODES.contains(code),
            // A gateway error page behind a 200 is usually transient
            TransportError::Decode(_) => true,
            TransportError::InvalidRequest(_) => false,
        }
    }
}

/// Source of jitter samples in `[0, 1)`.
#[derive(Clone)]
pub struct JitterSource(Arc<dyn Fn() -> f64 + Send + Sync>);

impl JitterSource {
    /// Uniform samples from the thread-local RNG.
    pub fn random() -> Self {
        Self(Arc::new(rand::random::<f64>))
    }

    /// Always returns `value`; used to make delays deterministic.
    pub fn fixed(value: f64) -> Self {
        Self(Arc::new(move || value))
    }

    pub fn sample(&self) -> f64 {
        (self.0)()
    }
}

impl Default for JitterSource {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for JitterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JitterSource")
    }
}

/// A Tower layer that adds retry logic with exponential backoff to API requests.
///
/// # Example
///
/// ```rust
/// use walletscan::transport::RetryLayer;
/// use std::time::Duration;
///
/// let layer = RetryLayer::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(200))
///     .max_delay(Duration::from_secs(60))
///     .build();
/// assert_eq!(layer.config().max_retries, 5);
/// ```
#[derive(Clone, Debug)]
pub struct RetryLayer {
    config: Arc<RetryConfig>,
    jitter: JitterSource,
}

impl RetryLayer {
    /// Creates a new retry layer with default settings.
    ///
    /// Default settings:
    /// - 5 retry attempts
    /// - 1s initial delay, factor 2, 10% jitter
    /// - 60s maximum delay
    /// - retries on 408, 429, 500, 502, 503, 504 and network failures
    pub fn new() -> Self {
        Self::from_config(RetryConfig::default())
    }

    /// Creates a retry layer from an explicit configuration.
    pub fn from_config(config: RetryConfig) -> Self {
        Self {
            config: Arc::new(config),
            jitter: JitterSource::random(),
        }
    }

    /// Creates a builder for customizing retry configuration.
    pub fn builder() -> RetryLayerBuilder {
        RetryLayerBuilder::new()
    }

    /// Creates a retry layer with a specific number of retries.
    ///
    /// ```rust
    /// use walletscan::transport::RetryLayer;
    ///
    /// let layer = RetryLayer::with_max_retries(2);
    /// assert_eq!(layer.config().max_retries, 2);
    /// ```
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self::from_config(RetryConfig {
            max_retries,
            ..Default::default()
        })
    }

    /// Conservative preset for shared public endpoints: 3 retries, 2s initial
    /// delay, 120s cap, 20% jitter.
    pub fn conservative() -> Self {
        Self::from_config(RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            jitter_fraction: 0.2,
            ..Default::default()
        })
    }

    /// Replaces the jitter source (for deterministic tests).
    pub fn with_jitter(mut self, jitter: JitterSource) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl Default for RetryLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RetryService {
            service,
            config: self.config.clone(),
            jitter: self.jitter.clone(),
        }
    }
}

/// Builder for configuring a [`RetryLayer`].
#[derive(Clone, Debug, Default)]
pub struct RetryLayerBuilder {
    config: RetryConfig,
    jitter: Option<JitterSource>,
}

impl RetryLayerBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retry attempts (not including the initial request).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Sets the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.config.initial_delay = delay;
        self
    }

    /// Sets the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn factor(mut self, factor: f64) -> Self {
        self.config.factor = factor;
        self
    }

    /// Sets the jitter fraction.
    pub fn jitter_fraction(mut self, fraction: f64) -> Self {
        self.config.jitter_fraction = fraction;
        self
    }

    /// Replaces the retryable status set.
    pub fn retryable_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.config.retryable_statuses = statuses.into_iter().collect();
        self
    }

    /// Sets the budget of hinted rate-limit waits.
    pub fn max_rate_limit_waits(mut self, waits: u32) -> Self {
        self.config.max_rate_limit_waits = waits;
        self
    }

    /// Uses a specific jitter source instead of the RNG.
    pub fn jitter(mut self, jitter: JitterSource) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Builds the configured [`RetryLayer`].
    pub fn build(self) -> RetryLayer {
        RetryLayer {
            config: Arc::new(self.config),
            jitter: self.jitter.unwrap_or_default(),
        }
    }
}

/// A Tower service that adds retry logic with exponential backoff.
///
/// Its error type is [`ApiError`]: by the time an error leaves this service
/// the retry policy has been fully applied.
#[derive(Clone, Debug)]
pub struct RetryService<S> {
    service: S,
    config: Arc<RetryConfig>,
    jitter: JitterSource,
}

impl<S> tower::Service<ApiRequest> for RetryService<S>
where
    S: tower::Service<ApiRequest, Response = ApiResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ApiResponse;
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Readiness of the inner service is awaited per attempt in `call`
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();
        let jitter = self.jitter.clone();

        Box::pin(async move {
            let endpoint = request.label().to_string();
            let mut state = RetryState::Pending;
            let mut attempts = 0u32;
            let mut hinted_waits = 0u32;

            loop {
                attempts += 1;
                let mut service = service.clone();

                let result = match poll_fn(|cx| service.poll_ready(cx)).await {
                    Ok(()) => service.call(request.clone()).await,
                    Err(error) => Err(error),
                };

                let error = match result {
                    Ok(response) => {
                        state = state.advance(AttemptOutcome::Success, &config, 0.0);
                        if attempts > 1 {
                            debug!(
                                endpoint = %endpoint,
                                attempts = attempts,
                                retries = state.attempts().saturating_sub(1),
                                status = response.status,
                                "Request succeeded after retry"
                            );
                        }
                        return Ok(response);
                    }
                    Err(error) => error,
                };

                let retryable = config.is_retryable(&error);

                if let (true, Some(hint)) = (retryable, error.hint()) {
                    if hinted_waits >= config.max_rate_limit_waits {
                        warn!(
                            endpoint = %endpoint,
                            waits = hinted_waits,
                            status = ?error.status(),
                            "Rate-limit wait budget exhausted"
                        );
                        return Err(ApiError::RateLimited {
                            endpoint,
                            waits: hinted_waits,
                        });
                    }
                    hinted_waits += 1;
                    let wait = hint.wait_from(Utc::now());
                    warn!(
                        endpoint = %endpoint,
                        attempt = attempts,
                        status = ?error.status(),
                        delay_ms = wait.as_millis() as u64,
                        hinted_waits = hinted_waits,
                        "Rate limited, honoring upstream hint"
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }

                let outcome = if retryable {
                    AttemptOutcome::RetryableFailure
                } else {
                    AttemptOutcome::FatalFailure
                };
                state = state.advance(outcome, &config, jitter.sample());

                match state {
                    RetryState::Retrying { attempt, delay } => {
                        warn!(
                            endpoint = %endpoint,
                            error = %error,
                            attempt = attempts,
                            retry = attempt,
                            max_retries = config.max_retries,
                            status = ?error.status(),
                            delay_ms = delay.as_millis() as u64,
                            "Retryable error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    _ => {
                        if retryable {
                            warn!(
                                endpoint = %endpoint,
                                error = %error,
                                attempts = attempts,
                                "Max retries exceeded"
                            );
                        } else {
                            debug!(
                                endpoint = %endpoint,
                                error = %error,
                                status = ?error.status(),
                                "Non-retryable error, not retrying"
                            );
                        }
                        return Err(into_api_error(error, endpoint, attempts));
                    }
                }
            }
        })
    }
}

/// Converts the last attempt's failure into the caller-facing error.
fn into_api_error(error: TransportError, endpoint: String, attempts: u32) -> ApiError {
    match error {
        TransportError::Network { details, timeout } => ApiError::Network {
            endpoint,
            attempts,
            timeout,
            details,
        },
        TransportError::Http { status, body, .. } => ApiError::Http {
            endpoint,
            status,
            body,
        },
        TransportError::Rpc { code, message } => ApiError::Rpc {
            method: endpoint,
            code,
            message,
        },
        TransportError::Decode(details) => ApiError::Decode { endpoint, details },
        TransportError::InvalidRequest(details) => ApiError::InvalidRequest { endpoint, details },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RateLimitHint;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tower::Service;

    /// Service that replays a fixed script of outcomes and counts calls.
    #[derive(Clone)]
    struct Scripted {
        script: Arc<Mutex<VecDeque<Result<ApiResponse, TransportError>>>>,
        calls: Arc<Mutex<Vec<tokio::time::Instant>>>,
    }

    impl Scripted {
        fn new(script: Vec<Result<ApiResponse, TransportError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn call_times(&self) -> Vec<tokio::time::Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl tower::Service<ApiRequest> for Scripted {
        type Response = ApiResponse;
        type Error = TransportError;
        type Future = std::future::Ready<Result<ApiResponse, TransportError>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _req: ApiRequest) -> Self::Future {
            self.calls.lock().unwrap().push(tokio::time::Instant::now());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::InvalidRequest("script exhausted".into())));
            std::future::ready(next)
        }
    }

    fn ok() -> Result<ApiResponse, TransportError> {
        Ok(ApiResponse {
            status: 200,
            body: json!({"ok": true}),
        })
    }

    fn http(status: u16) -> Result<ApiResponse, TransportError> {
        Err(TransportError::Http {
            status,
            body: format!("status {status}"),
            hint: None,
        })
    }

    fn hinted(secs: u64) -> Result<ApiResponse, TransportError> {
        Err(TransportError::Http {
            status: 429,
            body: "slow down".into(),
            hint: Some(RateLimitHint::After(Duration::from_secs(secs))),
        })
    }

    fn layer(max_retries: u32) -> RetryLayer {
        RetryLayer::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .jitter(JitterSource::fixed(0.0))
            .build()
    }

    fn request() -> ApiRequest {
        ApiRequest::rest("account/detail", vec![])
    }

    #[test]
    fn test_retry_layer_default() {
        let layer = RetryLayer::new();
        assert_eq!(layer.config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(
            layer.config.initial_delay,
            Duration::from_millis(DEFAULT_INITIAL_DELAY_MS)
        );
        assert_eq!(
            layer.config.max_delay,
            Duration::from_millis(DEFAULT_MAX_DELAY_MS)
        );
        assert!(layer.config.validate().is_ok());
    }

    #[test]
    fn test_retry_layer_builder() {
        let layer = RetryLayer::builder()
            .max_retries(7)
            .factor(3.0)
            .jitter_fraction(0.25)
            .retryable_statuses([503])
            .max_rate_limit_waits(2)
            .build();

        assert_eq!(layer.config.max_retries, 7);
        assert_eq!(layer.config.factor, 3.0);
        assert_eq!(layer.config.jitter_fraction, 0.25);
        assert_eq!(layer.config.retryable_statuses, vec![503]);
        assert_eq!(layer.config.max_rate_limit_waits, 2);
    }

    #[test]
    fn test_retry_layer_conservative() {
        let layer = RetryLayer::conservative();
        assert_eq!(layer.config.max_retries, 3);
        assert_eq!(layer.config.initial_delay, Duration::from_secs(2));
        assert_eq!(layer.config.max_delay, Duration::from_secs(120));
    }

    #[test]
    fn test_validate_rejects_bad_factor_and_jitter() {
        let shrinking = RetryConfig {
            factor: 0.5,
            ..Default::default()
        };
        assert!(shrinking.validate().is_err());

        let wild = RetryConfig {
            jitter_fraction: 1.5,
            ..Default::default()
        };
        assert!(wild.validate().is_err());

        let inverted = RetryConfig {
            initial_delay: Duration::from_secs(90),
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_retryable_classification() {
        let config = RetryConfig::default();
        assert!(config.is_retryable(&TransportError::Network {
            details: "reset".into(),
            timeout: false
        }));
        assert!(config.is_retryable(&http(429).unwrap_err()));
        assert!(config.is_retryable(&http(503).unwrap_err()));
        assert!(!config.is_retryable(&http(404).unwrap_err()));
        assert!(!config.is_retryable(&http(401).unwrap_err()));
        assert!(config.is_retryable(&TransportError::Rpc {
            code: -32005,
            message: "busy".into()
        }));
        assert!(!config.is_retryable(&TransportError::Rpc {
            code: -32602,
            message: "invalid params".into()
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds_with_backoff() {
        let inner = Scripted::new(vec![http(503), http(500), ok()]);
        let mut service = layer(3).layer(inner.clone());

        let response = service.call(request()).await.unwrap();
        assert_eq!(response.status, 200);

        let times = inner.call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_millis(100));
        assert_eq!(times[2] - times[1], Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_fails_immediately_with_body() {
        let inner = Scripted::new(vec![http(404), ok()]);
        let mut service = layer(3).layer(inner.clone());

        let err = service.call(request()).await.unwrap_err();
        match err {
            ApiError::Http {
                status,
                body,
                endpoint,
            } => {
                assert_eq!(status, 404);
                assert_eq!(body, "status 404");
                assert_eq!(endpoint, "account/detail");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(inner.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_surfaces_last_error() {
        let inner = Scripted::new(vec![
            Err(TransportError::Network {
                details: "timed out".into(),
                timeout: true,
            });
            4
        ]);
        let mut service = layer(2).layer(inner.clone());

        let err = service.call(request()).await.unwrap_err();
        match err {
            ApiError::Network {
                attempts, timeout, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(inner.call_times().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_is_honored_and_does_not_consume_retry() {
        // max_retries = 0: any computed retry would fail, so success proves the
        // hinted attempts were not charged to the retry budget.
        let inner = Scripted::new(vec![hinted(5), hinted(3), ok()]);
        let mut service = layer(0).layer(inner.clone());

        assert!(service.call(request()).await.is_ok());

        let times = inner.call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_secs(5));
        assert!(times[2] - times[1] >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_budget_exhaustion() {
        let inner = Scripted::new(vec![hinted(1), hinted(1), hinted(1)]);
        let layer = RetryLayer::builder()
            .max_rate_limit_waits(2)
            .jitter(JitterSource::fixed(0.0))
            .build();
        let mut service = layer.layer(inner.clone());

        let err = service.call(request()).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { waits: 2, .. }));
        assert_eq!(inner.call_times().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_on_non_retryable_status_is_ignored() {
        let inner = Scripted::new(vec![Err(TransportError::Http {
            status: 403,
            body: "forbidden".into(),
            hint: Some(RateLimitHint::After(Duration::from_secs(60))),
        })]);
        let mut service = layer(3).layer(inner.clone());

        let err = service.call(request()).await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert_eq!(inner.call_times().len(), 1);
    }
}
