// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Token bucket rate limiter as a Tower `Layer`.
//!
//! The bucket is shared by every clone of the layer and its services, so all
//! requests of one client (including retries and the concurrent fetches of the
//! collector) draw from the same budget.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use tokio::{sync::Mutex, time::Instant};
use tower::Layer;
use tracing::trace;

/// A Tower layer that applies rate limiting to requests.
///
/// Tokens are replenished at a fixed rate, and each request consumes one token.
/// If no tokens are available, the request waits until a token becomes available.
///
/// # Example
///
/// ```rust
/// use walletscan::transport::RateLimitLayer;
/// use std::time::Duration;
///
/// // Allow 10 requests per second
/// let layer = RateLimitLayer::new(10, Duration::from_secs(1));
///
/// // Allow 100 requests per minute
/// let layer = RateLimitLayer::new(100, Duration::from_secs(60));
/// ```
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    state: Option<Arc<Mutex<RateLimitState>>>,
}

impl RateLimitLayer {
    /// Creates a new rate limit layer allowing `requests` per `period`.
    ///
    /// Zero requests or a zero period disables limiting.
    pub fn new(requests: u32, period: Duration) -> Self {
        if requests == 0 || period.is_zero() {
            return Self::disabled();
        }
        Self {
            state: Some(Arc::new(Mutex::new(RateLimitState::new(requests, period)))),
        }
    }

    /// Creates a rate limit layer from requests per second.
    ///
    /// ```rust
    /// use walletscan::transport::RateLimitLayer;
    ///
    /// let layer = RateLimitLayer::per_second(5);
    /// assert!(layer.is_enabled());
    /// ```
    pub fn per_second(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(1))
    }

    /// At least `delay` between consecutive requests, no bursts.
    pub fn with_min_delay(delay: Duration) -> Self {
        Self::new(1, delay)
    }

    /// Passes every request straight through.
    pub fn disabled() -> Self {
        Self { state: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            service,
            state: self.state.clone(),
        }
    }
}

/// Internal state for the token bucket rate limiter.
#[derive(Debug)]
struct RateLimitState {
    /// Maximum number of tokens (requests) available
    capacity: u32,
    /// Current number of available tokens
    tokens: f64,
    /// Token replenishment rate (tokens per nanosecond)
    refill_rate: f64,
    /// Last time tokens were refilled
    last_refill: Instant,
}

impl RateLimitState {
    fn new(requests: u32, period: Duration) -> Self {
        let refill_rate = requests as f64 / period.as_nanos() as f64;
        Self {
            capacity: requests,
            tokens: requests as f64,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Try to acquire a token, returning the wait time if not available.
    fn try_acquire(&mut self) -> Option<Duration> {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let needed = 1.0 - self.tokens;
            let wait_nanos = (needed / self.refill_rate).ceil();
            Some(Duration::from_nanos(wait_nanos as u64).max(Duration::from_nanos(1)))
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let new_tokens = elapsed.as_nanos() as f64 * self.refill_rate;

        self.tokens = (self.tokens + new_tokens).min(self.capacity as f64);
        self.last_refill = now;
    }
}

/// A Tower service that applies rate limiting to requests.
#[derive(Clone, Debug)]
pub struct RateLimitService<S> {
    service: S,
    state: Option<Arc<Mutex<RateLimitState>>>,
}

impl<S, Request> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request> + Clone + Send + 'static,
    S::Future: Send,
    Request: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let state = self.state.clone();
        let mut service = self.service.clone();

        Box::pin(async move {
            if let Some(state) = state {
                loop {
                    let wait_time = {
                        let mut state = state.lock().await;
                        state.try_acquire()
                    };

                    match wait_time {
                        None => break,
                        Some(duration) => {
                            trace!(wait_ms = duration.as_millis() as u64, "Waiting for rate limit token");
                            tokio::time::sleep(duration).await;
                        }
                    }
                }
            }

            service.call(request).await
        })
    }
}
