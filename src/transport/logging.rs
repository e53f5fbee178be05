// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-attempt request logging.
//!
//! Sits directly above the transport, so every attempt the retry layer makes
//! is logged with its latency, including the ones that end up retried.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use tower::Layer;
use tracing::{debug, trace, warn, Instrument};

use super::{ApiRequest, ApiResponse, TransportError};

/// A Tower layer that logs each upstream attempt.
///
/// # Example
///
/// ```rust,ignore
/// use tower::Layer;
/// use walletscan::transport::{LoggingLayer, TransportService};
///
/// let service = LoggingLayer::new().verbose().layer(TransportService::new(transport));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LoggingLayer {
    /// Log request parameters (can be verbose)
    log_requests: bool,
    /// Log response bodies (can be very verbose)
    log_responses: bool,
}

impl LoggingLayer {
    /// Only timing and errors are logged.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_logging(mut self) -> Self {
        self.log_requests = true;
        self
    }

    pub fn with_response_logging(mut self) -> Self {
        self.log_responses = true;
        self
    }

    /// Logs request parameters and response bodies.
    pub fn verbose(mut self) -> Self {
        self.log_requests = true;
        self.log_responses = true;
        self
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, service: S) -> Self::Service {
        LoggingService {
            service,
            log_requests: self.log_requests,
            log_responses: self.log_responses,
        }
    }
}

/// A Tower service that logs requests and responses.
#[derive(Clone, Debug)]
pub struct LoggingService<S> {
    service: S,
    log_requests: bool,
    log_responses: bool,
}

impl<S> tower::Service<ApiRequest> for LoggingService<S>
where
    S: tower::Service<ApiRequest, Response = ApiResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = ApiResponse;
    type Error = TransportError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        let log_requests = self.log_requests;
        let log_responses = self.log_responses;
        let mut service = self.service.clone();
        let label = request.label().to_string();
        let kind = match &request {
            ApiRequest::Rest { .. } => "rest",
            ApiRequest::Rpc { .. } => "rpc",
        };

        let span = tracing::debug_span!(
            "walletscan.upstream_call",
            kind = kind,
            endpoint = %label,
            duration_ms = tracing::field::Empty,
        );

        Box::pin(
            async move {
                let start = Instant::now();

                if log_requests {
                    trace!(request = ?request, "Upstream request");
                } else {
                    debug!("Upstream request: {label}");
                }

                let result = service.call(request).await;
                let duration_ms = start.elapsed().as_millis() as u64;
                tracing::Span::current().record("duration_ms", duration_ms);

                match &result {
                    Ok(response) if log_responses => {
                        trace!(
                            status = response.status,
                            body = %response.body,
                            duration_ms = duration_ms,
                            "Upstream response"
                        );
                    }
                    Ok(response) => {
                        debug!(
                            status = response.status,
                            duration_ms = duration_ms,
                            "Upstream response: {label}"
                        );
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            duration_ms = duration_ms,
                            "Upstream error: {label}"
                        );
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[derive(Clone, Default)]
    struct Echo(Arc<AtomicUsize>);

    impl tower::Service<ApiRequest> for Echo {
        type Response = ApiResponse;
        type Error = TransportError;
        type Future = Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: ApiRequest) -> Self::Future {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match request {
                    ApiRequest::Rest { .. } => Ok(ApiResponse {
                        status: 200,
                        body: json!({"ok": true}),
                    }),
                    ApiRequest::Rpc { .. } => Err(TransportError::Decode("bad".into())),
                }
            })
        }
    }

    #[test]
    fn test_logging_layer_flags() {
        let layer = LoggingLayer::new();
        assert!(!layer.log_requests);
        assert!(!layer.log_responses);

        let layer = LoggingLayer::new().with_request_logging();
        assert!(layer.log_requests);
        assert!(!layer.log_responses);

        let layer = LoggingLayer::new().verbose();
        assert!(layer.log_requests && layer.log_responses);
    }

    #[tokio::test]
    async fn test_logging_service_passes_results_through() {
        use tower::Service;

        let inner = Echo::default();
        let calls = inner.0.clone();
        let mut service = LoggingLayer::new().verbose().layer(inner);

        let ok = service
            .call(ApiRequest::rest("account/detail", Vec::new()))
            .await
            .unwrap();
        assert_eq!(ok.body["ok"], true);

        let err = service
            .call(ApiRequest::rpc("getTransaction", json!([])))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Decode("bad".into()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
