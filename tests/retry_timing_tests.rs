// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Timing tests for backoff, rate-limit hints and the token bucket
//!
//! Run on a paused tokio clock, so sleeps complete instantly while
//! `Instant::now()` still advances by the slept amount.

mod helpers;

use std::time::Duration;

use helpers::{network_error, rest_ok, ScriptedTransport, ADDRESS};
use serde_json::json;
use tokio::time::Instant;
use walletscan::transport::{
    JitterSource, RateLimitHint, RateLimitLayer, RetryLayer, TransportError,
};
use walletscan::{Address, ApiClient, ApiError};

fn retry(max_retries: u32) -> RetryLayer {
    RetryLayer::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_secs(1))
        .max_delay(Duration::from_secs(60))
        .factor(2.0)
        .jitter(JitterSource::fixed(0.0))
        .build()
}

fn rate_limited(after: Duration) -> TransportError {
    TransportError::Http {
        status: 429,
        body: "Too Many Requests".to_string(),
        hint: Some(RateLimitHint::After(after)),
    }
}

fn address() -> Address {
    Address::parse(ADDRESS).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let transport = ScriptedTransport::new(|_, call| match call {
        0 | 1 => Err(network_error()),
        _ => rest_ok(json!({})),
    });
    let client = ApiClient::new(transport.clone(), retry(3), RateLimitLayer::disabled());

    let start = Instant::now();
    client.account_detail(&address()).await.unwrap();

    assert_eq!(transport.calls(), 3);
    // 1s, then 2s
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_max_retries() {
    let transport = ScriptedTransport::new(|_, _| Err(network_error()));
    let client = ApiClient::new(transport.clone(), retry(2), RateLimitLayer::disabled());

    let err = client.account_detail(&address()).await.unwrap_err();

    assert_eq!(transport.calls(), 3);
    match err {
        ApiError::Network { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_hint_is_honored_without_consuming_a_retry() {
    let transport = ScriptedTransport::new(|_, call| match call {
        0 => Err(rate_limited(Duration::from_secs(30))),
        _ => rest_ok(json!({})),
    });
    // No retries at all: only the hint budget allows the second attempt
    let client = ApiClient::new(transport.clone(), retry(0), RateLimitLayer::disabled());

    let start = Instant::now();
    client.account_detail(&address()).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_hint_budget_is_bounded() {
    let transport = ScriptedTransport::new(|_, _| Err(rate_limited(Duration::from_secs(1))));
    let retry = RetryLayer::builder()
        .max_retries(5)
        .max_rate_limit_waits(3)
        .jitter(JitterSource::fixed(0.0))
        .build();
    let client = ApiClient::new(transport.clone(), retry, RateLimitLayer::disabled());

    let err = client.account_detail(&address()).await.unwrap_err();

    assert!(matches!(err, ApiError::RateLimited { waits: 3, .. }));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_token_bucket_spaces_requests() {
    let transport = ScriptedTransport::new(|_, _| rest_ok(json!({})));
    let client = ApiClient::new(
        transport.clone(),
        retry(0),
        RateLimitLayer::new(2, Duration::from_secs(1)),
    );

    let start = Instant::now();
    for _ in 0..6 {
        client.account_detail(&address()).await.unwrap();
    }

    assert_eq!(transport.calls(), 6);
    // Two free requests, then one every 500ms
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(1_990), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(2_100), "{elapsed:?}");
}
