// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the reqwest transport against a mock HTTP server

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use walletscan::transport::{HttpTransport, JitterSource, RateLimitLayer, RetryLayer};
use walletscan::{Address, ApiClient, ApiError, PageSize};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";
const API_KEY: &str = "test-key";

fn client(server: &MockServer, max_retries: u32) -> ApiClient {
    client_with_timeout(server, max_retries, Duration::from_secs(5))
}

fn client_with_timeout(server: &MockServer, max_retries: u32, timeout: Duration) -> ApiClient {
    let rest_base = Url::parse(&format!("{}/v2.0/", server.uri())).unwrap();
    let rpc_url = Url::parse(&format!("{}/rpc", server.uri())).unwrap();
    let transport =
        HttpTransport::new(rest_base, rpc_url, Some(API_KEY.to_string()), timeout)
            .unwrap();
    let retry = RetryLayer::builder()
        .max_retries(max_retries)
        .initial_delay(Duration::from_millis(10))
        .max_delay(Duration::from_millis(50))
        .jitter(JitterSource::fixed(0.0))
        .build();
    ApiClient::new(Arc::new(transport), retry, RateLimitLayer::disabled())
}

fn address() -> Address {
    Address::parse(ADDRESS).unwrap()
}

#[tokio::test]
async fn test_rest_sends_token_header_and_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .and(header("token", API_KEY))
        .and(query_param("address", ADDRESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"account": ADDRESS, "lamports": 42}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let detail = client(&server, 0).account_detail(&address()).await.unwrap();

    assert_eq!(detail["lamports"], 42);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/portfolio"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"success\":false}"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3).portfolio(&address()).await.unwrap_err();

    match err {
        ApiError::Http { status, body, endpoint } => {
            assert_eq!(status, 404);
            assert_eq!(body, "{\"success\":false}");
            assert_eq!(endpoint, "account/portfolio");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server, 2).account_detail(&address()).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_transfers_page_query_and_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/transfer"))
        .and(header("token", API_KEY))
        .and(query_param("address", ADDRESS))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "100"))
        .and(query_param("sort_by", "block_time"))
        .and(query_param("sort_order", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [
                {"trans_id": "sig-a", "amount": 5, "flow": "in"},
                {"trans_id": "sig-b", "amount": 7, "flow": "out"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transfers = client(&server, 0)
        .transfers(&address(), 2, PageSize::DEFAULT)
        .await
        .unwrap();

    assert_eq!(transfers.len(), 2);
    assert_eq!(transfers[1]["trans_id"], "sig-b");
}

/// A 429 with `Retry-After` is waited out without spending a retry
#[tokio::test]
async fn test_retry_after_is_honored_without_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let start = std::time::Instant::now();
    let result = client(&server, 0).account_detail(&address()).await;

    assert!(result.is_ok(), "{result:?}");
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_timeout_is_a_retryable_network_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2.0/account/detail"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": true, "data": {}}))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let err = client_with_timeout(&server, 1, Duration::from_millis(200))
        .account_detail(&address())
        .await
        .unwrap_err();

    match err {
        ApiError::Network {
            attempts, timeout, ..
        } => {
            assert_eq!(attempts, 2);
            assert!(timeout);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rpc_error_object_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .and(body_partial_json(json!({"jsonrpc": "2.0", "method": "getTransaction"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "Invalid param: WrongSize"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3).get_transaction("not-a-signature").await.unwrap_err();

    match err {
        ApiError::Rpc { method, code, message } => {
            assert_eq!(method, "getTransaction");
            assert_eq!(code, -32602);
            assert!(message.contains("WrongSize"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rpc_result_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": null
        })))
        .mount(&server)
        .await;

    let tx = client(&server, 0).get_transaction("unknown").await.unwrap();

    assert!(tx.is_none());
}
