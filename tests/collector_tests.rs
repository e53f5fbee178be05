// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for the data collector
//!
//! Validates cache-by-presence and failure isolation between the mandatory
//! activities fetch and the optional endpoints.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use helpers::{
    http_error, rest_ok, rpc_ok, sample_activities, test_client, ScriptedTransport, ADDRESS,
};
use serde_json::json;
use walletscan::api::Endpoint;
use walletscan::collector::{
    ActivitiesSummary, EndpointListArtifact, PortfolioArtifact,
};
use walletscan::ledger::{ErrorLedger, MemoryErrorLedger};
use walletscan::pages::{source_for, TransactionSummary};
use walletscan::store::{ArtifactKind, ArtifactStore, MemoryArtifactStore};
use walletscan::transport::ApiRequest;
use walletscan::{
    Address, CollectError, CollectOptions, DataCollector, OptionalEndpoint, PageSize,
    TransactionSourceKind,
};

struct Fixture {
    transport: Arc<ScriptedTransport>,
    store: Arc<dyn ArtifactStore>,
    ledger: Arc<MemoryErrorLedger>,
    collector: DataCollector,
}

fn fixture(transport: Arc<ScriptedTransport>) -> Fixture {
    let client = test_client(transport.clone());
    let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
    let ledger = Arc::new(MemoryErrorLedger::new());
    let collector = DataCollector::new(
        client.clone(),
        store.clone(),
        ledger.clone(),
        source_for(TransactionSourceKind::Rpc, client),
        PageSize::DEFAULT,
    );
    Fixture {
        transport,
        store,
        ledger,
        collector,
    }
}

fn address() -> Address {
    Address::parse(ADDRESS).unwrap()
}

/// Answers every endpoint; `portfolio_status` makes the portfolio fail.
fn upstream(portfolio_status: Option<u16>) -> Arc<ScriptedTransport> {
    ScriptedTransport::new(move |request, _| match request {
        ApiRequest::Rpc { .. } => rpc_ok(json!([])),
        ApiRequest::Rest { endpoint, .. } => match endpoint.as_str() {
            "account/defi/activities" => rest_ok(sample_activities()),
            "account/portfolio" => match portfolio_status {
                Some(status) => http_error(status),
                None => rest_ok(json!({"total_value": 1234.5, "tokens": []})),
            },
            "account/token-accounts" | "account/balance_change" => rest_ok(json!([])),
            other => panic!("unexpected endpoint {other}"),
        },
    })
}

async fn peak_optional_calls(concurrency: usize) -> usize {
    let transport = ScriptedTransport::with_latency(Duration::from_millis(100), |request, _| {
        match request {
            ApiRequest::Rpc { .. } => rpc_ok(json!([])),
            ApiRequest::Rest { endpoint, .. } if endpoint == "account/defi/activities" => {
                rest_ok(sample_activities())
            }
            ApiRequest::Rest { endpoint, .. } if endpoint == "account/portfolio" => {
                rest_ok(json!({"total_value": 1234.5, "tokens": []}))
            }
            ApiRequest::Rest { .. } => rest_ok(json!([])),
        }
    });
    let f = fixture(transport.clone());
    let options = CollectOptions {
        concurrency,
        ..CollectOptions::default()
    };

    let bundle = f.collector.collect(&address(), &options).await.unwrap();

    assert!(bundle.is_complete());
    transport.peak_in_flight()
}

#[tokio::test(start_paused = true)]
async fn test_optional_fan_out_is_bounded_by_concurrency() {
    assert_eq!(peak_optional_calls(1).await, 1);
    assert_eq!(peak_optional_calls(3).await, 3);
}

#[tokio::test]
async fn test_collects_every_endpoint() {
    let f = fixture(upstream(None));

    let bundle = f
        .collector
        .collect(&address(), &CollectOptions::default())
        .await
        .unwrap();

    assert!(bundle.is_complete());
    assert!(bundle.from_cache.is_empty());
    assert_eq!(bundle.activities.total_activities, 3);
    assert!(bundle.token_accounts.is_some());
    assert!(bundle.portfolio.is_some());
    assert!(bundle.balance_changes.is_some());
    assert_eq!(bundle.transactions.unwrap().total_transactions, 0);

    for kind in [
        ArtifactKind::ActivitiesSummary,
        ArtifactKind::TokenAccounts,
        ArtifactKind::Portfolio,
        ArtifactKind::BalanceChanges,
        ArtifactKind::TransactionSummary,
    ] {
        assert!(f.store.has(&kind.key(&address())).await.unwrap(), "{kind:?} missing");
    }
}

#[tokio::test]
async fn test_existing_artifacts_make_no_network_calls() {
    let f = fixture(ScriptedTransport::unreachable());
    let address = address();
    let store = &f.store;

    store
        .put_as(
            &ArtifactKind::ActivitiesSummary.key(&address),
            &ActivitiesSummary::new(&address, Vec::new(), Utc::now()),
        )
        .await
        .unwrap();
    store
        .put_as(
            &ArtifactKind::TokenAccounts.key(&address),
            &EndpointListArtifact::new(&address, OptionalEndpoint::TokenAccounts, Vec::new()),
        )
        .await
        .unwrap();
    store
        .put_as(
            &ArtifactKind::BalanceChanges.key(&address),
            &EndpointListArtifact::new(&address, OptionalEndpoint::BalanceChanges, Vec::new()),
        )
        .await
        .unwrap();
    store
        .put_as(
            &ArtifactKind::Portfolio.key(&address),
            &PortfolioArtifact {
                address: ADDRESS.to_string(),
                generated_at: Utc::now(),
                portfolio: json!({}),
            },
        )
        .await
        .unwrap();
    store
        .put_as(
            &ArtifactKind::TransactionSummary.key(&address),
            &TransactionSummary::new(&address),
        )
        .await
        .unwrap();

    let bundle = f
        .collector
        .collect(&address, &CollectOptions::default())
        .await
        .unwrap();

    assert_eq!(f.transport.calls(), 0);
    assert_eq!(bundle.from_cache.len(), 5);
    assert!(bundle.is_complete());
}

#[tokio::test]
async fn test_force_refresh_ignores_existing_artifacts() {
    let f = fixture(upstream(None));
    let options = CollectOptions::default().force_refresh(true);

    f.collector.collect(&address(), &options).await.unwrap();
    let before = f.transport.calls();
    f.collector.collect(&address(), &options).await.unwrap();

    assert!(f.transport.calls() > before);
    assert_eq!(f.transport.calls_to(Endpoint::DefiActivities.path()), 2);
}

#[tokio::test]
async fn test_optional_failure_is_isolated_and_ledgered() {
    let f = fixture(upstream(Some(403)));

    let bundle = f
        .collector
        .collect(&address(), &CollectOptions::default())
        .await
        .unwrap();

    assert!(bundle.portfolio.is_none());
    assert!(bundle.token_accounts.is_some());
    assert!(bundle.transactions.is_some());
    assert_eq!(bundle.failures.len(), 1);
    assert_eq!(bundle.failures[0].endpoint, OptionalEndpoint::Portfolio);
    assert!(bundle.failures[0].message.contains("403"));
    // 403 is not retried
    assert_eq!(f.transport.calls_to(Endpoint::Portfolio.path()), 1);

    let entries = f.ledger.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "collector.portfolio");
    assert_eq!(entries[0].kind, "EndpointError");
    assert_eq!(entries[0].address, ADDRESS);
}

#[tokio::test]
async fn test_activities_failure_aborts_collection() {
    let transport = ScriptedTransport::new(|request, _| match request.label() {
        "account/defi/activities" => http_error(401),
        other => panic!("optional endpoint {other} called after mandatory failure"),
    });
    let f = fixture(transport);

    let err = f
        .collector
        .collect(&address(), &CollectOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Activities { .. }));
    let entries = f.ledger.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, "ActivitiesError");
}

#[tokio::test]
async fn test_selected_endpoints_only() {
    let f = fixture(upstream(None));
    let options = CollectOptions::default().with_endpoints([OptionalEndpoint::Portfolio]);

    let bundle = f.collector.collect(&address(), &options).await.unwrap();

    assert!(bundle.portfolio.is_some());
    assert!(bundle.token_accounts.is_none());
    assert!(bundle.transactions.is_none());
    assert_eq!(f.transport.calls_to("getSignaturesForAddress"), 0);
}
