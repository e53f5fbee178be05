// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-address data collection
//!
//! [`DataCollector::collect`] gathers every endpoint's data for one address
//! and persists each result as an artifact before returning it:
//!
//! | Endpoint         | Required | Artifact                                      |
//! |------------------|----------|-----------------------------------------------|
//! | DeFi activities  | yes      | `activities_detailed_summary_{address}.json`  |
//! | Token accounts   | no       | `token_accounts_{address}.json`               |
//! | Portfolio        | no       | `portfolio_{address}.json`                    |
//! | Transactions     | no       | `{address}-summary.json` + page files         |
//! | Balance changes  | no       | `balance_changes_{address}.json`              |
//!
//! # Cache-by-presence
//!
//! If an endpoint's artifact already exists and `force_refresh` is off, the
//! stored artifact is returned without any network call. There is no TTL;
//! deleting the file (or forcing a refresh) is the only way to re-fetch.
//!
//! # Failure isolation
//!
//! Optional endpoints run concurrently, at most `concurrency` at a time, and
//! every one of them runs to completion. A failed optional endpoint becomes
//! `None` in the [`CollectedBundle`], an entry in `failures`, and a ledger
//! record. A failed activities collection aborts the whole call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn, Instrument};

use crate::address::Address;
use crate::api::{ActivityFilter, ActivityRecord, ApiClient};
use crate::config::WalletscanConfig;
use crate::config_types::{MaxPages, PageSize};
use crate::errors::CollectError;
use crate::ledger::{ErrorLedger, LedgerEntry};
use crate::pages::{source_for, PageSource, TransactionPageStore, TransactionSummary};
use crate::store::{ArtifactKind, ArtifactStore};
use crate::tracing::spans;

/// Endpoints whose failure does not abort a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionalEndpoint {
    TokenAccounts,
    Portfolio,
    Transactions,
    BalanceChanges,
}

impl OptionalEndpoint {
    pub const ALL: [OptionalEndpoint; 4] = [
        OptionalEndpoint::TokenAccounts,
        OptionalEndpoint::Portfolio,
        OptionalEndpoint::Transactions,
        OptionalEndpoint::BalanceChanges,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            OptionalEndpoint::TokenAccounts => "token_accounts",
            OptionalEndpoint::Portfolio => "portfolio",
            OptionalEndpoint::Transactions => "transactions",
            OptionalEndpoint::BalanceChanges => "balance_changes",
        }
    }

    /// Artifact whose presence marks this endpoint as collected.
    pub const fn artifact(&self) -> ArtifactKind {
        match self {
            OptionalEndpoint::TokenAccounts => ArtifactKind::TokenAccounts,
            OptionalEndpoint::Portfolio => ArtifactKind::Portfolio,
            OptionalEndpoint::Transactions => ArtifactKind::TransactionSummary,
            OptionalEndpoint::BalanceChanges => ArtifactKind::BalanceChanges,
        }
    }
}

impl fmt::Display for OptionalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for one [`DataCollector::collect`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectOptions {
    /// Ignore existing artifacts and fetch everything again
    pub force_refresh: bool,
    /// Date, activity type and status filters
    pub filter: ActivityFilter,
    /// Page limit for every paginated endpoint
    pub max_pages: MaxPages,
    /// How many optional endpoints may be in flight at once
    pub concurrency: usize,
    /// Optional endpoints to collect besides activities
    pub endpoints: Vec<OptionalEndpoint>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            filter: ActivityFilter::default(),
            max_pages: MaxPages::UNLIMITED,
            concurrency: crate::config::DEFAULT_COLLECTION_CONCURRENCY,
            endpoints: OptionalEndpoint::ALL.to_vec(),
        }
    }
}

impl CollectOptions {
    /// Options taken from the run configuration, collecting every endpoint.
    pub fn from_config(config: &WalletscanConfig) -> Self {
        Self {
            force_refresh: config.force_refresh,
            filter: ActivityFilter::default(),
            max_pages: config.max_pages,
            concurrency: config.collection_concurrency,
            endpoints: OptionalEndpoint::ALL.to_vec(),
        }
    }

    pub fn with_filter(mut self, filter: ActivityFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_endpoints(mut self, endpoints: impl IntoIterator<Item = OptionalEndpoint>) -> Self {
        self.endpoints = endpoints.into_iter().collect();
        self.endpoints.sort_unstable();
        self.endpoints.dedup();
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }
}

/// `activities_detailed_summary_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesSummary {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub total_activities: usize,
    pub activity_type_counts: BTreeMap<String, usize>,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub activities: Vec<ActivityRecord>,
}

impl ActivitiesSummary {
    pub fn new(address: &Address, activities: Vec<ActivityRecord>, generated_at: DateTime<Utc>) -> Self {
        let mut activity_type_counts = BTreeMap::new();
        for activity in &activities {
            *activity_type_counts
                .entry(activity.activity_type.clone())
                .or_insert(0) += 1;
        }

        let times = || activities.iter().filter_map(ActivityRecord::block_time_utc);
        let first_activity = times().min();
        let last_activity = times().max();

        Self {
            address: address.to_string(),
            generated_at,
            total_activities: activities.len(),
            activity_type_counts,
            first_activity,
            last_activity,
            activities,
        }
    }
}

/// A collected list endpoint: `token_accounts_*` and `balance_changes_*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointListArtifact {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub endpoint: String,
    pub total: usize,
    pub items: Vec<Value>,
}

impl EndpointListArtifact {
    pub fn new(address: &Address, endpoint: OptionalEndpoint, items: Vec<Value>) -> Self {
        Self {
            address: address.to_string(),
            generated_at: Utc::now(),
            endpoint: endpoint.name().to_string(),
            total: items.len(),
            items,
        }
    }
}

/// `portfolio_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioArtifact {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub portfolio: Value,
}

/// An optional endpoint that failed during collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    pub endpoint: OptionalEndpoint,
    pub message: String,
}

/// Everything one collection run produced.
#[derive(Debug, Clone)]
pub struct CollectedBundle {
    pub address: Address,
    pub activities: ActivitiesSummary,
    pub token_accounts: Option<EndpointListArtifact>,
    pub portfolio: Option<PortfolioArtifact>,
    pub transactions: Option<TransactionSummary>,
    pub balance_changes: Option<EndpointListArtifact>,
    /// Optional endpoints that failed, ordered by endpoint
    pub failures: Vec<EndpointFailure>,
    /// Endpoints served from existing artifacts
    pub from_cache: Vec<&'static str>,
}

impl CollectedBundle {
    /// Whether no optional endpoint failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Collected {
    TokenAccounts(EndpointListArtifact),
    Portfolio(PortfolioArtifact),
    Transactions(TransactionSummary),
    BalanceChanges(EndpointListArtifact),
}

/// Collects endpoint data for addresses and persists it.
pub struct DataCollector {
    client: ApiClient,
    store: Arc<dyn ArtifactStore>,
    ledger: Arc<dyn ErrorLedger>,
    source: Arc<dyn PageSource>,
    page_size: PageSize,
}

impl fmt::Debug for DataCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCollector")
            .field("store", &self.store.name())
            .field("ledger", &self.ledger.name())
            .field("source", &self.source.name())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl DataCollector {
    pub fn new(
        client: ApiClient,
        store: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn ErrorLedger>,
        source: Arc<dyn PageSource>,
        page_size: PageSize,
    ) -> Self {
        Self {
            client,
            store,
            ledger,
            source,
            page_size,
        }
    }

    /// Collector using the configured transaction source and page size.
    pub fn from_config(
        config: &WalletscanConfig,
        client: ApiClient,
        store: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn ErrorLedger>,
    ) -> Self {
        let source = source_for(config.transaction_source, client.clone());
        Self::new(client, store, ledger, source, config.page_size)
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Collects activities, then the optional endpoints concurrently.
    ///
    /// # Errors
    ///
    /// Only a failure of the mandatory activities collection is returned,
    /// as [`CollectError::Activities`].
    pub async fn collect(
        &self,
        address: &Address,
        options: &CollectOptions,
    ) -> Result<CollectedBundle, CollectError> {
        let concurrency = options.concurrency.max(1);
        let span = spans::collect(address, options.force_refresh, concurrency);

        async move {
            let mut from_cache = Vec::new();

            let activities = match self.collect_activities(address, options).await {
                Ok((activities, cached)) => {
                    if cached {
                        from_cache.push("activities");
                    }
                    activities
                }
                Err(e) => {
                    error!(address = %address, error = %e, "Mandatory activities collection failed");
                    self.record_failure(address, "collector.activities", "ActivitiesError", &e)
                        .await;
                    return Err(CollectError::activities(address.as_str(), e));
                }
            };

            let mut bundle = CollectedBundle {
                address: address.clone(),
                activities,
                token_accounts: None,
                portfolio: None,
                transactions: None,
                balance_changes: None,
                failures: Vec::new(),
                from_cache,
            };

            let results: Vec<_> = stream::iter(options.endpoints.iter().copied())
                .map(|endpoint| async move {
                    let result = self.collect_optional(endpoint, address, options).await;
                    (endpoint, result)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for (endpoint, result) in results {
                match result {
                    Ok((collected, cached)) => {
                        if cached {
                            bundle.from_cache.push(endpoint.name());
                        }
                        match collected {
                            Collected::TokenAccounts(v) => bundle.token_accounts = Some(v),
                            Collected::Portfolio(v) => bundle.portfolio = Some(v),
                            Collected::Transactions(v) => bundle.transactions = Some(v),
                            Collected::BalanceChanges(v) => bundle.balance_changes = Some(v),
                        }
                    }
                    Err(e) => {
                        warn!(
                            address = %address,
                            endpoint = %endpoint,
                            error = %e,
                            "Optional endpoint failed, continuing without it"
                        );
                        let source = format!("collector.{endpoint}");
                        self.record_failure(address, &source, "EndpointError", &e)
                            .await;
                        bundle.failures.push(EndpointFailure {
                            endpoint,
                            message: e.to_string(),
                        });
                    }
                }
            }
            bundle.failures.sort_by_key(|f| f.endpoint);

            info!(
                address = %address,
                activities = bundle.activities.total_activities,
                failures = bundle.failures.len(),
                cached = bundle.from_cache.len(),
                "Collection finished"
            );
            Ok(bundle)
        }
        .instrument(span)
        .await
    }

    async fn collect_activities(
        &self,
        address: &Address,
        options: &CollectOptions,
    ) -> Result<(ActivitiesSummary, bool), CollectError> {
        let key = ArtifactKind::ActivitiesSummary.key(address);
        if !options.force_refresh {
            if let Some(existing) = self.store.get_as::<ActivitiesSummary>(&key).await? {
                debug!(key = %key, "Using existing activities artifact");
                return Ok((existing, true));
            }
        }

        let activities = self
            .client
            .defi_activities(address, &options.filter, self.page_size, options.max_pages)
            .await?;
        let summary = ActivitiesSummary::new(address, activities, Utc::now());
        self.store.put_as(&key, &summary).await?;

        info!(
            address = %address,
            activities = summary.total_activities,
            types = summary.activity_type_counts.len(),
            "Activities collected"
        );
        Ok((summary, false))
    }

    async fn collect_optional(
        &self,
        endpoint: OptionalEndpoint,
        address: &Address,
        options: &CollectOptions,
    ) -> Result<(Collected, bool), CollectError> {
        let key = endpoint.artifact().key(address);

        if !options.force_refresh {
            if let Some(cached) = self.load_cached(endpoint, &key).await? {
                debug!(key = %key, endpoint = %endpoint, "Using existing artifact");
                return Ok((cached, true));
            }
        }

        let collected = match endpoint {
            OptionalEndpoint::TokenAccounts => {
                let items = self.client.token_accounts(address, options.max_pages).await?;
                let artifact = EndpointListArtifact::new(address, endpoint, items);
                self.store.put_as(&key, &artifact).await?;
                Collected::TokenAccounts(artifact)
            }
            OptionalEndpoint::Portfolio => {
                let artifact = PortfolioArtifact {
                    address: address.to_string(),
                    generated_at: Utc::now(),
                    portfolio: self.client.portfolio(address).await?,
                };
                self.store.put_as(&key, &artifact).await?;
                Collected::Portfolio(artifact)
            }
            OptionalEndpoint::Transactions => {
                // The page store persists pages and the summary itself
                let pages = TransactionPageStore::new(
                    self.store.clone(),
                    self.source.clone(),
                    self.page_size,
                )?
                .with_max_pages(options.max_pages)
                .with_status_filter(options.filter.status);
                Collected::Transactions(pages.fetch_all_pages(address, None).await?)
            }
            OptionalEndpoint::BalanceChanges => {
                let items = self
                    .client
                    .balance_changes(address, &options.filter, self.page_size, options.max_pages)
                    .await?;
                let artifact = EndpointListArtifact::new(address, endpoint, items);
                self.store.put_as(&key, &artifact).await?;
                Collected::BalanceChanges(artifact)
            }
        };

        debug!(endpoint = %endpoint, key = %key, "Endpoint collected");
        Ok((collected, false))
    }

    async fn load_cached(
        &self,
        endpoint: OptionalEndpoint,
        key: &str,
    ) -> Result<Option<Collected>, CollectError> {
        let store = &self.store;
        let cached = match endpoint {
            OptionalEndpoint::TokenAccounts => store
                .get_as::<EndpointListArtifact>(key)
                .await?
                .map(Collected::TokenAccounts),
            OptionalEndpoint::Portfolio => store
                .get_as::<PortfolioArtifact>(key)
                .await?
                .map(Collected::Portfolio),
            OptionalEndpoint::Transactions => store
                .get_as::<TransactionSummary>(key)
                .await?
                .map(Collected::Transactions),
            OptionalEndpoint::BalanceChanges => store
                .get_as::<EndpointListArtifact>(key)
                .await?
                .map(Collected::BalanceChanges),
        };
        Ok(cached)
    }

    async fn record_failure(&self, address: &Address, source: &str, kind: &str, e: &CollectError) {
        let entry = LedgerEntry::now(address.as_str(), e.to_string(), source, kind);
        if let Err(ledger_err) = self.ledger.record(entry).await {
            error!(error = %ledger_err, "Failed to record collection error in ledger");
        }
    }
}
