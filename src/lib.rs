// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Batch analysis of Solana wallet activity.
//!
//! One run takes one address through:
//!
//! 1. [`validate_and_log`]: hard gate, failures recorded in the error ledger
//! 2. [`DataCollector::collect`]: DeFi activities (mandatory) plus token
//!    accounts, portfolio, transaction pages and balance changes (optional,
//!    fetched concurrently, failures isolated)
//! 3. [`AnalysisPipeline::run`]: token movements, platforms, time, special
//!    tokens and USD estimates, each a separate artifact
//! 4. [`ReportAggregator::aggregate`]: every artifact folded into one
//!    [`ConsolidatedReport`], with defaults for whatever is missing
//!
//! All upstream calls go through [`ApiClient`], a tower stack with a token
//! bucket, exponential backoff with jitter and `Retry-After` handling.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use walletscan::analysis::{AnalysisContext, ApiPriceSource};
//! use walletscan::ledger::FileErrorLedger;
//! use walletscan::store::DiskArtifactStore;
//! use walletscan::{
//!     Address, AnalysisPipeline, ApiClient, CollectOptions, DataCollector, ReportAggregator,
//!     WalletscanConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WalletscanConfig::from_env()?;
//! let address = Address::parse("GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S")?;
//!
//! let client = ApiClient::from_config(&config)?;
//! let store = Arc::new(DiskArtifactStore::new(&config.data_dir));
//! let ledger = Arc::new(FileErrorLedger::in_dir(&config.data_dir));
//!
//! DataCollector::from_config(&config, client.clone(), store.clone(), ledger.clone())
//!     .collect(&address, &CollectOptions::from_config(&config))
//!     .await?;
//!
//! let ctx = AnalysisContext::new(store.clone(), ledger, Arc::new(ApiPriceSource::new(client)));
//! AnalysisPipeline::with_default_stages(ctx).run(&address).await;
//!
//! let report = ReportAggregator::new(store).aggregate_and_save(&address).await?;
//! println!("{} sections available", report.sections_available.len());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod analysis;
pub mod api;
pub mod bootstrap;
pub mod collector;
pub mod config;
pub mod config_types;
pub mod errors;
pub mod ledger;
pub mod pages;
pub mod report;
pub mod store;
pub mod transport;

mod tracing;

pub use address::{validate, validate_and_log, Address, OnInvalid, ValidationOutcome};
pub use analysis::{AnalysisContext, AnalysisPipeline, PipelineRun};
pub use api::ApiClient;
pub use collector::{CollectOptions, CollectedBundle, DataCollector, OptionalEndpoint};
pub use config::{TransactionSourceKind, WalletscanConfig, WalletscanConfigBuilder};
pub use config_types::{MaxPages, PageSize};
pub use errors::*;
pub use pages::TransactionPageStore;
pub use report::{ConsolidatedReport, ReportAggregator};
