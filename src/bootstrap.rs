// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::analysis::{AnalysisContext, AnalysisPipeline, ApiPriceSource};
use crate::api::ApiClient;
use crate::collector::{CollectOptions, DataCollector};
use crate::config::WalletscanConfig;
use crate::ledger::{ErrorLedger, FileErrorLedger};
use crate::report::ReportAggregator;
use crate::store::{ArtifactStore, DiskArtifactStore};
use crate::{validate_and_log, OnInvalid};

/// Environment variable holding the wallet when no argument is given.
pub const ADDRESS_ENV: &str = "WALLETSCAN_ADDRESS";

/// Picks the wallet from the first argument, falling back to the environment.
///
/// Shell input is trimmed here; [`crate::validate`] itself rejects padding.
fn address_input(arg: Option<String>, env: Option<String>) -> Option<String> {
    arg.or(env)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// Main entry point for the application.
///
/// Expects `.env` to have been loaded by the caller. The wallet is the first
/// command-line argument, or `WALLETSCAN_ADDRESS`. An invalid address is
/// recorded in `errors.json` and exits with code 1.
pub async fn run() -> anyhow::Result<()> {
    let config = WalletscanConfig::from_env().context("invalid configuration")?;

    let raw_address = address_input(std::env::args().nth(1), dotenvy::var(ADDRESS_ENV).ok())
        .with_context(|| format!("usage: walletscan <address> (or set {ADDRESS_ENV})"))?;

    let ledger: Arc<dyn ErrorLedger> = Arc::new(FileErrorLedger::in_dir(&config.data_dir));
    let address = validate_and_log(&raw_address, "cli", ledger.as_ref(), OnInvalid::Exit).await?;

    let store: Arc<dyn ArtifactStore> = Arc::new(DiskArtifactStore::new(&config.data_dir));
    let client = ApiClient::from_config(&config)?;

    info!(
        address = %address,
        data_dir = %config.data_dir.display(),
        source = ?config.transaction_source,
        "Starting wallet analysis"
    );

    let bundle = DataCollector::from_config(&config, client.clone(), store.clone(), ledger.clone())
        .collect(&address, &CollectOptions::from_config(&config))
        .await?;
    if !bundle.is_complete() {
        warn!(
            address = %address,
            failed = bundle.failures.len(),
            "Some optional endpoints failed; see errors.json"
        );
    }

    let ctx = AnalysisContext::new(store.clone(), ledger, Arc::new(ApiPriceSource::new(client)));
    let run = AnalysisPipeline::with_default_stages(ctx).run(&address).await;

    let report = ReportAggregator::new(store).aggregate_and_save(&address).await?;

    info!(
        address = %address,
        stages_written = run.written().len(),
        stages_skipped = run.skipped().len(),
        stages_failed = run.failed().len(),
        sections_available = report.sections_available.len(),
        sections_defaulted = report.sections_defaulted.len(),
        "Wallet report written"
    );

    Ok(())
}
