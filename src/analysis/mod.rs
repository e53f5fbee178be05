// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Analyzer stages and the pipeline that runs them
//!
//! Each [`Analyzer`] reads one or more artifacts from the [`ArtifactStore`]
//! and writes exactly one output artifact. A stage whose inputs are absent
//! logs a warning and returns [`StageOutcome::Skipped`] without writing
//! anything.
//!
//! ```text
//! activities_detailed_summary ──┬─> token_movements ──┬─> special_tokens_analysis
//!                               │                     └─> usd_value_estimates
//!                               ├─> platforms_summary
//!                               └─> time_analysis
//! ```
//!
//! [`AnalysisPipeline::run`] executes the stages in order. A failing stage is
//! logged and recorded in the error ledger; the stages after it still run.
//!
//! # Examples
//!
//! ```rust,ignore
//! use walletscan::analysis::{AnalysisContext, AnalysisPipeline, StaticPriceSource};
//!
//! let ctx = AnalysisContext::new(store, ledger, Arc::new(StaticPriceSource::with_stablecoins()));
//! let run = AnalysisPipeline::with_default_stages(ctx).run(&address).await;
//! println!("{} written, {} skipped", run.written().len(), run.skipped().len());
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, info, warn, Instrument};

use crate::address::Address;
use crate::errors::{AnalysisError, StoreError};
use crate::ledger::{ErrorLedger, LedgerEntry};
use crate::store::{ArtifactKind, ArtifactStore};
use crate::tracing::spans;

mod amount;
mod platforms;
mod price;
mod special_tokens;
mod time;
mod token_movements;
mod usd;

pub use amount::normalize_raw_amount;
pub use platforms::{PlatformAnalyzer, PlatformStats, PlatformsSummary};
pub use price::{ApiPriceSource, PriceSource, StaticPriceSource};
pub use special_tokens::{CategoryTotals, SpecialTokenAnalyzer, SpecialTokenEntry, SpecialTokensAnalysis};
pub use time::{InactivityGap, TimeAnalysis, TimeAnalyzer};
pub use token_movements::{
    FlowDirection, MovementKind, TokenFlow, TokenMovement, TokenMovementAnalyzer, TokenMovements,
};
pub use usd::{TokenUsdEstimate, UsdEstimateAnalyzer, UsdEstimates};

/// What a stage did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The output artifact was written under this key.
    Written(String),
    /// Required inputs were absent; nothing was written.
    Skipped { missing: Vec<String> },
}

impl StageOutcome {
    /// Logs the skip and builds the outcome.
    pub fn skipped(stage: &str, address: &Address, missing: &[ArtifactKind]) -> Self {
        let missing: Vec<String> = missing.iter().map(|kind| kind.key(address)).collect();
        warn!(
            stage = stage,
            address = %address,
            missing = ?missing,
            "Required input missing, skipping stage"
        );
        StageOutcome::Skipped { missing }
    }
}

/// Shared handles the analyzers work with.
#[derive(Clone)]
pub struct AnalysisContext {
    pub store: Arc<dyn ArtifactStore>,
    pub ledger: Arc<dyn ErrorLedger>,
    pub prices: Arc<dyn PriceSource>,
}

impl fmt::Debug for AnalysisContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisContext")
            .field("store", &self.store.name())
            .field("ledger", &self.ledger.name())
            .field("prices", &self.prices.name())
            .finish()
    }
}

impl AnalysisContext {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        ledger: Arc<dyn ErrorLedger>,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            store,
            ledger,
            prices,
        }
    }

    /// Loads an input artifact. An artifact that exists but does not decode
    /// is a [`AnalysisError::MalformedInput`].
    pub async fn load<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        address: &Address,
    ) -> Result<Option<T>, AnalysisError> {
        let key = kind.key(address);
        match self.store.get_as::<T>(&key).await {
            Ok(value) => Ok(value),
            Err(StoreError::Serialization { details, .. }) => {
                Err(AnalysisError::malformed_input(key, details))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Writes an output artifact and returns its key.
    pub async fn save<T: Serialize + Sync>(
        &self,
        kind: ArtifactKind,
        address: &Address,
        value: &T,
    ) -> Result<String, AnalysisError> {
        let key = kind.key(address);
        self.store.put_as(&key, value).await?;
        Ok(key)
    }
}

/// One analyzer stage.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stage name for logs, ledger entries and [`PipelineRun`].
    fn name(&self) -> &'static str;

    /// Artifact this stage writes.
    fn output(&self) -> ArtifactKind;

    /// Artifacts this stage reads.
    fn inputs(&self) -> &'static [ArtifactKind];

    async fn analyze(
        &self,
        ctx: &AnalysisContext,
        address: &Address,
    ) -> Result<StageOutcome, AnalysisError>;
}

/// Per-stage result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Written { key: String },
    Skipped { missing: Vec<String> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub status: StageStatus,
}

/// Result of [`AnalysisPipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub address: Address,
    pub started_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

impl PipelineRun {
    fn names(&self, keep: impl Fn(&StageStatus) -> bool) -> Vec<&'static str> {
        self.stages
            .iter()
            .filter(|report| keep(&report.status))
            .map(|report| report.stage)
            .collect()
    }

    pub fn written(&self) -> Vec<&'static str> {
        self.names(|status| matches!(status, StageStatus::Written { .. }))
    }

    pub fn skipped(&self) -> Vec<&'static str> {
        self.names(|status| matches!(status, StageStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> Vec<&'static str> {
        self.names(|status| matches!(status, StageStatus::Failed { .. }))
    }

    pub fn status(&self, stage: &str) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|report| report.stage == stage)
            .map(|report| &report.status)
    }
}

/// Runs analyzer stages sequentially, isolating failures.
pub struct AnalysisPipeline {
    ctx: AnalysisContext,
    stages: Vec<Box<dyn Analyzer>>,
}

impl fmt::Debug for AnalysisPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisPipeline")
            .field("ctx", &self.ctx)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl AnalysisPipeline {
    /// A pipeline with no stages.
    pub fn new(ctx: AnalysisContext) -> Self {
        Self {
            ctx,
            stages: Vec::new(),
        }
    }

    /// The five built-in stages in dependency order.
    pub fn with_default_stages(ctx: AnalysisContext) -> Self {
        Self::new(ctx)
            .with_stage(TokenMovementAnalyzer)
            .with_stage(PlatformAnalyzer)
            .with_stage(TimeAnalyzer)
            .with_stage(SpecialTokenAnalyzer)
            .with_stage(UsdEstimateAnalyzer)
    }

    /// Appends a stage.
    pub fn with_stage(mut self, stage: impl Analyzer + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.ctx
    }

    /// Runs every stage for `address`. Never fails as a whole.
    pub async fn run(&self, address: &Address) -> PipelineRun {
        let started_at = Utc::now();
        let span = spans::analysis_pipeline(address, self.stages.len());

        async move {
            let mut reports = Vec::with_capacity(self.stages.len());

            for stage in &self.stages {
                let outcome = stage
                    .analyze(&self.ctx, address)
                    .instrument(spans::analysis_stage(address, stage.name()))
                    .await;

                let status = match outcome {
                    Ok(StageOutcome::Written(key)) => {
                        info!(stage = stage.name(), key = %key, "Stage wrote artifact");
                        StageStatus::Written { key }
                    }
                    Ok(StageOutcome::Skipped { missing }) => StageStatus::Skipped { missing },
                    Err(e) => {
                        error!(stage = stage.name(), address = %address, error = %e, "Stage failed");
                        self.record_failure(address, stage.name(), &e).await;
                        StageStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                reports.push(StageReport {
                    stage: stage.name(),
                    status,
                });
            }

            let run = PipelineRun {
                address: address.clone(),
                started_at,
                stages: reports,
            };
            info!(
                address = %address,
                written = run.written().len(),
                skipped = run.skipped().len(),
                failed = run.failed().len(),
                "Analysis pipeline finished"
            );
            run
        }
        .instrument(span)
        .await
    }

    async fn record_failure(&self, address: &Address, stage: &str, e: &AnalysisError) {
        let entry = LedgerEntry::now(
            address.as_str(),
            e.to_string(),
            format!("analysis.{stage}"),
            "StageError",
        );
        if let Err(ledger_err) = self.ctx.ledger.record(entry).await {
            error!(error = %ledger_err, "Failed to record stage error in ledger");
        }
    }
}
