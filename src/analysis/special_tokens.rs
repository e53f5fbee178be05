// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Stablecoins, wrapped SOL, liquid staking and ecosystem tokens.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisContext, Analyzer, StageOutcome, TokenMovements};
use crate::address::Address;
use crate::config::constants::mints::{self, SpecialTokenCategory};
use crate::errors::AnalysisError;
use crate::store::ArtifactKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialTokenEntry {
    pub token: String,
    pub symbol: String,
    pub category: SpecialTokenCategory,
    pub inflow: BigDecimal,
    pub outflow: BigDecimal,
    pub net: BigDecimal,
    pub volume: BigDecimal,
    pub transfers: usize,
    pub swaps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub tokens: usize,
    pub volume: BigDecimal,
}

/// `special_tokens_analysis_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialTokensAnalysis {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    /// Largest volume first
    pub tokens: Vec<SpecialTokenEntry>,
    pub by_category: BTreeMap<SpecialTokenCategory, CategoryTotals>,
    /// Stablecoin inflow plus outflow
    pub stablecoin_volume: BigDecimal,
}

impl SpecialTokensAnalysis {
    pub fn from_movements(address: &Address, movements: &TokenMovements, now: DateTime<Utc>) -> Self {
        let mut tokens: Vec<SpecialTokenEntry> = movements
            .tokens
            .values()
            .filter_map(|flow| {
                let category = mints::category(&flow.token)?;
                Some(SpecialTokenEntry {
                    token: flow.token.clone(),
                    symbol: mints::symbol(&flow.token).unwrap_or("N/A").to_string(),
                    category,
                    inflow: flow.inflow.clone(),
                    outflow: flow.outflow.clone(),
                    net: flow.net.clone(),
                    volume: flow.volume(),
                    transfers: flow.transfers,
                    swaps: flow.swaps,
                })
            })
            .collect();
        tokens.sort_by(|a, b| b.volume.cmp(&a.volume).then_with(|| a.token.cmp(&b.token)));

        let mut by_category: BTreeMap<SpecialTokenCategory, CategoryTotals> = BTreeMap::new();
        for entry in &tokens {
            let totals = by_category.entry(entry.category).or_insert_with(|| CategoryTotals {
                tokens: 0,
                volume: BigDecimal::zero(),
            });
            totals.tokens += 1;
            totals.volume += &entry.volume;
        }

        let stablecoin_volume = by_category
            .get(&SpecialTokenCategory::Stablecoin)
            .map(|totals| totals.volume.clone())
            .unwrap_or_else(BigDecimal::zero);

        Self {
            address: address.to_string(),
            generated_at: now,
            tokens,
            by_category,
            stablecoin_volume,
        }
    }
}

/// Token movements → `special_tokens_analysis`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecialTokenAnalyzer;

#[async_trait]
impl Analyzer for SpecialTokenAnalyzer {
    fn name(&self) -> &'static str {
        "special_tokens"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::SpecialTokens
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::TokenMovements]
    }

    async fn analyze(
        &self,
        ctx: &AnalysisContext,
        address: &Address,
    ) -> Result<StageOutcome, AnalysisError> {
        let Some(movements) = ctx
            .load::<TokenMovements>(ArtifactKind::TokenMovements, address)
            .await?
        else {
            return Ok(StageOutcome::skipped(self.name(), address, self.inputs()));
        };

        let analysis = SpecialTokensAnalysis::from_movements(address, &movements, Utc::now());
        let key = ctx.save(self.output(), address, &analysis).await?;
        Ok(StageOutcome::Written(key))
    }
}
