// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! USD valuation of token flows at current prices.
//!
//! Each token is priced once. A token without a price, or whose lookup
//! fails, is listed in `unpricedTokens` and contributes nothing to the
//! totals; a failed lookup never fails the stage.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AnalysisContext, Analyzer, PriceSource, StageOutcome, TokenMovements};
use crate::address::Address;
use crate::errors::AnalysisError;
use crate::store::ArtifactKind;

/// Decimal places kept for USD figures
const USD_SCALE: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsdEstimate {
    pub token: String,
    pub symbol: Option<String>,
    pub price: BigDecimal,
    pub inflow_usd: BigDecimal,
    pub outflow_usd: BigDecimal,
    pub net_usd: BigDecimal,
}

/// `usd_value_estimates_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdEstimates {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub price_source: String,
    pub tokens: Vec<TokenUsdEstimate>,
    pub total_inflow_usd: BigDecimal,
    pub total_outflow_usd: BigDecimal,
    pub net_usd: BigDecimal,
    pub unpriced_tokens: Vec<String>,
}

impl UsdEstimates {
    pub async fn estimate(
        address: &Address,
        movements: &TokenMovements,
        prices: &dyn PriceSource,
        now: DateTime<Utc>,
    ) -> Self {
        let mut tokens = Vec::new();
        let mut unpriced_tokens = Vec::new();
        let mut total_inflow = BigDecimal::zero();
        let mut total_outflow = BigDecimal::zero();

        for flow in movements.tokens.values() {
            let price = match prices.usd_price(&flow.token).await {
                Ok(Some(price)) => price,
                Ok(None) => {
                    debug!(token = %flow.token, source = prices.name(), "No price for token");
                    unpriced_tokens.push(flow.token.clone());
                    continue;
                }
                Err(e) => {
                    warn!(token = %flow.token, source = prices.name(), error = %e, "Price lookup failed");
                    unpriced_tokens.push(flow.token.clone());
                    continue;
                }
            };

            let inflow_usd = &flow.inflow * &price;
            let outflow_usd = &flow.outflow * &price;
            total_inflow += &inflow_usd;
            total_outflow += &outflow_usd;

            tokens.push(TokenUsdEstimate {
                token: flow.token.clone(),
                symbol: flow.symbol.clone(),
                net_usd: (&inflow_usd - &outflow_usd).round(USD_SCALE),
                inflow_usd: inflow_usd.round(USD_SCALE),
                outflow_usd: outflow_usd.round(USD_SCALE),
                price,
            });
        }

        Self {
            address: address.to_string(),
            generated_at: now,
            price_source: prices.name().to_string(),
            tokens,
            net_usd: (&total_inflow - &total_outflow).round(USD_SCALE),
            total_inflow_usd: total_inflow.round(USD_SCALE),
            total_outflow_usd: total_outflow.round(USD_SCALE),
            unpriced_tokens,
        }
    }
}

/// Token movements + prices → `usd_value_estimates`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsdEstimateAnalyzer;

#[async_trait]
impl Analyzer for UsdEstimateAnalyzer {
    fn name(&self) -> &'static str {
        "usd_estimates"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::UsdEstimates
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

        let estimates =
            UsdEstimates::estimate(address, &movements, ctx.prices.as_ref(), Utc::now()).await;
        let key = ctx.save(self.output(), address, &estimates).await?;
        Ok(StageOutcome::Written(key))
    }
}
