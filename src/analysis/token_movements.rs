// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Per-token inflow and outflow from DeFi activities.
//!
//! A swap (`routers` present) is an outflow of `token1` and an inflow of
//! `token2`. A plain transfer is an inflow when the wallet is the
//! recipient and an outflow when it is the sender. Amounts are normalized
//! by the decimals reported with each activity.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{normalize_raw_amount, AnalysisContext, Analyzer, StageOutcome};
use crate::address::Address;
use crate::api::ActivityRecord;
use crate::collector::ActivitiesSummary;
use crate::config::constants::mints;
use crate::errors::AnalysisError;
use crate::store::ArtifactKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Transfer,
    Swap,
}

/// One leg of one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMovement {
    pub signature: String,
    pub block_time: Option<i64>,
    pub token: String,
    pub direction: FlowDirection,
    pub amount: BigDecimal,
    pub kind: MovementKind,
    pub activity_type: String,
}

/// Totals for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenFlow {
    pub token: String,
    pub symbol: Option<String>,
    pub decimals: Option<u32>,
    pub inflow: BigDecimal,
    pub outflow: BigDecimal,
    /// `inflow - outflow`; may be negative
    pub net: BigDecimal,
    pub transfers: usize,
    pub swaps: usize,
}

impl TokenFlow {
    fn new(token: &str, decimals: Option<u32>) -> Self {
        Self {
            token: token.to_string(),
            symbol: mints::symbol(token).map(str::to_string),
            decimals,
            inflow: BigDecimal::zero(),
            outflow: BigDecimal::zero(),
            net: BigDecimal::zero(),
            transfers: 0,
            swaps: 0,
        }
    }

    fn apply(&mut self, movement: &TokenMovement) {
        match movement.direction {
            FlowDirection::In => self.inflow += &movement.amount,
            FlowDirection::Out => self.outflow += &movement.amount,
        }
        match movement.kind {
            MovementKind::Transfer => self.transfers += 1,
            MovementKind::Swap => self.swaps += 1,
        }
        self.net = &self.inflow - &self.outflow;
    }

    /// Inflow plus outflow.
    pub fn volume(&self) -> BigDecimal {
        &self.inflow + &self.outflow
    }
}

/// `token_movements_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMovements {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub total_movements: usize,
    pub swap_count: usize,
    pub transfer_count: usize,
    /// Keyed by mint
    pub tokens: BTreeMap<String, TokenFlow>,
    pub movements: Vec<TokenMovement>,
}

impl TokenMovements {
    pub fn from_activities(address: &Address, activities: &[ActivityRecord], now: DateTime<Utc>) -> Self {
        let mut tokens: BTreeMap<String, TokenFlow> = BTreeMap::new();
        let mut movements = Vec::new();
        let mut swap_count = 0;
        let mut transfer_count = 0;

        for activity in activities {
            let legs = legs(address, activity);
            if legs.is_empty() {
                continue;
            }
            match legs[0].0.kind {
                MovementKind::Swap => swap_count += 1,
                MovementKind::Transfer => transfer_count += 1,
            }
            for (movement, decimals) in legs {
                tokens
                    .entry(movement.token.clone())
                    .or_insert_with(|| TokenFlow::new(&movement.token, decimals))
                    .apply(&movement);
                movements.push(movement);
            }
        }

        Self {
            address: address.to_string(),
            generated_at: now,
            total_movements: movements.len(),
            swap_count,
            transfer_count,
            tokens,
            movements,
        }
    }
}

/// Token legs of one activity, with the decimals they were normalized by.
fn legs(address: &Address, activity: &ActivityRecord) -> Vec<(TokenMovement, Option<u32>)> {
    let leg = |token: &Option<String>, raw: &Option<String>, decimals: Option<u32>, direction, kind| {
        let (token, raw) = (token.as_deref()?, raw.as_deref()?);
        let Some(amount) = normalize_raw_amount(raw, decimals.unwrap_or(0)) else {
            debug!(signature = %activity.trans_id, raw = raw, "Skipping unparsable amount");
            return None;
        };
        Some((
            TokenMovement {
                signature: activity.trans_id.clone(),
                block_time: activity.block_time,
                token: token.to_string(),
                direction,
                amount,
                kind,
                activity_type: activity.activity_type.clone(),
            },
            decimals,
        ))
    };

    if let Some(routers) = &activity.routers {
        return [
            leg(
                &routers.token1,
                &routers.amount1,
                routers.token1_decimals,
                FlowDirection::Out,
                MovementKind::Swap,
            ),
            leg(
                &routers.token2,
                &routers.amount2,
                routers.token2_decimals,
                FlowDirection::In,
                MovementKind::Swap,
            ),
        ]
        .into_iter()
        .flatten()
        .collect();
    }

    let direction = if activity.to_address.as_deref() == Some(address.as_str()) {
        FlowDirection::In
    } else if activity.from_address.as_deref() == Some(address.as_str()) {
        FlowDirection::Out
    } else {
        return Vec::new();
    };

    leg(
        &activity.token_address,
        &activity.amount,
        activity.token_decimals,
        direction,
        MovementKind::Transfer,
    )
    .into_iter()
    .collect()
}

/// Activities → `token_movements`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenMovementAnalyzer;

#[async_trait]
impl Analyzer for TokenMovementAnalyzer {
    fn name(&self) -> &'static str {
        "token_movements"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::TokenMovements
    }

    fn inputs(&self) -> &'static [ArtifactKind] {
        &[ArtifactKind::ActivitiesSummary]
    }

    async fn analyze(
        &self,
        ctx: &AnalysisContext,
        address: &Address,
    ) -> Result<StageOutcome, AnalysisError> {
        let Some(summary) = ctx
            .load::<ActivitiesSummary>(ArtifactKind::ActivitiesSummary, address)
            .await?
        else {
            return Ok(StageOutcome::skipped(self.name(), address, self.inputs()));
        };

        let movements = TokenMovements::from_activities(address, &summary.activities, Utc::now());
        debug!(
            tokens = movements.tokens.len(),
            movements = movements.total_movements,
            "Token movements computed"
        );
        let key = ctx.save(self.output(), address, &movements).await?;
        Ok(StageOutcome::Written(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";
    const OTHER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn activities() -> Vec<ActivityRecord> {
        serde_json::from_value(json!([
            {
                "trans_id": "swap-1",
                "block_time": 1_700_000_300,
                "activity_type": "ACTIVITY_TOKEN_SWAP",
                "routers": {
                    "token1": mints::WSOL, "token1_decimals": 9, "amount1": 2_000_000_000u64,
                    "token2": mints::USDC, "token2_decimals": 6, "amount2": "300000000"
                }
            },
            {
                "trans_id": "in-1",
                "block_time": 1_700_000_200,
                "activity_type": "ACTIVITY_SPL_TRANSFER",
                "from_address": OTHER,
                "to_address": ADDRESS,
                "token_address": mints::USDC,
                "token_decimals": 6,
                "amount": 50_000_000
            },
            {
                "trans_id": "out-1",
                "block_time": 1_700_000_100,
                "activity_type": "ACTIVITY_SPL_TRANSFER",
                "from_address": ADDRESS,
                "to_address": OTHER,
                "token_address": mints::USDC,
                "token_decimals": 6,
                "amount": "400000000"
            },
            {
                "trans_id": "noise",
                "activity_type": "ACTIVITY_SPL_INIT_MINT"
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_swaps_and_transfers_aggregate_per_token() {
        let address = Address::parse(ADDRESS).unwrap();
        let movements = TokenMovements::from_activities(&address, &activities(), Utc::now());

        assert_eq!(movements.total_movements, 4);
        assert_eq!(movements.swap_count, 1);
        assert_eq!(movements.transfer_count, 2);

        let sol = &movements.tokens[mints::WSOL];
        assert_eq!(sol.outflow, dec("2"));
        assert_eq!(sol.inflow, dec("0"));
        assert_eq!(sol.net, dec("-2"));
        assert_eq!(sol.swaps, 1);
        assert_eq!(sol.symbol.as_deref(), Some("wSOL"));

        let usdc = &movements.tokens[mints::USDC];
        assert_eq!(usdc.inflow, dec("350"));
        assert_eq!(usdc.outflow, dec("400"));
        assert_eq!(usdc.net, dec("-50"));
        assert_eq!(usdc.volume(), dec("750"));
        assert_eq!((usdc.transfers, usdc.swaps), (2, 1));
    }

    #[test]
    fn test_unrelated_transfer_is_ignored() {
        let address = Address::parse(OTHER).unwrap();
        let third: Vec<ActivityRecord> = serde_json::from_value(json!([{
            "trans_id": "t",
            "activity_type": "ACTIVITY_SPL_TRANSFER",
            "from_address": ADDRESS,
            "to_address": "So11111111111111111111111111111111111111112",
            "token_address": mints::BONK,
            "amount": "5"
        }]))
        .unwrap();

        let movements = TokenMovements::from_activities(&address, &third, Utc::now());
        assert!(movements.tokens.is_empty());
        assert_eq!(movements.transfer_count, 0);
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let address = Address::parse(ADDRESS).unwrap();
        let movements = TokenMovements::from_activities(&address, &activities(), Utc::now());
        let json = serde_json::to_value(&movements).unwrap();

        assert!(json["tokens"][mints::USDC]["inflow"].is_string());
        assert_eq!(json["movements"][0]["direction"], "out");
        assert_eq!(json["movements"][0]["kind"], "swap");
    }
}
