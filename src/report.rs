// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Consolidated wallet report
//!
//! [`ReportAggregator`] folds every persisted artifact of an address into one
//! [`ConsolidatedReport`]. It never touches the network.
//!
//! Every section is always present. A section whose artifact is absent (or
//! unreadable) carries these defaults:
//!
//! | Kind of field        | Default    |
//! |----------------------|------------|
//! | lists and maps       | empty      |
//! | counts               | `0`        |
//! | dates and names      | `"N/A"`    |
//! | decimal totals       | `"0"`      |
//!
//! `sectionsAvailable` and `sectionsDefaulted` say which is which.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn, Instrument};

use crate::address::Address;
use crate::analysis::{
    PlatformStats, PlatformsSummary, SpecialTokenEntry, SpecialTokensAnalysis, TimeAnalysis,
    TokenFlow, TokenMovements, UsdEstimates,
};
use crate::api::rest::parse_decimal;
use crate::collector::{ActivitiesSummary, EndpointListArtifact, PortfolioArtifact};
use crate::errors::StoreError;
use crate::pages::TransactionSummary;
use crate::store::{ArtifactKind, ArtifactStore};
use crate::tracing::spans;

/// Placeholder for unknown dates and names
pub const NOT_AVAILABLE: &str = "N/A";

/// Tokens listed in the token movements section
const TOP_TOKENS: usize = 10;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(na, |t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewSection {
    pub address: String,
    pub wallet_creation_date: String,
    pub first_activity: String,
    pub last_activity: String,
    pub total_transactions: usize,
    pub total_pages: usize,
    pub total_activities: usize,
    pub last_fetched: String,
}

impl OverviewSection {
    fn new(address: &Address) -> Self {
        Self {
            address: address.to_string(),
            wallet_creation_date: na(),
            first_activity: na(),
            last_activity: na(),
            total_transactions: 0,
            total_pages: 0,
            total_activities: 0,
            last_fetched: na(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesSection {
    pub total_activities: usize,
    pub activity_type_counts: BTreeMap<String, usize>,
    pub first_activity: String,
    pub last_activity: String,
}

impl Default for ActivitiesSection {
    fn default() -> Self {
        Self {
            total_activities: 0,
            activity_type_counts: BTreeMap::new(),
            first_activity: na(),
            last_activity: na(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMovementsSection {
    pub total_movements: usize,
    pub swap_count: usize,
    pub transfer_count: usize,
    pub unique_tokens: usize,
    /// Largest volume first
    pub top_tokens: Vec<TokenFlow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformsSection {
    pub total_platforms: usize,
    pub most_used: String,
    pub platforms: Vec<PlatformStats>,
}

impl Default for PlatformsSection {
    fn default() -> Self {
        Self {
            total_platforms: 0,
            most_used: na(),
            platforms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSection {
    pub first_activity: String,
    pub last_activity: String,
    pub active_days: usize,
    pub average_per_active_day: f64,
    pub busiest_hour: String,
    pub busiest_weekday: String,
    pub longest_inactivity_days: i64,
    pub hour_of_day: Vec<usize>,
    pub day_of_week: Vec<usize>,
    pub monthly: BTreeMap<String, usize>,
}

impl Default for TimeSection {
    fn default() -> Self {
        Self {
            first_activity: na(),
            last_activity: na(),
            active_days: 0,
            average_per_active_day: 0.0,
            busiest_hour: na(),
            busiest_weekday: na(),
            longest_inactivity_days: 0,
            hour_of_day: vec![0; 24],
            day_of_week: vec![0; 7],
            monthly: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialTokensSection {
    pub tokens: Vec<SpecialTokenEntry>,
    pub stablecoin_volume: BigDecimal,
}

impl Default for SpecialTokensSection {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            stablecoin_volume: BigDecimal::zero(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsdSection {
    pub price_source: String,
    pub total_inflow_usd: BigDecimal,
    pub total_outflow_usd: BigDecimal,
    pub net_usd: BigDecimal,
    pub priced_tokens: usize,
    pub unpriced_tokens: Vec<String>,
}

impl Default for UsdSection {
    fn default() -> Self {
        Self {
            price_source: na(),
            total_inflow_usd: BigDecimal::zero(),
            total_outflow_usd: BigDecimal::zero(),
            net_usd: BigDecimal::zero(),
            priced_tokens: 0,
            unpriced_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsSection {
    pub total_value_usd: BigDecimal,
    pub token_account_count: usize,
    pub token_accounts: Vec<Value>,
    pub portfolio: Value,
}

impl Default for HoldingsSection {
    fn default() -> Self {
        Self {
            total_value_usd: BigDecimal::zero(),
            token_account_count: 0,
            token_accounts: Vec::new(),
            portfolio: Value::Object(Default::default()),
        }
    }
}

/// `wallet_report_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedReport {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub overview: OverviewSection,
    pub activities: ActivitiesSection,
    pub token_movements: TokenMovementsSection,
    pub platforms: PlatformsSection,
    pub time_analysis: TimeSection,
    pub special_tokens: SpecialTokensSection,
    pub usd_estimates: UsdSection,
    pub holdings: HoldingsSection,
    pub sections_available: Vec<String>,
    pub sections_defaulted: Vec<String>,
}

impl ConsolidatedReport {
    /// A report with every section defaulted.
    pub fn empty(address: &Address, generated_at: DateTime<Utc>) -> Self {
        Self {
            address: address.to_string(),
            generated_at,
            overview: OverviewSection::new(address),
            activities: ActivitiesSection::default(),
            token_movements: TokenMovementsSection::default(),
            platforms: PlatformsSection::default(),
            time_analysis: TimeSection::default(),
            special_tokens: SpecialTokensSection::default(),
            usd_estimates: UsdSection::default(),
            holdings: HoldingsSection::default(),
            sections_available: Vec::new(),
            sections_defaulted: SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

const SECTIONS: [&str; 8] = [
    "overview",
    "activities",
    "tokenMovements",
    "platforms",
    "timeAnalysis",
    "specialTokens",
    "usdEstimates",
    "holdings",
];

/// Builds consolidated reports from persisted artifacts.
#[derive(Debug, Clone)]
pub struct ReportAggregator {
    store: Arc<dyn ArtifactStore>,
}

impl ReportAggregator {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Folds every available artifact of `address` into a report.
    ///
    /// # Errors
    ///
    /// Fails only if the store cannot be listed. An artifact that cannot be
    /// read or decoded degrades its section with a warning.
    pub async fn aggregate(&self, address: &Address) -> Result<ConsolidatedReport, StoreError> {
        async move {
            let present: BTreeSet<String> = self.store.list().await?.into_iter().collect();
            let load = Loader {
                store: &self.store,
                present: &present,
                address,
            };

            let activities: Option<ActivitiesSummary> = load.get(ArtifactKind::ActivitiesSummary).await;
            let summary: Option<TransactionSummary> = load.get(ArtifactKind::TransactionSummary).await;
            let movements: Option<TokenMovements> = load.get(ArtifactKind::TokenMovements).await;
            let platforms: Option<PlatformsSummary> = load.get(ArtifactKind::PlatformsSummary).await;
            let time: Option<TimeAnalysis> = load.get(ArtifactKind::TimeAnalysis).await;
            let special: Option<SpecialTokensAnalysis> = load.get(ArtifactKind::SpecialTokens).await;
            let usd: Option<UsdEstimates> = load.get(ArtifactKind::UsdEstimates).await;
            let portfolio: Option<PortfolioArtifact> = load.get(ArtifactKind::Portfolio).await;
            let accounts: Option<EndpointListArtifact> = load.get(ArtifactKind::TokenAccounts).await;

            let mut report = ConsolidatedReport::empty(address, Utc::now());
            let mut available = BTreeSet::new();

            if summary.is_some() || activities.is_some() {
                available.insert("overview");
                fold_overview(&mut report.overview, summary.as_ref(), activities.as_ref());
            }
            if let Some(activities) = activities {
                available.insert("activities");
                report.activities = ActivitiesSection {
                    total_activities: activities.total_activities,
                    activity_type_counts: activities.activity_type_counts,
                    first_activity: format_time(activities.first_activity),
                    last_activity: format_time(activities.last_activity),
                };
            }
            if let Some(movements) = movements {
                available.insert("tokenMovements");
                report.token_movements = movements_section(movements);
            }
            if let Some(platforms) = platforms {
                available.insert("platforms");
                report.platforms = PlatformsSection {
                    total_platforms: platforms.total_platforms,
                    most_used: platforms.platforms.first().map_or_else(na, |p| {
                        p.name.clone().unwrap_or_else(|| p.program_id.clone())
                    }),
                    platforms: platforms.platforms,
                };
            }
            if let Some(time) = time {
                available.insert("timeAnalysis");
                report.time_analysis = time_section(time);
            }
            if let Some(special) = special {
                available.insert("specialTokens");
                report.special_tokens = SpecialTokensSection {
                    tokens: special.tokens,
                    stablecoin_volume: special.stablecoin_volume,
                };
            }
            if let Some(usd) = usd {
                available.insert("usdEstimates");
                report.usd_estimates = UsdSection {
                    price_source: usd.price_source,
                    total_inflow_usd: usd.total_inflow_usd,
                    total_outflow_usd: usd.total_outflow_usd,
                    net_usd: usd.net_usd,
                    priced_tokens: usd.tokens.len(),
                    unpriced_tokens: usd.unpriced_tokens,
                };
            }
            if portfolio.is_some() || accounts.is_some() {
                available.insert("holdings");
                fold_holdings(&mut report.holdings, portfolio, accounts);
            }

            report.sections_available = SECTIONS
                .iter()
                .filter(|s| available.contains(*s))
                .map(|s| s.to_string())
                .collect();
            report.sections_defaulted = SECTIONS
                .iter()
                .filter(|s| !available.contains(*s))
                .map(|s| s.to_string())
                .collect();

            debug!(
                available = report.sections_available.len(),
                defaulted = report.sections_defaulted.len(),
                "Report aggregated"
            );
            Ok(report)
        }
        .instrument(spans::aggregate(address))
        .await
    }

    /// Aggregates and writes `wallet_report_{address}.json`.
    pub async fn aggregate_and_save(&self, address: &Address) -> Result<ConsolidatedReport, StoreError> {
        let report = self.aggregate(address).await?;
        let key = ArtifactKind::WalletReport.key(address);
        self.store.put_as(&key, &report).await?;
        info!(
            key = %key,
            defaulted = ?report.sections_defaulted,
            "Wallet report written"
        );
        Ok(report)
    }
}

struct Loader<'a> {
    store: &'a Arc<dyn ArtifactStore>,
    present: &'a BTreeSet<String>,
    address: &'a Address,
}

impl Loader<'_> {
    async fn get<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Option<T> {
        let key = kind.key(self.address);
        if !self.present.contains(&key) {
            return None;
        }
        match self.store.get_as::<T>(&key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Unreadable artifact, using section defaults");
                None
            }
        }
    }
}

fn fold_overview(
    overview: &mut OverviewSection,
    summary: Option<&TransactionSummary>,
    activities: Option<&ActivitiesSummary>,
) {
    if let Some(summary) = summary {
        overview.total_transactions = summary.total_transactions;
        overview.total_pages = summary.total_pages;
        overview.last_fetched = format_time(summary.last_fetched);
        if let Some(created) = &summary.wallet_creation_date {
            overview.wallet_creation_date = created.clone();
        }
    }
    if let Some(activities) = activities {
        overview.total_activities = activities.total_activities;
        overview.first_activity = format_time(activities.first_activity);
        overview.last_activity = format_time(activities.last_activity);
    }
}

fn movements_section(movements: TokenMovements) -> TokenMovementsSection {
    let unique_tokens = movements.tokens.len();
    let mut flows: Vec<TokenFlow> = movements.tokens.into_values().collect();
    flows.sort_by(|a, b| b.volume().cmp(&a.volume()).then_with(|| a.token.cmp(&b.token)));
    flows.truncate(TOP_TOKENS);

    TokenMovementsSection {
        total_movements: movements.total_movements,
        swap_count: movements.swap_count,
        transfer_count: movements.transfer_count,
        unique_tokens,
        top_tokens: flows,
    }
}

/// Index of the largest non-zero bucket; the earliest wins ties.
fn busiest(buckets: &[usize]) -> Option<usize> {
    let max = *buckets.iter().max()?;
    (max > 0).then(|| buckets.iter().position(|&count| count == max))?
}

fn time_section(time: TimeAnalysis) -> TimeSection {
    TimeSection {
        first_activity: format_time(time.first_activity),
        last_activity: format_time(time.last_activity),
        active_days: time.active_days,
        average_per_active_day: time.average_per_active_day,
        busiest_hour: busiest(&time.hour_of_day).map_or_else(na, |h| format!("{h:02}:00")),
        busiest_weekday: busiest(&time.day_of_week)
            .and_then(|d| WEEKDAYS.get(d))
            .map_or_else(na, |d| d.to_string()),
        longest_inactivity_days: time.longest_inactivity.map_or(0, |gap| gap.days),
        hour_of_day: time.hour_of_day,
        day_of_week: time.day_of_week,
        monthly: time.monthly,
    }
}

fn fold_holdings(
    holdings: &mut HoldingsSection,
    portfolio: Option<PortfolioArtifact>,
    accounts: Option<EndpointListArtifact>,
) {
    if let Some(portfolio) = portfolio {
        if let Some(total) = portfolio.portfolio.get("total_value").and_then(parse_decimal) {
            holdings.total_value_usd = total;
        }
        holdings.portfolio = portfolio.portfolio;
    }
    if let Some(accounts) = accounts {
        holdings.token_account_count = accounts.total;
        holdings.token_accounts = accounts.items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArtifactStore;
    use serde_json::json;

    const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";

    #[tokio::test]
    async fn test_empty_store_yields_full_default_report() {
        let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
        let address = Address::parse(ADDRESS).unwrap();

        let report = ReportAggregator::new(store).aggregate(&address).await.unwrap();

        assert!(report.sections_available.is_empty());
        assert_eq!(report.sections_defaulted.len(), 8);
        assert_eq!(report.overview.wallet_creation_date, "N/A");
        assert_eq!(report.platforms.most_used, "N/A");
        assert_eq!(report.time_analysis.hour_of_day, vec![0; 24]);

        let json = serde_json::to_value(&report).unwrap();
        for section in SECTIONS {
            assert!(json.get(section).is_some(), "missing section {section}");
        }
        assert_eq!(json["usdEstimates"]["totalInflowUsd"], "0");
        assert_eq!(json["holdings"]["portfolio"], json!({}));
    }

    #[tokio::test]
    async fn test_malformed_artifact_degrades_only_its_section() {
        let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
        let address = Address::parse(ADDRESS).unwrap();
        store
            .put_as(&ArtifactKind::TimeAnalysis.key(&address), &json!("not an object"))
            .await
            .unwrap();
        store
            .put_as(
                &ArtifactKind::Portfolio.key(&address),
                &json!({
                    "address": ADDRESS,
                    "generatedAt": "2024-01-01T00:00:00Z",
                    "portfolio": {"total_value": 1234.5, "tokens": []}
                }),
            )
            .await
            .unwrap();

        let report = ReportAggregator::new(store.clone())
            .aggregate_and_save(&address)
            .await
            .unwrap();

        assert_eq!(report.sections_available, vec!["holdings"]);
        assert!(report.sections_defaulted.contains(&"timeAnalysis".to_string()));
        assert_eq!(
            report.holdings.total_value_usd,
            "1234.5".parse::<BigDecimal>().unwrap()
        );
        assert!(store
            .has(&ArtifactKind::WalletReport.key(&address))
            .await
            .unwrap());
    }

    #[test]
    fn test_busiest_bucket() {
        assert_eq!(busiest(&[0, 3, 1, 3]), Some(1));
        assert_eq!(busiest(&[0, 0]), None);
        assert_eq!(busiest(&[]), None);
    }
}
