// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! When a wallet is active. All buckets are UTC.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisContext, Analyzer, StageOutcome};
use crate::address::Address;
use crate::api::ActivityRecord;
use crate::collector::ActivitiesSummary;
use crate::errors::AnalysisError;
use crate::store::ArtifactKind;

/// Longest stretch between two consecutive activities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InactivityGap {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub days: i64,
}

/// `time_analysis_{address}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalysis {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    /// Activities carrying a block time
    pub timed_activities: usize,
    pub first_activity: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    /// 24 buckets, hour 0 first
    pub hour_of_day: Vec<usize>,
    /// 7 buckets, Monday first
    pub day_of_week: Vec<usize>,
    /// Keyed by `YYYY-MM`
    pub monthly: BTreeMap<String, usize>,
    pub active_days: usize,
    pub longest_inactivity: Option<InactivityGap>,
    pub average_per_active_day: f64,
}

impl TimeAnalysis {
    pub fn from_activities(address: &Address, activities: &[ActivityRecord], now: DateTime<Utc>) -> Self {
        let mut times: Vec<DateTime<Utc>> = activities
            .iter()
            .filter_map(ActivityRecord::block_time_utc)
            .collect();
        times.sort_unstable();

        let mut hour_of_day = vec![0; 24];
        let mut day_of_week = vec![0; 7];
        let mut monthly = BTreeMap::new();
        let mut days = BTreeSet::new();

        for t in &times {
            hour_of_day[t.hour() as usize] += 1;
            day_of_week[t.weekday().num_days_from_monday() as usize] += 1;
            *monthly.entry(t.format("%Y-%m").to_string()).or_insert(0) += 1;
            days.insert(t.date_naive());
        }

        let longest_inactivity = times
            .windows(2)
            .map(|pair| (pair[0], pair[1]))
            .max_by_key(|(from, to)| *to - *from)
            .map(|(from, to)| InactivityGap {
                from,
                to,
                days: (to - from).num_days(),
            });

        let average_per_active_day = if days.is_empty() {
            0.0
        } else {
            times.len() as f64 / days.len() as f64
        };

        Self {
            address: address.to_string(),
            generated_at: now,
            timed_activities: times.len(),
            first_activity: times.first().copied(),
            last_activity: times.last().copied(),
            hour_of_day,
            day_of_week,
            monthly,
            active_days: days.len(),
            longest_inactivity,
            average_per_active_day,
        }
    }
}

/// Activities → `time_analysis`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeAnalyzer;

#[async_trait]
impl Analyzer for TimeAnalyzer {
    fn name(&self) -> &'static str {
        "time"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::TimeAnalysis
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

        let analysis = TimeAnalysis::from_activities(address, &summary.activities, Utc::now());
        let key = ctx.save(self.output(), address, &analysis).await?;
        Ok(StageOutcome::Written(key))
    }
}
