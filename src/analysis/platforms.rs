// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Which programs a wallet interacts with.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnalysisContext, Analyzer, StageOutcome};
use crate::address::Address;
use crate::api::ActivityRecord;
use crate::collector::ActivitiesSummary;
use crate::config::constants::programs;
use crate::errors::AnalysisError;
use crate::store::ArtifactKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub program_id: String,
    /// Known program name
    pub name: Option<String>,
    pub activity_count: usize,
    pub activity_types: BTreeMap<String, usize>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl PlatformStats {
    fn new(program_id: &str) -> Self {
        Self {
            program_id: program_id.to_string(),
            name: programs::name(program_id).map(str::to_string),
            activity_count: 0,
            activity_types: BTreeMap::new(),
            first_seen: None,
            last_seen: None,
        }
    }

    fn record(&mut self, activity: &ActivityRecord) {
        self.activity_count += 1;
        *self
            .activity_types
            .entry(activity.activity_type.clone())
            .or_insert(0) += 1;
        if let Some(at) = activity.block_time_utc() {
            self.first_seen = Some(self.first_seen.map_or(at, |t| t.min(at)));
            self.last_seen = Some(self.last_seen.map_or(at, |t| t.max(at)));
        }
    }
}

/// `platforms_summary_{address}.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformsSummary {
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub total_platforms: usize,
    /// Activities that named no program
    pub unattributed_activities: usize,
    /// Most used first
    pub platforms: Vec<PlatformStats>,
}

impl PlatformsSummary {
    pub fn from_activities(address: &Address, activities: &[ActivityRecord], now: DateTime<Utc>) -> Self {
        let mut by_program: BTreeMap<&str, PlatformStats> = BTreeMap::new();
        let mut unattributed = 0;

        for activity in activities {
            if activity.platform.is_empty() {
                unattributed += 1;
                continue;
            }
            for program in &activity.platform {
                by_program
                    .entry(program.as_str())
                    .or_insert_with(|| PlatformStats::new(program))
                    .record(activity);
            }
        }

        let mut platforms: Vec<PlatformStats> = by_program.into_values().collect();
        platforms.sort_by(|a, b| {
            b.activity_count
                .cmp(&a.activity_count)
                .then_with(|| a.program_id.cmp(&b.program_id))
        });

        Self {
            address: address.to_string(),
            generated_at: now,
            total_platforms: platforms.len(),
            unattributed_activities: unattributed,
            platforms,
        }
    }
}

/// Activities → `platforms_summary`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformAnalyzer;

#[async_trait]
impl Analyzer for PlatformAnalyzer {
    fn name(&self) -> &'static str {
        "platforms"
    }

    fn output(&self) -> ArtifactKind {
        ArtifactKind::PlatformsSummary
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

        let platforms = PlatformsSummary::from_activities(address, &summary.activities, Utc::now());
        let key = ctx.save(self.output(), address, &platforms).await?;
        Ok(StageOutcome::Written(key))
    }
}
