// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Span creation helpers for walletscan operations.
//!
//! Telemetry is kept apart from business logic: instead of `#[instrument]`
//! attributes, each instrumented operation has a span helper here and wraps
//! its future with [`tracing::Instrument`].
//!
//! Usage pattern:
//! ```rust,ignore
//! pub async fn my_operation(&self, address: &Address) -> Result<T> {
//!     async move {
//!         // Business logic here
//!     }
//!     .instrument(spans::my_operation(address))
//!     .await
//! }
//! ```

use tracing::{Level, Span};

use crate::address::Address;

/// Create span for collecting every endpoint of one address.
///
/// Parent: None (root span for a collection run)
/// Children: fetch_all_pages, one event per endpoint
#[inline]
pub(crate) fn collect(address: &Address, force_refresh: bool, concurrency: usize) -> Span {
    tracing::span!(
        Level::INFO,
        "walletscan.collect",
        address = %address,
        force_refresh = force_refresh,
        concurrency = concurrency,
    )
}

/// Create span for walking the transaction pages of an address.
///
/// Parent: collect span (or None when called directly)
#[inline]
pub(crate) fn fetch_all_pages(address: &Address, source: &str, resumed: bool) -> Span {
    tracing::span!(
        Level::INFO,
        "walletscan.fetch_all_pages",
        address = %address,
        source = source,
        resumed = resumed,
    )
}

/// Create span for fetching one page.
///
/// Parent: fetch_all_pages span
#[inline]
pub(crate) fn fetch_page(page_number: usize, before: Option<&str>) -> Span {
    tracing::debug_span!(
        "walletscan.fetch_page",
        page_number = page_number,
        before = before.unwrap_or("<newest>"),
    )
}

/// Create span for one analyzer run.
///
/// Parent: analysis_pipeline span
#[inline]
pub(crate) fn analysis_stage(address: &Address, stage: &str) -> Span {
    tracing::span!(
        Level::INFO,
        "walletscan.analysis_stage",
        address = %address,
        stage = stage,
    )
}

/// Create span for a whole pipeline run.
///
/// Parent: None
/// Children: analysis_stage spans (one per analyzer)
#[inline]
pub(crate) fn analysis_pipeline(address: &Address, stages: usize) -> Span {
    tracing::span!(
        Level::INFO,
        "walletscan.analysis_pipeline",
        address = %address,
        stages = stages,
    )
}

/// Create span for building the consolidated report.
#[inline]
pub(crate) fn aggregate(address: &Address) -> Span {
    tracing::span!(Level::INFO, "walletscan.aggregate", address = %address)
}
