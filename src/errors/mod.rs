// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the walletscan library.
//!
//! This module provides strongly-typed errors for all public APIs in walletscan.
//! It follows a hybrid approach:
//!
//! - **Module-specific errors** for fine-grained error handling (`ApiError`,
//!   `StoreError`, etc.)
//! - **Unified error type** (`WalletscanError`) for convenience when you don't need
//!   to distinguish between error sources
//!
//! # Architecture
//!
//! Each major module has its own error type:
//! - [`ValidationError`] - Address validation failures
//! - [`ApiError`] - Upstream REST / JSON-RPC failures after retries
//! - [`StoreError`] - Artifact and page store I/O and serialization failures
//! - [`LedgerError`] - Error ledger persistence failures
//! - [`CollectError`] - Data collection failures
//! - [`AnalysisError`] - Analyzer stage failures
//! - [`ConfigError`] - Invalid configuration
//!
//! # Examples
//!
//! ```rust,ignore
//! use walletscan::{ApiError, ApiClient};
//!
//! match client.fetch(Endpoint::AccountDetail, &params).await {
//!     Ok(body) => println!("{body}"),
//!     Err(ApiError::Http { status, body, .. }) => eprintln!("HTTP {status}: {body}"),
//!     Err(ApiError::RateLimited { waits }) => eprintln!("still limited after {waits} waits"),
//!     Err(e) => eprintln!("other error: {e}"),
//! }
//! ```

mod analysis;
mod api;
mod collect;
mod config;
mod ledger;
mod store;
mod validation;

pub use analysis::AnalysisError;
pub use api::ApiError;
pub use collect::CollectError;
pub use config::ConfigError;
pub use ledger::LedgerError;
pub use store::StoreError;
pub use validation::ValidationError;

/// Unified error type for all walletscan operations.
///
/// All module-specific error types automatically convert to `WalletscanError` via
/// `From` implementations, so you can use `?` to propagate errors naturally.
#[derive(Debug, thiserror::Error)]
pub enum WalletscanError {
    /// Address validation failed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Upstream API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Artifact or page store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error ledger failure.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Data collection failure.
    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    /// Analyzer stage failure.
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
