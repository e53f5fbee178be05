// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Append-only error ledger.
//!
//! Validation failures and isolated stage/endpoint failures are recorded here so
//! that an operator can see what degraded after a run completes. A ledger is
//! constructed once (usually in [`bootstrap`](crate::bootstrap)) and passed by
//! reference to the components that write to it:
//!
//! - [`FileErrorLedger`]: `errors.json` on disk, shaped `{ "errors": [...] }`
//! - [`MemoryErrorLedger`]: in-process, for tests and embedding
//!
//! # Examples
//!
//! ```rust
//! use walletscan::ledger::{ErrorLedger, LedgerEntry, MemoryErrorLedger};
//!
//! # tokio_test_block(async {
//! let ledger = MemoryErrorLedger::new();
//! ledger
//!     .record(LedgerEntry::now("bad-address", "invalid characters", "cli", "ValidationError"))
//!     .await
//!     .unwrap();
//! assert_eq!(ledger.entries().await.unwrap().len(), 1);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

mod file;
mod memory;

pub use file::FileErrorLedger;
pub use memory::MemoryErrorLedger;

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub address: String,
    pub message: String,
    /// Component that observed the failure (e.g. `"collector.portfolio"`)
    pub source: String,
    /// Failure category (e.g. `"ValidationError"`, `"StageError"`)
    #[serde(rename = "type")]
    pub kind: String,
}

impl LedgerEntry {
    /// Creates an entry stamped with the current time.
    pub fn now(
        address: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            address: address.into(),
            message: message.into(),
            source: source.into(),
            kind: kind.into(),
        }
    }
}

/// On-disk ledger document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub errors: Vec<LedgerEntry>,
}

/// Trait for error ledger backends.
///
/// Implementations must be safe to share between concurrently running
/// collection tasks.
#[async_trait]
pub trait ErrorLedger: Send + Sync {
    /// Appends an entry.
    async fn record(&self, entry: LedgerEntry) -> Result<(), LedgerError>;

    /// Returns all entries in insertion order.
    async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;
}
