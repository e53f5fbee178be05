// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Artifact storage backends
//!
//! Every intermediate and final output of a run (collected endpoint data,
//! transaction pages and summaries, analyzer outputs, the report) is a JSON
//! document addressed by a file-name key:
//!
//! - [`DiskArtifactStore`]: one pretty-printed file per key in a directory,
//!   written atomically (default)
//! - [`MemoryArtifactStore`]: a map behind a mutex (for tests)
//!
//! The presence of a key is what the collector treats as "already fetched".
//!
//! # Examples
//!
//! ```rust
//! use walletscan::store::{ArtifactKind, ArtifactStore, MemoryArtifactStore};
//! use walletscan::Address;
//! use std::sync::Arc;
//!
//! # tokio_test_block_on(async {
//! let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
//! let address = Address::parse("GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S").unwrap();
//! let key = ArtifactKind::Portfolio.key(&address);
//!
//! store.put_as(&key, &serde_json::json!({"total_value": 12.5})).await.unwrap();
//! assert!(store.has(&key).await.unwrap());
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::address::Address;
use crate::errors::StoreError;

mod disk;
mod memory;

pub use disk::DiskArtifactStore;
pub use memory::MemoryArtifactStore;

/// Trait for artifact storage backends
///
/// Implementations must be safe to share between concurrently running tasks.
/// Keys are plain file names (no path separators).
#[async_trait]
pub trait ArtifactStore: Send + Sync + fmt::Debug {
    /// Whether an artifact exists under `key`.
    async fn has(&self, key: &str) -> Result<bool, StoreError>;

    /// Reads an artifact, `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes (or overwrites) an artifact.
    async fn put(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    /// Removes an artifact; returns whether it existed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// All keys, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Returns a human-readable name for this backend.
    fn name(&self) -> &'static str;
}

impl dyn ArtifactStore {
    /// Reads and decodes an artifact.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::serialization(key, e)),
            None => Ok(None),
        }
    }

    /// Encodes and writes an artifact.
    pub async fn put_as<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::serialization(key, e))?;
        self.put(key, &value).await
    }
}

/// Rejects keys that could escape the store directory.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
        return Err(StoreError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Per-address artifacts and their file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `activities_detailed_summary_{address}.json`
    ActivitiesSummary,
    /// `token_accounts_{address}.json`
    TokenAccounts,
    /// `portfolio_{address}.json`
    Portfolio,
    /// `balance_changes_{address}.json`
    BalanceChanges,
    /// `{address}-summary.json`
    TransactionSummary,
    /// `token_movements_{address}.json`
    TokenMovements,
    /// `platforms_summary_{address}.json`
    PlatformsSummary,
    /// `time_analysis_{address}.json`
    TimeAnalysis,
    /// `special_tokens_analysis_{address}.json`
    SpecialTokens,
    /// `usd_value_estimates_{address}.json`
    UsdEstimates,
    /// `wallet_report_{address}.json`
    WalletReport,
}

impl ArtifactKind {
    /// Every per-address artifact, in pipeline order.
    pub const ALL: [ArtifactKind; 11] = [
        ArtifactKind::ActivitiesSummary,
        ArtifactKind::TokenAccounts,
        ArtifactKind::Portfolio,
        ArtifactKind::BalanceChanges,
        ArtifactKind::TransactionSummary,
        ArtifactKind::TokenMovements,
        ArtifactKind::PlatformsSummary,
        ArtifactKind::TimeAnalysis,
        ArtifactKind::SpecialTokens,
        ArtifactKind::UsdEstimates,
        ArtifactKind::WalletReport,
    ];

    /// File-name key of this artifact for `address`.
    pub fn key(&self, address: &Address) -> String {
        match self {
            ArtifactKind::TransactionSummary => format!("{address}-summary.json"),
            other => format!("{}_{address}.json", other.prefix()),
        }
    }

    /// Short name used in logs and report bookkeeping.
    pub const fn name(&self) -> &'static str {
        match self {
            ArtifactKind::TransactionSummary => "transaction_summary",
            other => other.prefix(),
        }
    }

    const fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::ActivitiesSummary => "activities_detailed_summary",
            ArtifactKind::TokenAccounts => "token_accounts",
            ArtifactKind::Portfolio => "portfolio",
            ArtifactKind::BalanceChanges => "balance_changes",
            ArtifactKind::TransactionSummary => "summary",
            ArtifactKind::TokenMovements => "token_movements",
            ArtifactKind::PlatformsSummary => "platforms_summary",
            ArtifactKind::TimeAnalysis => "time_analysis",
            ArtifactKind::SpecialTokens => "special_tokens_analysis",
            ArtifactKind::UsdEstimates => "usd_value_estimates",
            ArtifactKind::WalletReport => "wallet_report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";

    #[test]
    fn test_artifact_keys() {
        let address = Address::parse(ADDRESS).unwrap();
        assert_eq!(
            ArtifactKind::ActivitiesSummary.key(&address),
            format!("activities_detailed_summary_{ADDRESS}.json")
        );
        assert_eq!(
            ArtifactKind::TransactionSummary.key(&address),
            format!("{ADDRESS}-summary.json")
        );
        assert_eq!(
            ArtifactKind::UsdEstimates.key(&address),
            format!("usd_value_estimates_{ADDRESS}.json")
        );
        assert_eq!(
            ArtifactKind::WalletReport.key(&address),
            format!("wallet_report_{ADDRESS}.json")
        );
    }

    #[test]
    fn test_keys_are_distinct() {
        let address = Address::parse(ADDRESS).unwrap();
        let mut keys: Vec<String> = ArtifactKind::ALL.iter().map(|k| k.key(&address)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ArtifactKind::ALL.len());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("portfolio_x.json").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("..").is_err());
    }
}
