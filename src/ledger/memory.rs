// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory error ledger

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ErrorLedger, LedgerEntry};
use crate::errors::LedgerError;

/// Error ledger held in process memory.
#[derive(Debug, Default)]
pub struct MemoryErrorLedger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl MemoryErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ErrorLedger for MemoryErrorLedger {
    async fn record(&self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.entries.lock().await.push(entry);
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.entries.lock().await.clone())
    }

    fn name(&self) -> &'static str {
        "MemoryErrorLedger"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_ledger_preserves_order() {
        let ledger = MemoryErrorLedger::new();
        for i in 0..3 {
            ledger
                .record(LedgerEntry::now("addr", format!("m{i}"), "test", "StageError"))
                .await
                .unwrap();
        }

        let messages: Vec<_> = ledger
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["m0", "m1", "m2"]);
    }
}
