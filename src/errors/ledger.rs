// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for the error ledger.

/// Failure to persist or read the error ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize ledger: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}
