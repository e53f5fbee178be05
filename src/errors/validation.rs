// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for address validation.

/// An address failed the syntactic check.
///
/// `reason` is the same human-readable message reported by
/// [`validate`](crate::validate), and is what gets written to the error ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid address '{address}': {reason}")]
pub struct ValidationError {
    /// The rejected input, verbatim
    pub address: String,
    /// Why it was rejected
    pub reason: String,
}

impl ValidationError {
    pub fn new(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            reason: reason.into(),
        }
    }
}
