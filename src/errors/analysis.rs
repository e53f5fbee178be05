// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for analyzer stages.
//!
//! A missing input artifact is *not* an error: stages report it as
//! [`StageOutcome::Skipped`](crate::analysis::StageOutcome). These variants
//! cover inputs that exist but are unusable, and downstream failures.

use super::StoreError;

/// Errors that can occur while running an analyzer stage.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Reading inputs or writing the output artifact failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// An input artifact exists but does not have the expected shape.
    #[error("Malformed input artifact {key}: {details}")]
    MalformedInput {
        /// Artifact key
        key: String,
        /// What was wrong
        details: String,
    },
}

impl AnalysisError {
    /// Create a `MalformedInput` error.
    pub fn malformed_input(key: impl Into<String>, details: impl Into<String>) -> Self {
        AnalysisError::MalformedInput {
            key: key.into(),
            details: details.into(),
        }
    }
}
