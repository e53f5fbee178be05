// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for configuration loading and validation.

/// The configuration is internally inconsistent or could not be read.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why the value is rejected
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("Failed to parse environment variable {var}='{value}': {reason}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Parse failure
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
