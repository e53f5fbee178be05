// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for artifact and page persistence.

/// Errors that can occur when reading or writing persisted artifacts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem I/O failure.
    #[error("Store I/O error at {path}: {details}")]
    Io {
        /// Path (or key) that caused the error
        path: String,
        /// Details about the I/O error
        details: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An artifact exists but could not be (de)serialized.
    #[error("Serialization error for {key}: {details}")]
    Serialization {
        /// Artifact key
        key: String,
        /// Details about the serialization error
        details: String,
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// A key that must not contain path separators did.
    #[error("Invalid artifact key: {key}")]
    InvalidKey {
        /// The rejected key
        key: String,
    },
}

impl StoreError {
    /// Create an `Io` error for a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            details: source.to_string(),
            source,
        }
    }

    /// Create a `Serialization` error for a key.
    pub fn serialization(key: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Serialization {
            key: key.into(),
            details: source.to_string(),
            source,
        }
    }
}
