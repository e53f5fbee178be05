// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for data collection.
//!
//! Only failures that abort a whole collection step are represented here.
//! Optional endpoints that fail are reported inside the
//! [`CollectedBundle`](crate::CollectedBundle) instead.

use super::{ApiError, StoreError};

/// Errors that can occur while collecting data for an address.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The mandatory activities collection failed; the run cannot continue.
    #[error("Mandatory activities collection failed for {address}: {source}")]
    Activities {
        /// Address being collected
        address: String,
        /// The underlying failure
        #[source]
        source: Box<CollectError>,
    },

    /// Upstream call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The configured page size exceeds what the upstream source accepts.
    #[error("Page size {requested} exceeds the {source_name} maximum of {max}")]
    PageSizeTooLarge {
        /// Requested page size
        requested: usize,
        /// Upstream maximum
        max: usize,
        /// Name of the page source
        source_name: &'static str,
    },

    /// The upstream returned data that does not fit the expected shape.
    #[error("Unexpected payload from {endpoint}: {details}")]
    UnexpectedPayload {
        /// Endpoint name
        endpoint: String,
        /// What was wrong
        details: String,
    },
}

impl CollectError {
    /// Wrap a failure as the fatal activities failure for `address`.
    pub fn activities(address: impl Into<String>, source: CollectError) -> Self {
        CollectError::Activities {
            address: address.into(),
            source: Box::new(source),
        }
    }

    /// Create an `UnexpectedPayload` error.
    pub fn unexpected_payload(endpoint: impl Into<String>, details: impl Into<String>) -> Self {
        CollectError::UnexpectedPayload {
            endpoint: endpoint.into(),
            details: details.into(),
        }
    }
}
