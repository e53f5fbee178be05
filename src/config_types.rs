// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Strong types for configuration values
//!
//! These types keep pagination limits from being confused with record counts
//! or page numbers.

use serde::{Deserialize, Serialize};

/// Number of records requested per upstream page.
///
/// Upstream sources cap this differently (the Solana RPC
/// `getSignaturesForAddress` accepts up to 1000, the REST transactions endpoint
/// 40, most REST list endpoints 100), so the value is validated against the
/// source it is used with rather than being hard-coded.
///
/// # Examples
///
/// ```
/// use walletscan::PageSize;
///
/// assert_eq!(PageSize::DEFAULT.get(), 100);
/// assert!(PageSize::new(0).is_none());
/// assert!(PageSize::new(40).unwrap().fits(40));
/// assert!(!PageSize::new(100).unwrap().fits(40));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageSize(usize);

impl PageSize {
    /// Default page size, the cap of the REST list endpoints
    pub const DEFAULT: Self = Self(100);

    /// Cap of the REST `account/transactions` endpoint
    pub const REST_TRANSACTIONS_MAX: Self = Self(40);

    /// Cap of the JSON-RPC `getSignaturesForAddress` method
    pub const RPC_SIGNATURES_MAX: Self = Self(1000);

    /// Returns `None` for zero.
    pub const fn new(size: usize) -> Option<Self> {
        if size == 0 {
            None
        } else {
            Some(Self(size))
        }
    }

    pub const fn get(&self) -> usize {
        self.0
    }

    /// Whether this page size is accepted by a source whose maximum is `max`.
    pub const fn fits(&self, max: usize) -> bool {
        self.0 <= max
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} records", self.0)
    }
}

/// Upper bound on pages fetched in one pagination run.
///
/// # Examples
///
/// ```
/// use walletscan::MaxPages;
///
/// let limit = MaxPages::new(2);
/// assert!(!limit.reached(1));
/// assert!(limit.reached(2));
/// assert!(!MaxPages::UNLIMITED.reached(1_000_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaxPages(Option<usize>);

impl MaxPages {
    /// No limit; pagination stops only on a short or empty page
    pub const UNLIMITED: Self = Self(None);

    pub const fn new(pages: usize) -> Self {
        Self(Some(pages))
    }

    pub const fn get(&self) -> Option<usize> {
        self.0
    }

    /// Whether `fetched` pages already meet the limit.
    pub fn reached(&self, fetched: usize) -> bool {
        self.0.is_some_and(|max| fetched >= max)
    }
}

impl Default for MaxPages {
    fn default() -> Self {
        Self::UNLIMITED
    }
}

impl From<Option<usize>> for MaxPages {
    fn from(value: Option<usize>) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for MaxPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n} pages"),
            None => f.write_str("unlimited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_limits() {
        assert!(PageSize::DEFAULT.fits(PageSize::RPC_SIGNATURES_MAX.get()));
        assert!(!PageSize::DEFAULT.fits(PageSize::REST_TRANSACTIONS_MAX.get()));
        assert_eq!(PageSize::new(7).map(|p| p.get()), Some(7));
    }

    #[test]
    fn test_max_pages_zero_is_immediately_reached() {
        assert!(MaxPages::new(0).reached(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(PageSize::DEFAULT.to_string(), "100 records");
        assert_eq!(MaxPages::new(3).to_string(), "3 pages");
        assert_eq!(MaxPages::UNLIMITED.to_string(), "unlimited");
    }
}
