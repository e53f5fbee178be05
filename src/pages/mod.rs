// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Paginated transaction store
//!
//! Walks an address's transaction history page by page from a [`PageSource`],
//! persisting every page as `{address}_TRANSACTIONS_page-{n}.json` and keeping
//! a summary document `{address}-summary.json` in sync.
//!
//! The summary can always be re-derived by replaying the persisted pages
//! ([`TransactionPageStore::rebuild_summary`]); merging a page that is already
//! present with identical content changes nothing.
//!
//! ```text
//! run 1 (no seed):   page-1 ─ page-2 ─ page-3 (short page, stop)
//! resume:                                  cursor = page-3 last signature
//! run 2 (seeded):                          page-4 ─ page-5 ...
//! ```

mod source;
mod store;
mod types;

use crate::address::Address;

pub use source::{source_for, PageSource, RestTransactionSource, RpcSignatureSource};
pub use store::TransactionPageStore;
pub use types::{
    EarliestTransaction, PageDescriptor, TransactionPage, TransactionRecord, TransactionSummary,
};

const PAGE_KEY_MARKER: &str = "_TRANSACTIONS_page-";
const SUMMARY_KEY_SUFFIX: &str = "-summary.json";

/// File-name key of page `page_number` of `address`.
pub fn page_key(address: &Address, page_number: usize) -> String {
    format!("{address}{PAGE_KEY_MARKER}{page_number}.json")
}

/// File-name key of the summary of `address`.
pub fn summary_key(address: &Address) -> String {
    format!("{address}{SUMMARY_KEY_SUFFIX}")
}

/// Splits a page key into address and page number.
pub fn parse_page_key(key: &str) -> Option<(&str, usize)> {
    let (address, rest) = key.split_once(PAGE_KEY_MARKER)?;
    let number = rest.strip_suffix(".json")?.parse().ok()?;
    Some((address, number))
}

/// Address of a summary key.
pub fn parse_summary_key(key: &str) -> Option<&str> {
    key.strip_suffix(SUMMARY_KEY_SUFFIX)
        .filter(|address| !address.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ArtifactKind;

    const ADDRESS: &str = "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S";

    #[test]
    fn test_page_keys_roundtrip() {
        let address = Address::parse(ADDRESS).unwrap();
        let key = page_key(&address, 12);
        assert_eq!(key, format!("{ADDRESS}_TRANSACTIONS_page-12.json"));
        assert_eq!(parse_page_key(&key), Some((ADDRESS, 12)));
        assert_eq!(parse_page_key("portfolio_x.json"), None);
        assert_eq!(parse_page_key("x_TRANSACTIONS_page-abc.json"), None);
    }

    #[test]
    fn test_summary_key_matches_artifact_kind() {
        let address = Address::parse(ADDRESS).unwrap();
        assert_eq!(
            summary_key(&address),
            ArtifactKind::TransactionSummary.key(&address)
        );
        assert_eq!(parse_summary_key(&summary_key(&address)), Some(ADDRESS));
        assert_eq!(parse_summary_key("-summary.json"), None);
    }
}
