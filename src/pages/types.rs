// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Persisted page and summary documents, and the summary merge.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::page_key;
use crate::address::Address;
use crate::api::SignatureInfo;
use crate::errors::ApiError;

/// One transaction as fetched from the page source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub signature: String,
    /// Unix seconds
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub slot: Option<u64>,
    /// Error marker; absent for successful transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,
    /// The upstream record, verbatim
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl TransactionRecord {
    pub fn from_signature(info: SignatureInfo) -> Self {
        let payload = serde_json::to_value(&info).unwrap_or(Value::Null);
        Self {
            signature: info.signature,
            block_time: info.block_time,
            slot: info.slot,
            err: info.err.filter(|e| !e.is_null()),
            payload,
        }
    }

    /// Builds a record from an `account/transactions` item
    /// (`tx_hash`, `block_time`, `slot`, `status`).
    pub fn from_rest(endpoint: &str, item: Value) -> Result<Self, ApiError> {
        let signature = item
            .get("tx_hash")
            .or_else(|| item.get("signature"))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::decode(endpoint, "transaction without tx_hash"))?
            .to_string();

        let failed = item
            .get("status")
            .and_then(Value::as_str)
            .is_some_and(|status| !status.eq_ignore_ascii_case("success"));

        Ok(Self {
            signature,
            block_time: item.get("block_time").and_then(Value::as_i64),
            slot: item.get("slot").and_then(Value::as_u64),
            err: failed.then(|| item.get("status").cloned().unwrap_or(Value::Null)),
            payload: item,
        })
    }

    pub fn is_failed(&self) -> bool {
        self.err.as_ref().is_some_and(|e| !e.is_null())
    }
}

/// One persisted page: `{address}_TRANSACTIONS_page-{n}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub address: String,
    /// 1-based, contiguous per address
    pub page_number: usize,
    pub file_name: String,
    pub transaction_count: usize,
    pub fetched_at: DateTime<Utc>,
    /// Signature the next page starts before. Equals the last record's
    /// signature unless records were filtered out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub transactions: Vec<TransactionRecord>,
}

impl TransactionPage {
    pub fn new(
        address: &Address,
        page_number: usize,
        transactions: Vec<TransactionRecord>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address: address.to_string(),
            page_number,
            file_name: page_key(address, page_number),
            transaction_count: transactions.len(),
            fetched_at,
            cursor: None,
            transactions,
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Whether `other` holds the same records and cursor (ignores `fetchedAt`).
    pub fn same_content(&self, other: &TransactionPage) -> bool {
        self.page_number == other.page_number
            && self.cursor == other.cursor
            && self.transactions == other.transactions
    }

    pub fn descriptor(&self) -> PageDescriptor {
        PageDescriptor {
            page_number: self.page_number,
            file_name: self.file_name.clone(),
            transaction_count: self.transactions.len(),
            first_signature: self.transactions.first().map(|t| t.signature.clone()),
            last_signature: self.transactions.last().map(|t| t.signature.clone()),
            cursor: self.cursor.clone(),
        }
    }

    /// The oldest record: smallest block time, or the last record when none
    /// carries a block time.
    pub fn oldest(&self) -> Option<&TransactionRecord> {
        self.transactions
            .iter()
            .rev()
            .filter(|t| t.block_time.is_some())
            .min_by_key(|t| t.block_time)
            .or_else(|| self.transactions.last())
    }
}

/// Summary entry describing one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    pub page_number: usize,
    pub file_name: String,
    pub transaction_count: usize,
    pub first_signature: Option<String>,
    pub last_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl PageDescriptor {
    /// Where pagination continues after this page.
    pub fn resume_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().or(self.last_signature.as_deref())
    }
}

/// The globally oldest known transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarliestTransaction {
    pub signature: String,
    pub block_time: Option<i64>,
}

impl EarliestTransaction {
    fn from_record(record: &TransactionRecord) -> Self {
        Self {
            signature: record.signature.clone(),
            block_time: record.block_time,
        }
    }

    /// Whether `self` is strictly older than `current`. A known block time
    /// beats an unknown one.
    fn predates(&self, current: &EarliestTransaction) -> bool {
        match (self.block_time, current.block_time) {
            (Some(candidate), Some(existing)) => candidate < existing,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// Per-address summary: `{address}-summary.json`.
///
/// `totalTransactions` always equals the sum of the descriptors'
/// `transactionCount`, and `totalPages` their number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub address: String,
    pub total_pages: usize,
    pub total_transactions: usize,
    pub earliest_transaction: Option<EarliestTransaction>,
    /// RFC 3339 time of the earliest transaction
    pub wallet_creation_date: Option<String>,
    pub last_fetched: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub pages: Vec<PageDescriptor>,
}

impl TransactionSummary {
    pub fn new(address: &Address) -> Self {
        Self {
            address: address.to_string(),
            total_pages: 0,
            total_transactions: 0,
            earliest_transaction: None,
            wallet_creation_date: None,
            last_fetched: None,
            last_updated: None,
            pages: Vec::new(),
        }
    }

    /// Replays `pages` into a fresh summary.
    pub fn rebuild<'a>(
        address: &Address,
        pages: impl IntoIterator<Item = &'a TransactionPage>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut summary = Self::new(address);
        for page in pages {
            summary.merge_page(page, now);
        }
        summary
    }

    /// Merges one page's descriptor and earliest record.
    ///
    /// A descriptor with the same page number is replaced, otherwise the
    /// descriptor is inserted in page order. Totals are recounted. The
    /// earliest transaction only moves backwards in time. `lastUpdated` is
    /// set to `now` only if something changed; the return value says whether
    /// it did.
    pub fn merge_page(&mut self, page: &TransactionPage, now: DateTime<Utc>) -> bool {
        let descriptor = page.descriptor();
        let mut changed = false;

        match self
            .pages
            .binary_search_by_key(&descriptor.page_number, |d| d.page_number)
        {
            Ok(index) => {
                if self.pages[index] != descriptor {
                    self.pages[index] = descriptor;
                    changed = true;
                }
            }
            Err(index) => {
                self.pages.insert(index, descriptor);
                changed = true;
            }
        }

        if let Some(oldest) = page.oldest() {
            let candidate = EarliestTransaction::from_record(oldest);
            let replace = match &self.earliest_transaction {
                None => true,
                Some(current) => candidate.predates(current),
            };
            if replace {
                self.wallet_creation_date = candidate
                    .block_time
                    .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true));
                self.earliest_transaction = Some(candidate);
                changed = true;
            }
        }

        self.recount();
        if changed {
            self.last_updated = Some(now);
        }
        changed
    }

    fn recount(&mut self) {
        self.total_pages = self.pages.len();
        self.total_transactions = self.pages.iter().map(|d| d.transaction_count).sum();
    }

    pub fn last_page(&self) -> Option<&PageDescriptor> {
        self.pages.last()
    }

    /// Page number a resumed run continues with.
    pub fn next_page_number(&self) -> usize {
        self.last_page().map_or(1, |d| d.page_number + 1)
    }

    /// Cursor a resumed run starts before.
    pub fn resume_cursor(&self) -> Option<&str> {
        self.last_page().and_then(PageDescriptor::resume_cursor)
    }

    /// Equality ignoring `lastFetched` and `lastUpdated`.
    pub fn same_content(&self, other: &TransactionSummary) -> bool {
        self.address == other.address
            && self.total_pages == other.total_pages
            && self.total_transactions == other.total_transactions
            && self.earliest_transaction == other.earliest_transaction
            && self.wallet_creation_date == other.wallet_creation_date
            && self.pages == other.pages
    }
}
