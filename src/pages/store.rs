// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Page persistence, summary merge, resume and purge.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, Instrument};

use super::{
    page_key, parse_page_key, parse_summary_key, summary_key, PageSource, TransactionPage,
    TransactionSummary,
};
use crate::address::Address;
use crate::api::TransactionStatus;
use crate::config_types::{MaxPages, PageSize};
use crate::errors::{CollectError, StoreError};
use crate::store::ArtifactStore;
use crate::tracing::spans;

/// Persists paginated transaction history for addresses.
///
/// Summary writes are serialized by an internal lock, so concurrent runs for
/// different addresses (or a purge racing a fetch) in one process are safe.
/// Concurrent runs for the same address across processes are not supported.
///
/// # Examples
///
/// ```rust,ignore
/// use walletscan::pages::{source_for, TransactionPageStore};
///
/// let pages = TransactionPageStore::new(store, source_for(kind, client), PageSize::DEFAULT)?
///     .with_max_pages(MaxPages::new(50));
/// let summary = pages.fetch_all_pages(&address, None).await?;
/// println!("{} transactions", summary.total_transactions);
/// ```
pub struct TransactionPageStore {
    store: Arc<dyn ArtifactStore>,
    source: Arc<dyn PageSource>,
    page_size: PageSize,
    max_pages: MaxPages,
    status: TransactionStatus,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for TransactionPageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionPageStore")
            .field("store", &self.store.name())
            .field("source", &self.source.name())
            .field("page_size", &self.page_size)
            .field("max_pages", &self.max_pages)
            .field("status", &self.status)
            .finish()
    }
}

impl TransactionPageStore {
    /// Creates a page store. Fails if `page_size` exceeds what `source`
    /// serves.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        source: Arc<dyn PageSource>,
        page_size: PageSize,
    ) -> Result<Self, CollectError> {
        let max = source.max_page_size();
        if !page_size.fits(max.get()) {
            return Err(CollectError::PageSizeTooLarge {
                requested: page_size.get(),
                max: max.get(),
                source_name: source.name(),
            });
        }

        Ok(Self {
            store,
            source,
            page_size,
            max_pages: MaxPages::UNLIMITED,
            status: TransactionStatus::Any,
            write_lock: Mutex::new(()),
        })
    }

    /// Stops after `max_pages` upstream pages per run.
    pub fn with_max_pages(mut self, max_pages: MaxPages) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Keeps only records with this execution status.
    pub fn with_status_filter(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Fetches pages newest-first until a short page, an empty page or the
    /// page limit, persisting each page and merging it into the summary.
    ///
    /// Without `cursor_seed` numbering starts at 1 and existing pages are
    /// replaced in place. With a seed, fetching starts before that signature
    /// and numbering continues after the summary's last page.
    pub async fn fetch_all_pages(
        &self,
        address: &Address,
        cursor_seed: Option<String>,
    ) -> Result<TransactionSummary, CollectError> {
        let resumed = cursor_seed.is_some();
        let span = spans::fetch_all_pages(address, self.source.name(), resumed);

        async move {
            let mut page_number = if resumed {
                self.get_summary(address)
                    .await?
                    .map_or(1, |summary| summary.next_page_number())
            } else {
                1
            };
            let mut cursor = cursor_seed;
            let mut fetched = 0usize;
            let mut persisted = 0usize;

            loop {
                if self.max_pages.reached(fetched) {
                    debug!(fetched = fetched, max_pages = %self.max_pages, "Page limit reached");
                    break;
                }

                let batch = self
                    .source
                    .fetch_page(address, cursor.as_deref(), self.page_size)
                    .instrument(spans::fetch_page(page_number, cursor.as_deref()))
                    .await?;
                fetched += 1;

                let Some(last) = batch.last() else {
                    debug!(page_number = page_number, "Empty page, history exhausted");
                    break;
                };
                let next_cursor = last.signature.clone();
                let batch_len = batch.len();

                let kept: Vec<_> = batch
                    .into_iter()
                    .filter(|record| self.status.matches(record.err.as_ref()))
                    .collect();

                if kept.is_empty() {
                    debug!(
                        records = batch_len,
                        status = ?self.status,
                        "No records left after status filter"
                    );
                } else {
                    let page = TransactionPage::new(address, page_number, kept, Utc::now())
                        .with_cursor(next_cursor.clone());
                    self.persist_page(address, page).await?;
                    page_number += 1;
                    persisted += 1;
                }

                cursor = Some(next_cursor);

                if batch_len < self.page_size.get() {
                    debug!(records = batch_len, page_size = self.page_size.get(), "Short page, history exhausted");
                    break;
                }
            }

            let summary = self.finish_run(address).await?;
            info!(
                fetched = fetched,
                persisted = persisted,
                total_pages = summary.total_pages,
                total_transactions = summary.total_transactions,
                "Transaction pages fetched"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Continues after the last persisted page. Starts from scratch if the
    /// address has no summary yet.
    pub async fn resume(&self, address: &Address) -> Result<TransactionSummary, CollectError> {
        let seed = self
            .get_summary(address)
            .await?
            .and_then(|summary| summary.resume_cursor().map(str::to_string));
        debug!(address = %address, seed = ?seed, "Resuming pagination");
        self.fetch_all_pages(address, seed).await
    }

    /// Writes the page (unless identical content is already stored) and
    /// merges it into the summary.
    async fn persist_page(&self, address: &Address, page: TransactionPage) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let key = page_key(address, page.page_number);
        let page = match self.store.get_as::<TransactionPage>(&key).await? {
            Some(existing) if existing.same_content(&page) => {
                debug!(key = %key, "Page unchanged, keeping stored copy");
                existing
            }
            _ => {
                self.store.put_as(&key, &page).await?;
                page
            }
        };

        let summary_key = summary_key(address);
        let mut summary = self
            .store
            .get_as::<TransactionSummary>(&summary_key)
            .await?
            .unwrap_or_else(|| TransactionSummary::new(address));

        if summary.merge_page(&page, Utc::now()) {
            self.store.put_as(&summary_key, &summary).await?;
            debug!(
                page_number = page.page_number,
                total_transactions = summary.total_transactions,
                "Summary updated"
            );
        }
        Ok(())
    }

    /// Stamps `lastFetched` and returns the final summary.
    async fn finish_run(&self, address: &Address) -> Result<TransactionSummary, StoreError> {
        let _guard = self.write_lock.lock().await;
        let key = summary_key(address);
        let mut summary = self
            .store
            .get_as::<TransactionSummary>(&key)
            .await?
            .unwrap_or_else(|| TransactionSummary::new(address));
        summary.last_fetched = Some(Utc::now());
        self.store.put_as(&key, &summary).await?;
        Ok(summary)
    }

    /// Re-derives the summary from the persisted pages and stores it.
    ///
    /// `lastFetched` is carried over from the existing summary.
    pub async fn rebuild_summary(&self, address: &Address) -> Result<TransactionSummary, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut pages = Vec::new();
        for number in self.page_numbers(address).await? {
            if let Some(page) = self
                .store
                .get_as::<TransactionPage>(&page_key(address, number))
                .await?
            {
                pages.push(page);
            }
        }

        let key = summary_key(address);
        let previous = self.store.get_as::<TransactionSummary>(&key).await?;
        let mut summary = TransactionSummary::rebuild(address, &pages, Utc::now());
        summary.last_fetched = previous.and_then(|s| s.last_fetched);

        self.store.put_as(&key, &summary).await?;
        info!(address = %address, pages = pages.len(), "Summary rebuilt from pages");
        Ok(summary)
    }

    pub async fn get_summary(&self, address: &Address) -> Result<Option<TransactionSummary>, StoreError> {
        self.store.get_as(&summary_key(address)).await
    }

    pub async fn get_page(
        &self,
        address: &Address,
        page_number: usize,
    ) -> Result<Option<TransactionPage>, StoreError> {
        self.store.get_as(&page_key(address, page_number)).await
    }

    /// Persisted page numbers of `address`, ascending.
    pub async fn page_numbers(&self, address: &Address) -> Result<Vec<usize>, StoreError> {
        let mut numbers: Vec<usize> = self
            .store
            .list()
            .await?
            .iter()
            .filter_map(|key| parse_page_key(key))
            .filter(|(owner, _)| *owner == address.as_str())
            .map(|(_, number)| number)
            .collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    /// Deletes the summary, then every page, of `address`. Returns the number
    /// of pages removed.
    pub async fn purge(&self, address: &Address) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;

        self.store.remove(&summary_key(address)).await?;

        let mut removed = 0;
        for number in self.page_numbers(address).await? {
            if self.store.remove(&page_key(address, number)).await? {
                removed += 1;
            }
        }

        info!(address = %address, pages = removed, "Purged transaction pages");
        Ok(removed)
    }

    /// Addresses with a summary or at least one page, sorted.
    pub async fn list_addresses(&self) -> Result<Vec<String>, StoreError> {
        let addresses: BTreeSet<String> = self
            .store
            .list()
            .await?
            .iter()
            .filter_map(|key| {
                parse_summary_key(key).or_else(|| parse_page_key(key).map(|(address, _)| address))
            })
            .map(str::to_string)
            .collect();
        Ok(addresses.into_iter().collect())
    }
}
