// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Typed wrappers for the REST endpoints.

use bigdecimal::BigDecimal;
use serde_json::Value;
use tracing::debug;

use super::{ActivityFilter, ActivityRecord, ApiClient, SortOrder};
use crate::address::Address;
use crate::config_types::{MaxPages, PageSize};
use crate::errors::ApiError;

/// REST endpoints used by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    DefiActivities,
    BalanceChange,
    Portfolio,
    TokenAccounts,
    Transactions,
    Transfer,
    AccountDetail,
    TokenPrice,
}

impl Endpoint {
    /// Path relative to the API base URL.
    pub const fn path(&self) -> &'static str {
        match self {
            Endpoint::DefiActivities => "account/defi/activities",
            Endpoint::BalanceChange => "account/balance_change",
            Endpoint::Portfolio => "account/portfolio",
            Endpoint::TokenAccounts => "account/token-accounts",
            Endpoint::Transactions => "account/transactions",
            Endpoint::Transfer => "account/transfer",
            Endpoint::AccountDetail => "account/detail",
            Endpoint::TokenPrice => "token/price",
        }
    }

    /// Largest page the endpoint serves; `None` for unpaginated endpoints.
    pub const fn max_page_size(&self) -> Option<PageSize> {
        match self {
            Endpoint::DefiActivities | Endpoint::BalanceChange | Endpoint::Transfer => {
                Some(PageSize::DEFAULT)
            }
            Endpoint::TokenAccounts | Endpoint::Transactions => {
                Some(PageSize::REST_TRANSACTIONS_MAX)
            }
            Endpoint::Portfolio | Endpoint::AccountDetail | Endpoint::TokenPrice => None,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Query string builder for REST endpoints.
///
/// ```rust
/// use walletscan::api::{RestQuery, SortOrder};
///
/// let params = RestQuery::new()
///     .param("address", "GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S")
///     .page(2)
///     .page_size(100)
///     .sort("block_time", SortOrder::Desc)
///     .into_params();
/// assert!(params.contains(&("page".to_string(), "2".to_string())));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestQuery {
    params: Vec<(String, String)>,
}

impl RestQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_address(address: &Address) -> Self {
        Self::new().param("address", address.as_str())
    }

    /// Appends a pair; repeated keys are kept.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Sets a key, replacing earlier values for it.
    pub fn set(mut self, key: &str, value: impl ToString) -> Self {
        self.params.retain(|(k, _)| k != key);
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn page(self, page: usize) -> Self {
        self.set("page", page)
    }

    pub fn page_size(self, size: usize) -> Self {
        self.set("page_size", size)
    }

    pub fn sort(self, by: &str, order: SortOrder) -> Self {
        self.set("sort_by", by).set("sort_order", order.as_str())
    }

    /// Adds the time and type parts of `filter`. Status is applied locally.
    pub fn filter(mut self, filter: &ActivityFilter) -> Self {
        for activity_type in &filter.activity_types {
            self = self.param("activity_type[]", activity_type);
        }
        if let Some(from) = filter.from {
            self = self.set("from_time", from.timestamp());
        }
        if let Some(to) = filter.to {
            self = self.set("to_time", to.timestamp());
        }
        self
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn into_params(self) -> Vec<(String, String)> {
        self.params
    }
}

impl ApiClient {
    /// Walks `page=1..` until a short or empty page, or `max_pages`.
    ///
    /// `page_size` is clamped to the endpoint's maximum. The `data` member of
    /// each response must be an array (or an object with an `items` array).
    pub async fn paginate_rest(
        &self,
        endpoint: Endpoint,
        query: RestQuery,
        page_size: PageSize,
        max_pages: MaxPages,
    ) -> Result<Vec<Value>, ApiError> {
        let size = match endpoint.max_page_size() {
            Some(max) if !page_size.fits(max.get()) => {
                debug!(
                    endpoint = %endpoint,
                    requested = page_size.get(),
                    max = max.get(),
                    "Clamping page size to endpoint maximum"
                );
                max.get()
            }
            _ => page_size.get(),
        };

        let mut records = Vec::new();
        let mut page = 1usize;

        loop {
            if max_pages.reached(page - 1) {
                debug!(endpoint = %endpoint, pages = page - 1, "Max pages reached");
                break;
            }

            let params = query.clone().page(page).page_size(size).into_params();
            let data = self.fetch(endpoint.path(), params).await?;
            let items = into_items(endpoint, data)?;
            let count = items.len();

            debug!(endpoint = %endpoint, page = page, records = count, "Fetched page");
            records.extend(items);

            if count < size {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// All DeFi activities matching `filter`, newest first.
    ///
    /// The status part of the filter is not applied here; activities carry no
    /// execution status upstream.
    pub async fn defi_activities(
        &self,
        address: &Address,
        filter: &ActivityFilter,
        page_size: PageSize,
        max_pages: MaxPages,
    ) -> Result<Vec<ActivityRecord>, ApiError> {
        let endpoint = Endpoint::DefiActivities;
        let query = RestQuery::for_address(address)
            .sort("block_time", SortOrder::Desc)
            .filter(filter);
        let raw = self
            .paginate_rest(endpoint, query, page_size, max_pages)
            .await?;

        raw.into_iter()
            .map(|item| serde_json::from_value(item).map_err(|e| ApiError::decode(endpoint.path(), e)))
            .collect()
    }

    /// All balance changes, newest first.
    pub async fn balance_changes(
        &self,
        address: &Address,
        filter: &ActivityFilter,
        page_size: PageSize,
        max_pages: MaxPages,
    ) -> Result<Vec<Value>, ApiError> {
        let query = RestQuery::for_address(address)
            .sort("block_time", SortOrder::Desc)
            .set("remove_spam", true)
            .filter(&ActivityFilter {
                activity_types: Vec::new(),
                ..filter.clone()
            });
        self.paginate_rest(Endpoint::BalanceChange, query, page_size, max_pages)
            .await
    }

    /// SPL token accounts held by `address`.
    pub async fn token_accounts(
        &self,
        address: &Address,
        max_pages: MaxPages,
    ) -> Result<Vec<Value>, ApiError> {
        let query = RestQuery::for_address(address)
            .set("type", "token")
            .set("hide_zero", true);
        self.paginate_rest(
            Endpoint::TokenAccounts,
            query,
            PageSize::REST_TRANSACTIONS_MAX,
            max_pages,
        )
        .await
    }

    /// Portfolio valuation of `address`.
    pub async fn portfolio(&self, address: &Address) -> Result<Value, ApiError> {
        self.fetch(
            Endpoint::Portfolio.path(),
            RestQuery::for_address(address).into_params(),
        )
        .await
    }

    /// Account metadata (lamports, owner, executable...).
    pub async fn account_detail(&self, address: &Address) -> Result<Value, ApiError> {
        self.fetch(
            Endpoint::AccountDetail.path(),
            RestQuery::for_address(address).into_params(),
        )
        .await
    }

    /// One page of transactions older than `before` (newest first).
    pub async fn account_transactions(
        &self,
        address: &Address,
        before: Option<&str>,
        limit: PageSize,
    ) -> Result<Vec<Value>, ApiError> {
        let endpoint = Endpoint::Transactions;
        let mut query = RestQuery::for_address(address).set("limit", limit.get());
        if let Some(before) = before {
            query = query.set("before", before);
        }
        let data = self.fetch(endpoint.path(), query.into_params()).await?;
        into_items(endpoint, data)
    }

    /// One page of transfers.
    pub async fn transfers(
        &self,
        address: &Address,
        page: usize,
        page_size: PageSize,
    ) -> Result<Vec<Value>, ApiError> {
        let endpoint = Endpoint::Transfer;
        let query = RestQuery::for_address(address)
            .page(page)
            .page_size(page_size.get())
            .sort("block_time", SortOrder::Desc);
        let data = self.fetch(endpoint.path(), query.into_params()).await?;
        into_items(endpoint, data)
    }

    /// Latest USD price of a token, if the upstream knows one.
    ///
    /// The endpoint returns a price history (`[{date, price}]`); the most
    /// recent entry wins. A bare `{price}` object is accepted too.
    pub async fn token_price(&self, mint: &str) -> Result<Option<BigDecimal>, ApiError> {
        let endpoint = Endpoint::TokenPrice;
        let data = self
            .fetch(endpoint.path(), RestQuery::new().param("address", mint).into_params())
            .await?;

        let latest = match &data {
            Value::Array(entries) => entries
                .iter()
                .max_by_key(|entry| entry.get("date").and_then(Value::as_i64).unwrap_or_default())
                .and_then(|entry| entry.get("price")),
            Value::Object(_) => data.get("price"),
            _ => None,
        };

        match latest {
            None | Some(Value::Null) => Ok(None),
            Some(price) => parse_decimal(price)
                .map(Some)
                .ok_or_else(|| ApiError::decode(endpoint.path(), format!("unparsable price {price}"))),
        }
    }
}

fn into_items(endpoint: Endpoint, data: Value) -> Result<Vec<Value>, ApiError> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ApiError::decode(
                endpoint.path(),
                "expected an array of records in `data`",
            )),
        },
        other => Err(ApiError::decode(
            endpoint.path(),
            format!("expected an array of records, got {other}"),
        )),
    }
}

pub(crate) fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
