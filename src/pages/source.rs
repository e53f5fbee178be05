// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream sources of transaction pages.

use std::sync::Arc;

use async_trait::async_trait;

use super::TransactionRecord;
use crate::address::Address;
use crate::api::rpc::{SignaturesQuery, GET_SIGNATURES_FOR_ADDRESS};
use crate::api::{ApiClient, Endpoint};
use crate::config::TransactionSourceKind;
use crate::config_types::PageSize;
use crate::errors::ApiError;

/// A cursor-paginated, newest-first list of an address's transactions.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Upstream name, for logs and errors.
    fn name(&self) -> &'static str;

    /// Largest page the upstream serves.
    fn max_page_size(&self) -> PageSize;

    /// Up to `limit` records strictly older than `before` (newest first).
    async fn fetch_page(
        &self,
        address: &Address,
        before: Option<&str>,
        limit: PageSize,
    ) -> Result<Vec<TransactionRecord>, ApiError>;
}

/// `getSignaturesForAddress` over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcSignatureSource {
    client: ApiClient,
}

impl RpcSignatureSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for RpcSignatureSource {
    fn name(&self) -> &'static str {
        GET_SIGNATURES_FOR_ADDRESS
    }

    fn max_page_size(&self) -> PageSize {
        PageSize::RPC_SIGNATURES_MAX
    }

    async fn fetch_page(
        &self,
        address: &Address,
        before: Option<&str>,
        limit: PageSize,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        let mut query = SignaturesQuery::new(limit.get());
        if let Some(before) = before {
            query = query.before(before);
        }
        let signatures = self.client.get_signatures_for_address(address, &query).await?;
        Ok(signatures
            .into_iter()
            .map(TransactionRecord::from_signature)
            .collect())
    }
}

/// REST `account/transactions`.
#[derive(Debug, Clone)]
pub struct RestTransactionSource {
    client: ApiClient,
}

impl RestTransactionSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for RestTransactionSource {
    fn name(&self) -> &'static str {
        Endpoint::Transactions.path()
    }

    fn max_page_size(&self) -> PageSize {
        PageSize::REST_TRANSACTIONS_MAX
    }

    async fn fetch_page(
        &self,
        address: &Address,
        before: Option<&str>,
        limit: PageSize,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        let items = self
            .client
            .account_transactions(address, before, limit)
            .await?;
        items
            .into_iter()
            .map(|item| TransactionRecord::from_rest(Endpoint::Transactions.path(), item))
            .collect()
    }
}

/// The page source selected by configuration.
pub fn source_for(kind: TransactionSourceKind, client: ApiClient) -> Arc<dyn PageSource> {
    match kind {
        TransactionSourceKind::Rpc => Arc::new(RpcSignatureSource::new(client)),
        TransactionSourceKind::Rest => Arc::new(RestTransactionSource::new(client)),
    }
}
