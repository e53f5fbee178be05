// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! USD price sources for the estimation stage
//!
//! Implement [`PriceSource`] to plug in another oracle. The trait is
//! object-safe so the pipeline holds it as `Arc<dyn PriceSource>`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use bigdecimal::BigDecimal;

use crate::api::ApiClient;
use crate::config::constants::mints;
use crate::errors::ApiError;

/// Current USD price per whole token.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Source name recorded in the USD estimates artifact.
    fn name(&self) -> &'static str;

    /// `None` when the source has no price for `mint`.
    async fn usd_price(&self, mint: &str) -> Result<Option<BigDecimal>, ApiError>;
}

/// Prices from the REST `token/price` endpoint.
#[derive(Debug, Clone)]
pub struct ApiPriceSource {
    client: ApiClient,
}

impl ApiPriceSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for ApiPriceSource {
    fn name(&self) -> &'static str {
        "token/price"
    }

    async fn usd_price(&self, mint: &str) -> Result<Option<BigDecimal>, ApiError> {
        self.client.token_price(mint).await
    }
}

/// A fixed price table.
#[derive(Clone, Default)]
pub struct StaticPriceSource {
    prices: BTreeMap<String, BigDecimal>,
}

impl fmt::Debug for StaticPriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPriceSource")
            .field("tokens", &self.prices.len())
            .finish()
    }
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table pricing every known stablecoin at 1 USD.
    pub fn with_stablecoins() -> Self {
        let one = BigDecimal::from(1);
        Self {
            prices: mints::STABLECOINS
                .iter()
                .map(|mint| (mint.to_string(), one.clone()))
                .collect(),
        }
    }

    pub fn with_price(mut self, mint: impl Into<String>, price: BigDecimal) -> Self {
        self.prices.insert(mint.into(), price);
        self
    }

    /// Parses `price` as a decimal; unparsable prices are ignored.
    pub fn with_price_str(self, mint: impl Into<String>, price: &str) -> Self {
        match BigDecimal::from_str(price) {
            Ok(price) => self.with_price(mint, price),
            Err(_) => self,
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn usd_price(&self, mint: &str) -> Result<Option<BigDecimal>, ApiError> {
        Ok(self.prices.get(mint).cloned())
    }
}
