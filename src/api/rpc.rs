// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Typed wrappers for the Solana JSON-RPC methods.

use serde_json::{json, Map, Value};

use super::{ApiClient, SignatureInfo};
use crate::address::Address;
use crate::errors::ApiError;

pub const GET_SIGNATURES_FOR_ADDRESS: &str = "getSignaturesForAddress";
pub const GET_TRANSACTION: &str = "getTransaction";

/// Options of `getSignaturesForAddress`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignaturesQuery {
    /// Maximum signatures to return (upstream cap 1000)
    pub limit: usize,
    /// Start searching backwards from this signature
    pub before: Option<String>,
    /// Stop when this signature is reached
    pub until: Option<String>,
}

impl SignaturesQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn before(mut self, signature: impl Into<String>) -> Self {
        self.before = Some(signature.into());
        self
    }

    pub fn until(mut self, signature: impl Into<String>) -> Self {
        self.until = Some(signature.into());
        self
    }

    fn to_params(&self, address: &Address) -> Value {
        let mut options = Map::new();
        options.insert("limit".to_string(), json!(self.limit));
        if let Some(before) = &self.before {
            options.insert("before".to_string(), json!(before));
        }
        if let Some(until) = &self.until {
            options.insert("until".to_string(), json!(until));
        }
        json!([address.as_str(), options])
    }
}

impl ApiClient {
    /// Signatures of transactions touching `address`, newest first.
    pub async fn get_signatures_for_address(
        &self,
        address: &Address,
        query: &SignaturesQuery,
    ) -> Result<Vec<SignatureInfo>, ApiError> {
        let result = self
            .rpc(GET_SIGNATURES_FOR_ADDRESS, query.to_params(address))
            .await?;
        serde_json::from_value(result).map_err(|e| ApiError::decode(GET_SIGNATURES_FOR_ADDRESS, e))
    }

    /// Full transaction in `jsonParsed` encoding; `None` if the node does not
    /// know the signature.
    pub async fn get_transaction(&self, signature: &str) -> Result<Option<Value>, ApiError> {
        let params = json!([
            signature,
            {"encoding": "jsonParsed", "maxSupportedTransactionVersion": 0}
        ]);
        let result = self.rpc(GET_TRANSACTION, params).await?;
        Ok((!result.is_null()).then_some(result))
    }
}
