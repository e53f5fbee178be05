// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Typed upstream records and query filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One DeFi activity from `account/defi/activities`.
///
/// Fields the analyzers do not use are kept in `extra` so artifacts written
/// from these records lose nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Transaction signature
    pub trans_id: String,
    /// Unix seconds
    #[serde(default)]
    pub block_time: Option<i64>,
    /// Slot
    #[serde(default)]
    pub block_id: Option<u64>,
    /// Upstream activity type, e.g. `ACTIVITY_TOKEN_SWAP`
    #[serde(default)]
    pub activity_type: String,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    /// Program ids the activity went through
    #[serde(default, deserialize_with = "one_or_many")]
    pub platform: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routers: Option<ActivityRouters>,
    /// Raw (undivided) amount of a plain transfer
    #[serde(
        default,
        deserialize_with = "raw_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_decimals: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ActivityRecord {
    pub fn block_time_utc(&self) -> Option<DateTime<Utc>> {
        self.block_time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Whether this activity exchanged one token for another.
    pub fn is_swap(&self) -> bool {
        self.routers.is_some() || self.activity_type.contains("SWAP")
    }
}

/// Token legs of a swap-like activity. Amounts are raw integer strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRouters {
    #[serde(default)]
    pub token1: Option<String>,
    #[serde(default)]
    pub token1_decimals: Option<u32>,
    #[serde(default, deserialize_with = "raw_amount")]
    pub amount1: Option<String>,
    #[serde(default)]
    pub token2: Option<String>,
    #[serde(default)]
    pub token2_decimals: Option<u32>,
    #[serde(default, deserialize_with = "raw_amount")]
    pub amount2: Option<String>,
}

/// One entry of `getSignaturesForAddress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInfo {
    pub signature: String,
    #[serde(default)]
    pub slot: Option<u64>,
    /// Present and non-null when the transaction failed
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub block_time: Option<i64>,
    #[serde(default)]
    pub confirmation_status: Option<String>,
}

/// Which transactions to keep by execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    #[default]
    Any,
}

impl TransactionStatus {
    /// Whether a record whose error marker is `err` passes this filter.
    pub fn matches(&self, err: Option<&Value>) -> bool {
        let failed = err.is_some_and(|e| !e.is_null());
        match self {
            TransactionStatus::Success => !failed,
            TransactionStatus::Failed => failed,
            TransactionStatus::Any => true,
        }
    }
}

/// Sort order for REST list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filters applied to activity and transaction collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    /// Only activities at or after this time
    pub from: Option<DateTime<Utc>>,
    /// Only activities at or before this time
    pub to: Option<DateTime<Utc>>,
    /// Upstream activity types; empty means all
    pub activity_types: Vec<String>,
    pub status: TransactionStatus,
}

impl ActivityFilter {
    pub fn is_empty(&self) -> bool {
        self.from.is_none()
            && self.to.is_none()
            && self.activity_types.is_empty()
            && self.status == TransactionStatus::Any
    }
}

/// Accepts a string, an array of strings, or null.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
        None => Vec::new(),
    })
}

/// Accepts an integer amount given as a JSON number or string.
fn raw_amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected amount as number or string, got {other}"
        ))),
    }
}
