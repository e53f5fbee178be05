// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Solana address validation.
//!
//! Every network call in walletscan takes an [`Address`], and the only way to
//! obtain one is through [`Address::parse`], so unvalidated strings never reach
//! the upstream API.
//!
//! # Examples
//!
//! ```
//! use walletscan::{validate, Address};
//!
//! let outcome = validate("GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S");
//! assert!(outcome.valid);
//!
//! let outcome = validate("not-a-valid-address");
//! assert!(!outcome.valid);
//! assert!(outcome.reason.contains("invalid characters"));
//!
//! let address = Address::parse("GthTyfd3EV9Y8wN6zhZeES5PgT2jQVzLrZizfZquAY5S").unwrap();
//! assert_eq!(address.len(), 44);
//! ```

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::ValidationError;
use crate::ledger::{ErrorLedger, LedgerEntry};

/// Base58 alphabet: digits and letters without `0`, `O`, `I` and `l`.
pub const ADDRESS_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Shortest accepted address length.
pub const MIN_ADDRESS_LEN: usize = 32;

/// Longest accepted address length.
pub const MAX_ADDRESS_LEN: usize = 44;

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    /// Empty when `valid` is true
    pub reason: String,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: String::new(),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }
}

fn is_address_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

/// Syntactically checks a Solana address.
///
/// The input is checked as given: surrounding whitespace is outside the
/// alphabet and makes the address invalid. Characters are checked before
/// length so that obviously foreign input (for example an EVM address or a
/// slug) is reported as such.
pub fn validate(address: &str) -> ValidationOutcome {
    if address.is_empty() {
        return ValidationOutcome::rejected("Address is empty");
    }

    let mut invalid: Vec<char> = address.chars().filter(|c| !is_address_char(*c)).collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        let listed: String = invalid.iter().collect();
        return ValidationOutcome::rejected(format!(
            "Address contains invalid characters: '{listed}'"
        ));
    }

    let len = address.chars().count();
    if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len) {
        return ValidationOutcome::rejected(format!(
            "Invalid address length {len} (expected {MIN_ADDRESS_LEN}-{MAX_ADDRESS_LEN})"
        ));
    }

    ValidationOutcome::ok()
}

/// A validated Solana address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Validates and wraps `address`.
    pub fn parse(address: &str) -> Result<Self, ValidationError> {
        let outcome = validate(address);
        if outcome.valid {
            Ok(Self(address.to_string()))
        } else {
            Err(ValidationError::new(address, outcome.reason))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// What [`validate_and_log`] does after recording an invalid address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnInvalid {
    /// Return the error to the caller.
    #[default]
    Return,
    /// Terminate the process with exit code 1.
    Exit,
}

/// Validates `address`, recording failures in the error ledger.
///
/// Entry points that must not proceed on bad input call this with
/// [`OnInvalid::Exit`]. A failure to write the ledger is logged but does not
/// change the outcome.
pub async fn validate_and_log(
    address: &str,
    source: &str,
    ledger: &dyn ErrorLedger,
    on_invalid: OnInvalid,
) -> Result<Address, ValidationError> {
    let err = match Address::parse(address) {
        Ok(address) => return Ok(address),
        Err(err) => err,
    };

    error!(address = %address, source = source, reason = %err.reason, "Address validation failed");

    let entry = LedgerEntry {
        timestamp: Utc::now(),
        address: address.to_string(),
        message: err.reason.clone(),
        source: source.to_string(),
        kind: "ValidationError".to_string(),
    };
    if let Err(ledger_err) = ledger.record(entry).await {
        error!(error = %ledger_err, "Failed to record validation error in ledger");
    }

    if on_invalid == OnInvalid::Exit {
        std::process::exit(1);
    }
    Err(err)
}
