// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Raw token amount normalization
//!
//! Upstream amounts are integer strings in the token's smallest unit
//! (lamports for SOL, 10^-6 for USDC). Normalizing divides by
//! 10^decimals exactly, without going through floating point:
//!
//! ```
//! use walletscan::analysis::normalize_raw_amount;
//! use std::str::FromStr;
//!
//! let amount = normalize_raw_amount("1500000", 6).unwrap();
//! assert_eq!(amount, bigdecimal::BigDecimal::from_str("1.5").unwrap());
//! ```

use std::str::FromStr;

use bigdecimal::BigDecimal;

/// Divides an integer amount by 10^`decimals`.
///
/// Returns `None` for anything that is not a non-negative decimal number.
pub fn normalize_raw_amount(raw: &str, decimals: u32) -> Option<BigDecimal> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('-') {
        return None;
    }
    let value = BigDecimal::from_str(raw).ok()?;
    let scale = BigDecimal::new(1.into(), i64::from(decimals));
    Some((value * scale).normalized())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalizes_by_decimals() {
        assert_eq!(normalize_raw_amount("1000000000", 9), Some(dec("1")));
        assert_eq!(normalize_raw_amount("1", 9), Some(dec("0.000000001")));
        assert_eq!(normalize_raw_amount("42", 0), Some(dec("42")));
        assert_eq!(
            normalize_raw_amount("123456789012345678901234567890", 18),
            Some(dec("123456789012.34567890123456789"))
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(normalize_raw_amount("", 6), None);
        assert_eq!(normalize_raw_amount("abc", 6), None);
        assert_eq!(normalize_raw_amount("-5", 6), None);
    }
}
