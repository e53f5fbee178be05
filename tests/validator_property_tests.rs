// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for address validation
//!
//! An address is valid exactly when it is 32 to 44 characters long and every
//! character is in the base58 alphabet.

use proptest::prelude::*;
use walletscan::{validate, Address};

const BASE58: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// Helper to generate base58 strings of a given length range
fn arb_base58(len: std::ops::RangeInclusive<usize>) -> impl Strategy<Value = String> {
    let alphabet: Vec<char> = BASE58.chars().collect();
    prop::collection::vec(prop::sample::select(alphabet), len)
        .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    /// Property: every base58 string of valid length is accepted
    #[test]
    fn prop_base58_in_range_is_valid(address in arb_base58(32..=44)) {
        let outcome = validate(&address);
        prop_assert!(outcome.valid, "rejected {}: {}", address, outcome.reason);
        prop_assert!(outcome.reason.is_empty());
        let parsed = Address::parse(&address).unwrap();
        prop_assert_eq!(parsed.as_str(), address.as_str());
    }

    /// Property: a single excluded character invalidates an otherwise valid address
    #[test]
    fn prop_excluded_character_is_rejected(
        address in arb_base58(32..=44),
        bad in prop::sample::select(vec!['0', 'O', 'I', 'l', '-', '_', '+', ' ', '\t', '\n']),
        position in any::<prop::sample::Index>(),
    ) {
        let mut chars: Vec<char> = address.chars().collect();
        let i = position.index(chars.len());
        chars[i] = bad;
        let tampered: String = chars.into_iter().collect();

        let outcome = validate(&tampered);
        prop_assert!(!outcome.valid);
        prop_assert!(!outcome.reason.is_empty());
    }

    /// Property: surrounding whitespace is never stripped before checking
    #[test]
    fn prop_whitespace_padding_is_rejected(
        address in arb_base58(32..=44),
        pad in "[ \t\r\n]{1,3}",
        leading in any::<bool>(),
    ) {
        let padded = if leading { format!("{pad}{address}") } else { format!("{address}{pad}") };
        prop_assert!(!validate(&padded).valid);
        prop_assert!(Address::parse(&padded).is_err());
    }

    /// Property: base58 strings outside the length bounds are rejected
    #[test]
    fn prop_length_out_of_range_is_rejected(
        short in arb_base58(1..=31),
        long in arb_base58(45..=80),
    ) {
        prop_assert!(!validate(&short).valid);
        prop_assert!(!validate(&long).valid);
    }

    /// Property: `validate` and `Address::parse` always agree
    #[test]
    fn prop_validate_agrees_with_parse(input in "\\PC{0,50}") {
        prop_assert_eq!(validate(&input).valid, Address::parse(&input).is_ok());
    }
}
