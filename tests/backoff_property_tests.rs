// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for retry backoff
//!
//! These tests use proptest to validate invariants of the delay sequence and
//! the retry state machine across a wide range of configurations.

use std::time::Duration;

use proptest::prelude::*;
use walletscan::transport::{next_delay, AttemptOutcome, RetryConfig, RetryState};

// Helper to generate valid retry configurations
fn arb_config() -> impl Strategy<Value = RetryConfig> {
    (
        0u32..=8,
        1u64..=2_000,
        0u64..=120_000,
        1.0f64..=5.0,
        0.0f64..=1.0,
    )
        .prop_map(|(max_retries, initial_ms, extra_ms, factor, jitter_fraction)| RetryConfig {
            max_retries,
            initial_delay: Duration::from_millis(initial_ms),
            max_delay: Duration::from_millis(initial_ms + extra_ms),
            factor,
            jitter_fraction,
            ..RetryConfig::default()
        })
}

proptest! {
    /// Property: delays never decrease and never exceed `max_delay`
    #[test]
    fn prop_delays_monotonic_and_capped(
        config in arb_config(),
        jitters in prop::collection::vec(0.0f64..1.0, 1..30),
    ) {
        prop_assert!(config.validate().is_ok());

        let mut previous = None;
        for jitter in jitters {
            let delay = next_delay(&config, previous, jitter);
            prop_assert!(delay <= config.max_delay);
            if let Some(previous) = previous {
                prop_assert!(delay >= previous, "{:?} < {:?}", delay, previous);
            }
            previous = Some(delay);
        }
    }

    /// Property: the first retry always waits `initial_delay`
    #[test]
    fn prop_first_delay_is_initial(config in arb_config(), jitter in 0.0f64..1.0) {
        prop_assert_eq!(next_delay(&config, None, jitter), config.initial_delay);
    }

    /// Property: consecutive retryable failures give up after exactly
    /// `max_retries + 1` attempts
    #[test]
    fn prop_retry_budget_is_exact(config in arb_config()) {
        let mut state = RetryState::Pending;
        let mut attempts = 0;
        while !state.is_terminal() {
            attempts += 1;
            state = state.advance(AttemptOutcome::RetryableFailure, &config, 0.5);
        }
        prop_assert_eq!(attempts, config.max_retries + 1);
        prop_assert_eq!(state, RetryState::Failed { attempts: config.max_retries + 1 });
    }

    /// Property: a fatal failure is never retried
    #[test]
    fn prop_fatal_failure_is_terminal(config in arb_config()) {
        let state = RetryState::Pending.advance(AttemptOutcome::FatalFailure, &config, 0.0);
        prop_assert_eq!(state, RetryState::Failed { attempts: 1 });
    }
}
