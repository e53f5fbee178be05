// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Retry state machine and backoff math.
//!
//! Everything here is pure: no clocks, no randomness. The jitter sample is
//! passed in, so delays can be asserted exactly in tests.
//!
//! ```text
//! Pending ──success──▶ Succeeded
//!    │
//!    ├─retryable──▶ Retrying(1, initial_delay) ──retryable──▶ Retrying(2, d₂) ─ … ─▶ Failed
//!    │                    │                                        │
//!    └─fatal──▶ Failed    └─success──▶ Succeeded                   └─success──▶ Succeeded
//! ```

use std::time::Duration;

use super::retry::RetryConfig;

/// Classification of one attempt's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Network failure or a status in the retryable set
    RetryableFailure,
    /// Anything else; never retried
    FatalFailure,
}

/// Where a request is in its retry lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// No attempt has completed yet.
    Pending,
    /// `attempt` retries have been scheduled; the next one waits `delay`.
    Retrying { attempt: u32, delay: Duration },
    /// Finished successfully after `attempts` attempts.
    Succeeded { attempts: u32 },
    /// Gave up after `attempts` attempts.
    Failed { attempts: u32 },
}

impl RetryState {
    /// Attempts completed so far.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryState::Pending => 0,
            RetryState::Retrying { attempt, .. } => *attempt,
            RetryState::Succeeded { attempts } | RetryState::Failed { attempts } => *attempts,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RetryState::Succeeded { .. } | RetryState::Failed { .. })
    }

    /// Advances the machine with the outcome of the attempt that just finished.
    ///
    /// `jitter` is a sample in `[0, 1)`; it only affects the delay of a
    /// transition into `Retrying` from an earlier `Retrying`.
    pub fn advance(self, outcome: AttemptOutcome, config: &RetryConfig, jitter: f64) -> Self {
        let (completed, previous_delay) = match self {
            RetryState::Pending => (1, None),
            RetryState::Retrying { attempt, delay } => (attempt + 1, Some(delay)),
            terminal => return terminal,
        };

        match outcome {
            AttemptOutcome::Success => RetryState::Succeeded {
                attempts: completed,
            },
            AttemptOutcome::FatalFailure => RetryState::Failed {
                attempts: completed,
            },
            AttemptOutcome::RetryableFailure => {
                // `completed - 1` retries have already been used
                if completed > config.max_retries {
                    RetryState::Failed {
                        attempts: completed,
                    }
                } else {
                    RetryState::Retrying {
                        attempt: completed,
                        delay: next_delay(config, previous_delay, jitter),
                    }
                }
            }
        }
    }
}

/// Computes the wait before the next retry.
///
/// The first retry waits `initial_delay`. Every later retry waits
/// `min(max_delay, previous * factor * (1 + jitter_fraction * jitter))`.
/// With `factor >= 1` (enforced by [`RetryConfig::validate`]) the sequence is
/// non-decreasing when `jitter` is zero and never exceeds `max_delay`.
pub fn next_delay(config: &RetryConfig, previous: Option<Duration>, jitter: f64) -> Duration {
    let Some(previous) = previous else {
        return config.initial_delay.min(config.max_delay);
    };

    let jitter = if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled =
        previous.as_secs_f64() * config.factor * (1.0 + config.jitter_fraction * jitter);
    let cap = config.max_delay.as_secs_f64();

    if !scaled.is_finite() || scaled >= cap {
        return config.max_delay;
    }

    let delay = Duration::from_secs_f64(scaled.max(0.0));
    if config.factor >= 1.0 {
        // f64 round-tripping can lose a nanosecond
        delay.max(previous).min(config.max_delay)
    } else {
        delay
    }
}
