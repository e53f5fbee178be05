// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Parsing of upstream rate-limit hints.
//!
//! Upstreams tell a throttled client when to come back in one of two forms:
//!
//! - `Retry-After: <seconds>` or `Retry-After: <HTTP-date>` (RFC 9110)
//! - `X-RateLimit-Reset: <value>`, either a unix timestamp in seconds or a
//!   number of seconds to wait. Values above [`EPOCH_THRESHOLD_SECS`] are read
//!   as timestamps.
//!
//! `Retry-After` takes precedence when both are present.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Header carrying a reset time or delta, as sent by most REST gateways.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// `X-RateLimit-Reset` values above this are unix timestamps (2001-09-09).
pub const EPOCH_THRESHOLD_SECS: u64 = 1_000_000_000;

/// An upstream instruction on when the next request may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitHint {
    /// Wait this long from receipt of the response.
    After(Duration),
    /// Wait until this instant.
    At(DateTime<Utc>),
}

impl RateLimitHint {
    /// How long to wait if the response was received at `now`.
    ///
    /// A target time already in the past yields zero.
    pub fn wait_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            RateLimitHint::After(duration) => *duration,
            RateLimitHint::At(target) => (*target - now).to_std().unwrap_or(Duration::ZERO),
        }
    }

    /// Parses a `Retry-After` value (delta seconds or HTTP-date).
    pub fn parse_retry_after(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(secs) = value.parse::<u64>() {
            return Some(RateLimitHint::After(Duration::from_secs(secs)));
        }
        if let Ok(secs) = value.parse::<f64>() {
            // Negative, NaN and values too large for a Duration are dropped
            return Duration::try_from_secs_f64(secs).ok().map(RateLimitHint::After);
        }
        DateTime::parse_from_rfc2822(value)
            .ok()
            .map(|date| RateLimitHint::At(date.with_timezone(&Utc)))
    }

    /// Parses an `X-RateLimit-Reset` value.
    pub fn parse_reset(value: &str) -> Option<Self> {
        let secs = value.trim().parse::<u64>().ok()?;
        if secs > EPOCH_THRESHOLD_SECS {
            let target = Utc.timestamp_opt(i64::try_from(secs).ok()?, 0).single()?;
            Some(RateLimitHint::At(target))
        } else {
            Some(RateLimitHint::After(Duration::from_secs(secs)))
        }
    }

    /// Extracts a hint from response headers, if any.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        header_str(RETRY_AFTER.as_str())
            .and_then(Self::parse_retry_after)
            .or_else(|| header_str(RATE_LIMIT_RESET_HEADER).and_then(Self::parse_reset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(
            RateLimitHint::parse_retry_after("7"),
            Some(RateLimitHint::After(Duration::from_secs(7)))
        );
        assert_eq!(
            RateLimitHint::parse_retry_after(" 0.5 "),
            Some(RateLimitHint::After(Duration::from_millis(500)))
        );
    }

    #[test]
    fn test_retry_after_http_date() {
        let hint = RateLimitHint::parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        let expected = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(hint, RateLimitHint::At(expected));

        let now = Utc.with_ymd_and_hms(2015, 10, 21, 7, 27, 30).unwrap();
        assert_eq!(hint.wait_from(now), Duration::from_secs(30));

        let later = Utc.with_ymd_and_hms(2015, 10, 21, 8, 0, 0).unwrap();
        assert_eq!(hint.wait_from(later), Duration::ZERO);
    }

    #[test]
    fn test_retry_after_garbage() {
        assert_eq!(RateLimitHint::parse_retry_after("soon"), None);
        assert_eq!(RateLimitHint::parse_retry_after("-3"), None);
        assert_eq!(RateLimitHint::parse_retry_after("-0.5"), None);
        assert_eq!(RateLimitHint::parse_retry_after("NaN"), None);
    }

    #[test]
    fn test_retry_after_oversized_value_is_ignored() {
        assert_eq!(RateLimitHint::parse_retry_after("1e30"), None);
        assert_eq!(RateLimitHint::parse_retry_after("inf"), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("1e30"));
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("5"));
        assert_eq!(
            RateLimitHint::from_headers(&headers),
            Some(RateLimitHint::After(Duration::from_secs(5)))
        );
    }

    #[test]
    fn test_reset_delta_and_epoch() {
        assert_eq!(
            RateLimitHint::parse_reset("12"),
            Some(RateLimitHint::After(Duration::from_secs(12)))
        );
        assert_eq!(
            RateLimitHint::parse_reset("1700000000"),
            Some(RateLimitHint::At(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
        );
    }

    #[test]
    fn test_from_headers_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("30"));
        assert_eq!(
            RateLimitHint::from_headers(&headers),
            Some(RateLimitHint::After(Duration::from_secs(30)))
        );

        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(
            RateLimitHint::from_headers(&headers),
            Some(RateLimitHint::After(Duration::from_secs(2)))
        );

        assert_eq!(RateLimitHint::from_headers(&HeaderMap::new()), None);
    }
}
