// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

//! Configuration for walletscan runs
//!
//! This module provides the configuration for the upstream client (endpoints,
//! credentials, retry and rate limiting), pagination limits, and the on-disk
//! data directory.
//!
//! # Example: Using defaults
//!
//! ```rust
//! use walletscan::WalletscanConfig;
//!
//! let config = WalletscanConfig::default();
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Example: Custom configuration
//!
//! ```rust
//! use walletscan::{MaxPages, WalletscanConfigBuilder};
//!
//! let config = WalletscanConfigBuilder::with_defaults()
//!     .max_pages(MaxPages::new(10))
//!     .max_retries(3)
//!     .rate_limit_per_second(2)
//!     .build();
//! assert_eq!(config.retry.max_retries, 3);
//! ```
//!
//! # Example: From the environment
//!
//! ```rust,no_run
//! use walletscan::WalletscanConfig;
//!
//! dotenvy::dotenv().ok();
//! let config = WalletscanConfig::from_env()?;
//! # Ok::<(), walletscan::ConfigError>(())
//! ```

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::config_types::{MaxPages, PageSize};
use crate::errors::ConfigError;
use crate::transport::RetryConfig;

pub mod constants;

use constants::endpoints::{DEFAULT_API_BASE_URL, DEFAULT_RPC_URL};

/// Environment variable holding the REST API key.
pub const API_KEY_ENV: &str = "SOLSCAN_API_KEY";
pub const API_URL_ENV: &str = "WALLETSCAN_API_URL";
pub const RPC_URL_ENV: &str = "WALLETSCAN_RPC_URL";
pub const DATA_DIR_ENV: &str = "WALLETSCAN_DATA_DIR";
pub const MAX_PAGES_ENV: &str = "WALLETSCAN_MAX_PAGES";
pub const MAX_RETRIES_ENV: &str = "WALLETSCAN_MAX_RETRIES";
pub const PAGE_SIZE_ENV: &str = "WALLETSCAN_PAGE_SIZE";
pub const FORCE_REFRESH_ENV: &str = "WALLETSCAN_FORCE_REFRESH";
pub const RATE_LIMIT_ENV: &str = "WALLETSCAN_RATE_LIMIT_PER_SECOND";
pub const TRANSACTION_SOURCE_ENV: &str = "WALLETSCAN_TRANSACTION_SOURCE";
pub const VERBOSE_ENV: &str = "WALLETSCAN_VERBOSE";

/// Default directory for artifacts, pages and the error ledger
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default number of optional endpoints fetched concurrently
pub const DEFAULT_COLLECTION_CONCURRENCY: usize = 3;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default request budget per second (Solscan Pro allows bursts above this)
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 5;

/// Which upstream feeds the paginated transaction store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionSourceKind {
    /// JSON-RPC `getSignaturesForAddress`
    #[default]
    Rpc,
    /// REST `account/transactions`
    Rest,
}

impl TransactionSourceKind {
    /// Largest page the upstream accepts.
    pub const fn max_page_size(&self) -> PageSize {
        match self {
            TransactionSourceKind::Rpc => PageSize::RPC_SIGNATURES_MAX,
            TransactionSourceKind::Rest => PageSize::REST_TRANSACTIONS_MAX,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            TransactionSourceKind::Rpc => "getSignaturesForAddress",
            TransactionSourceKind::Rest => "account/transactions",
        }
    }
}

impl FromStr for TransactionSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpc" => Ok(TransactionSourceKind::Rpc),
            "rest" => Ok(TransactionSourceKind::Rest),
            other => Err(format!("expected 'rpc' or 'rest', got '{other}'")),
        }
    }
}

/// Configuration for walletscan operations
///
/// Use [`WalletscanConfigBuilder`] for a fluent API to construct instances.
#[derive(Debug, Clone)]
pub struct WalletscanConfig {
    /// REST API base URL (Solscan Pro v2 style)
    pub api_base_url: Url,

    /// Solana JSON-RPC endpoint
    pub rpc_url: Url,

    /// REST API key, sent in the `token` header
    pub api_key: Option<String>,

    /// Directory for pages, summaries, artifacts and the error ledger
    pub data_dir: PathBuf,

    /// Records requested per page
    /// Default: 100
    pub page_size: PageSize,

    /// Upper bound on pages per pagination run
    /// Default: unlimited
    pub max_pages: MaxPages,

    /// Retry policy applied to every upstream call
    pub retry: RetryConfig,

    /// Token bucket budget; 0 disables client-side rate limiting
    /// Default: 5
    pub rate_limit_per_second: u32,

    /// Timeout for a single request attempt
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Ignore cached artifacts and fetch everything again
    pub force_refresh: bool,

    /// Optional endpoints fetched concurrently
    /// Default: 3
    pub collection_concurrency: usize,

    /// Upstream feeding the transaction page store
    pub transaction_source: TransactionSourceKind,

    /// Debug-level logging in the binary
    pub verbose: bool,
}

impl Default for WalletscanConfig {
    fn default() -> Self {
        Self::with_common_defaults()
    }
}

/// Parse a compile-time constant URL.
fn default_url(raw: &'static str) -> Url {
    // Constants are checked by the config tests
    Url::parse(raw).unwrap_or_else(|e| panic!("invalid built-in URL {raw}: {e}"))
}

impl WalletscanConfig {
    /// Create config with defaults for the public Solscan Pro API and
    /// mainnet RPC.
    pub fn with_common_defaults() -> Self {
        Self {
            api_base_url: default_url(DEFAULT_API_BASE_URL),
            rpc_url: default_url(DEFAULT_RPC_URL),
            api_key: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            page_size: PageSize::DEFAULT,
            max_pages: MaxPages::UNLIMITED,
            retry: RetryConfig::default(),
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            force_refresh: false,
            collection_concurrency: DEFAULT_COLLECTION_CONCURRENCY,
            transaction_source: TransactionSourceKind::Rpc,
            verbose: false,
        }
    }

    /// Create minimal config with no client-side rate limiting and a short
    /// retry schedule
    ///
    /// Suitable for tests or premium endpoints with generous limits.
    ///
    /// ```rust
    /// use walletscan::WalletscanConfig;
    ///
    /// let config = WalletscanConfig::minimal();
    /// assert_eq!(config.rate_limit_per_second, 0);
    /// ```
    pub fn minimal() -> Self {
        Self {
            rate_limit_per_second: 0,
            retry: RetryConfig {
                max_retries: 2,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
                ..RetryConfig::default()
            },
            ..Self::with_common_defaults()
        }
    }

    /// Create a config for shared or free-tier endpoints: one request per
    /// second and a longer retry schedule.
    pub fn conservative() -> Self {
        Self {
            rate_limit_per_second: 1,
            retry: RetryConfig {
                max_retries: 3,
                initial_delay: Duration::from_secs(2),
                max_delay: Duration::from_secs(120),
                jitter_fraction: 0.2,
                ..RetryConfig::default()
            },
            ..Self::with_common_defaults()
        }
    }

    /// Build a config from environment variables on top of the defaults.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file. Unset
    /// variables keep their default; set but unparsable ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::with_common_defaults();

        if let Some(key) = env_var(API_KEY_ENV) {
            config.api_key = Some(key);
        }
        if let Some(raw) = env_var(API_URL_ENV) {
            config.api_base_url = parse_base_url(API_URL_ENV, &raw)?;
        }
        if let Some(raw) = env_var(RPC_URL_ENV) {
            config.rpc_url = Url::parse(&raw).map_err(|e| env_error(RPC_URL_ENV, &raw, e))?;
        }
        if let Some(raw) = env_var(DATA_DIR_ENV) {
            config.data_dir = PathBuf::from(raw);
        }
        if let Some(raw) = env_var(MAX_PAGES_ENV) {
            let pages = raw
                .parse::<usize>()
                .map_err(|e| env_error(MAX_PAGES_ENV, &raw, e))?;
            config.max_pages = MaxPages::new(pages);
        }
        if let Some(raw) = env_var(MAX_RETRIES_ENV) {
            config.retry.max_retries = raw
                .parse::<u32>()
                .map_err(|e| env_error(MAX_RETRIES_ENV, &raw, e))?;
        }
        if let Some(raw) = env_var(PAGE_SIZE_ENV) {
            let size = raw
                .parse::<usize>()
                .map_err(|e| env_error(PAGE_SIZE_ENV, &raw, e))?;
            config.page_size =
                PageSize::new(size).ok_or_else(|| env_error(PAGE_SIZE_ENV, &raw, "must be > 0"))?;
        }
        if let Some(raw) = env_var(FORCE_REFRESH_ENV) {
            config.force_refresh = parse_flag(FORCE_REFRESH_ENV, &raw)?;
        }
        if let Some(raw) = env_var(RATE_LIMIT_ENV) {
            config.rate_limit_per_second = raw
                .parse::<u32>()
                .map_err(|e| env_error(RATE_LIMIT_ENV, &raw, e))?;
        }
        if let Some(raw) = env_var(TRANSACTION_SOURCE_ENV) {
            config.transaction_source = raw
                .parse()
                .map_err(|e: String| env_error(TRANSACTION_SOURCE_ENV, &raw, e))?;
        }
        if let Some(raw) = env_var(VERBOSE_ENV) {
            config.verbose = parse_flag(VERBOSE_ENV, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants.
    ///
    /// ```rust
    /// use walletscan::{PageSize, TransactionSourceKind, WalletscanConfigBuilder};
    ///
    /// let config = WalletscanConfigBuilder::new()
    ///     .transaction_source(TransactionSourceKind::Rest)
    ///     .page_size(PageSize::new(100).unwrap())
    ///     .build();
    /// // account/transactions serves at most 40 records per page
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;

        let max = self.transaction_source.max_page_size();
        if !self.page_size.fits(max.get()) {
            return Err(ConfigError::invalid_value(
                "page_size",
                format!(
                    "{} exceeds the {} maximum of {}",
                    self.page_size.get(),
                    self.transaction_source.name(),
                    max.get()
                ),
            ));
        }
        if self.collection_concurrency == 0 {
            return Err(ConfigError::invalid_value(
                "collection_concurrency",
                "must be at least 1",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid_value("request_timeout", "must be > 0"));
        }
        Ok(())
    }
}

/// Builder for [`WalletscanConfig`]
///
/// ```rust
/// use walletscan::WalletscanConfigBuilder;
/// use std::time::Duration;
///
/// let config = WalletscanConfigBuilder::new()
///     .api_key("secret")
///     .request_timeout(Duration::from_secs(10))
///     .force_refresh(true)
///     .build();
/// assert!(config.force_refresh);
/// ```
#[derive(Debug, Clone)]
pub struct WalletscanConfigBuilder {
    config: WalletscanConfig,
}

impl Default for WalletscanConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletscanConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        Self {
            config: WalletscanConfig::minimal(),
        }
    }

    /// Start with common defaults
    pub fn with_defaults() -> Self {
        Self {
            config: WalletscanConfig::with_common_defaults(),
        }
    }

    /// Set the REST API base URL. A trailing slash is added if missing so
    /// endpoint paths join under it.
    pub fn api_base_url(mut self, url: Url) -> Self {
        self.config.api_base_url = with_trailing_slash(url);
        self
    }

    pub fn rpc_url(mut self, url: Url) -> Self {
        self.config.rpc_url = url;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn max_pages(mut self, pages: MaxPages) -> Self {
        self.config.max_pages = pages;
        self
    }

    /// Replace the whole retry policy
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.retry.max_retries = retries;
        self
    }

    /// Requests per second; 0 disables client-side limiting
    pub fn rate_limit_per_second(mut self, requests: u32) -> Self {
        self.config.rate_limit_per_second = requests;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.config.force_refresh = force;
        self
    }

    pub fn collection_concurrency(mut self, concurrency: usize) -> Self {
        self.config.collection_concurrency = concurrency;
        self
    }

    pub fn transaction_source(mut self, source: TransactionSourceKind) -> Self {
        self.config.transaction_source = source;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Build the configuration
    pub fn build(self) -> WalletscanConfig {
        self.config
    }
}

fn env_var(name: &str) -> Option<String> {
    dotenvy::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn env_error(var: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Env {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(env_error(var, raw, "expected a boolean flag")),
    }
}

fn parse_base_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw)
        .map(with_trailing_slash)
        .map_err(|e| env_error(var, raw, e))
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
