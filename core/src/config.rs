//! SDK configuration.
//!
//! Defaults target the public PokeAPI. `from_env` lets hosts and tests point
//! the SDK at another base URL (the mock server, a mirror) without code
//! changes.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Listing size fetched by `search`. Entries past this offset are not
/// searchable.
pub const DEFAULT_SEARCH_LIMIT: u32 = 1000;

pub const BASE_URL_ENV: &str = "POKEDEX_BASE_URL";
pub const TIMEOUT_ENV: &str = "POKEDEX_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub page_size: u32,
    pub search_limit: u32,
    pub user_agent: String,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            search_limit: DEFAULT_SEARCH_LIMIT,
            user_agent: concat!("pokedex-sdk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SdkConfig {
    /// Defaults, overridden by `POKEDEX_BASE_URL` and `POKEDEX_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(value = %raw, "ignoring invalid {TIMEOUT_ENV}"),
            }
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
