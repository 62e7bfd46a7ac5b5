//! Run configuration with environment overrides

use crate::probe_orchestrator::ScanConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct ReaperConfig {
    /// Probes launched together per batch
    pub batch_size: usize,
    pub inter_batch_delay: Duration,
    /// Attempts per platform, including the first
    pub max_retries: u32,
    /// Base of the exponential retry backoff
    pub retry_backoff_base: Duration,
    /// Admissions per platform inside `time_window`
    pub max_requests: usize,
    pub time_window: Duration,
    /// Timeout for a single probe request
    pub request_timeout: Duration,
    /// Upper bound applied by the shared HTTP client
    pub session_timeout: Duration,
    /// Simultaneous HTTP requests across all probes
    pub max_connections: usize,
    pub dns_timeout: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_millis(500),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            max_requests: 10,
            time_window: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(15),
            max_connections: 100,
            dns_timeout: Duration::from_secs(5),
        }
    }
}

impl ReaperConfig {
    /// Defaults overridden by `REAPER_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `REAPER_*` key.
    ///
    /// Values that don't parse are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            batch_size: parse_or(&lookup, "REAPER_BATCH_SIZE", defaults.batch_size).max(1),
            inter_batch_delay: Duration::from_millis(parse_or(
                &lookup,
                "REAPER_INTER_BATCH_DELAY_MS",
                defaults.inter_batch_delay.as_millis() as u64,
            )),
            max_retries: parse_or(&lookup, "REAPER_MAX_RETRIES", defaults.max_retries).max(1),
            retry_backoff_base: Duration::from_millis(parse_or(
                &lookup,
                "REAPER_RETRY_BACKOFF_MS",
                defaults.retry_backoff_base.as_millis() as u64,
            )),
            max_requests: parse_or(&lookup, "REAPER_MAX_REQUESTS", defaults.max_requests).max(1),
            time_window: Duration::from_secs(parse_or(
                &lookup,
                "REAPER_TIME_WINDOW_SECS",
                defaults.time_window.as_secs(),
            )),
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REAPER_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
            session_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REAPER_SESSION_TIMEOUT_SECS",
                defaults.session_timeout.as_secs(),
            )),
            max_connections: parse_or(&lookup, "REAPER_MAX_CONNECTIONS", defaults.max_connections)
                .max(1),
            dns_timeout: Duration::from_secs(parse_or(
                &lookup,
                "REAPER_DNS_TIMEOUT_SECS",
                defaults.dns_timeout.as_secs(),
            )),
        }
    }

    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            batch_size: self.batch_size,
            inter_batch_delay: self.inter_batch_delay,
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}
