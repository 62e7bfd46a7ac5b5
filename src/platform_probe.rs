//! Single-platform existence check with retry and backoff

use crate::platforms::{FoundRule, PlatformSpec};
use crate::proxy_rotator::ProxyRotator;
use crate::rate_limit_manager::RateLimitManager;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, DNT, UPGRADE_INSECURE_REQUESTS,
    USER_AGENT,
};
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Found,
    NotFound,
    Timeout,
    Error,
    Failed,
}

impl ProbeStatus {
    /// Whether the probe ended without a usable HTTP answer
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ProbeStatus::Timeout | ProbeStatus::Error | ProbeStatus::Failed
        )
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProbeStatus::Found => "found",
            ProbeStatus::NotFound => "not_found",
            ProbeStatus::Timeout => "timeout",
            ProbeStatus::Error => "error",
            ProbeStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Outcome of probing one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub platform: String,
    pub status: ProbeStatus,
    #[serde(rename = "status_code", skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<u16>,
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub attempts: u32,
}

impl ProbeResult {
    pub fn answered(
        platform: &str,
        status: ProbeStatus,
        http_status_code: u16,
        final_url: String,
        attempts: u32,
    ) -> Self {
        Self {
            platform: platform.to_string(),
            status,
            http_status_code: Some(http_status_code),
            final_url: Some(final_url),
            error_message: None,
            attempts,
        }
    }

    pub fn failure(
        platform: &str,
        status: ProbeStatus,
        error_message: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            platform: platform.to_string(),
            status,
            http_status_code: None,
            final_url: None,
            error_message: Some(error_message.into()),
            attempts,
        }
    }
}

/// Map an HTTP answer to found / not found.
///
/// Only a 200 can be a hit; the platform rule then decides based on where
/// redirects landed.
pub fn classify(
    rule: &FoundRule,
    requested_url: &str,
    status: u16,
    final_url: &str,
) -> ProbeStatus {
    if status == 200 && rule.accepts(requested_url, final_url) {
        ProbeStatus::Found
    } else {
        ProbeStatus::NotFound
    }
}

/// Response details needed for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Timeout(String),
    Transport(String),
    InvalidProxy(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout(msg) => write!(f, "Request timeout: {msg}"),
            FetchError::Transport(msg) => write!(f, "Transport error: {msg}"),
            FetchError::InvalidProxy(msg) => write!(f, "Invalid proxy: {msg}"),
        }
    }
}

impl Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Issues one GET (following redirects) and reports where it landed
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<FetchedPage, FetchError>;
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// reqwest-backed fetcher shared by every probe of a run.
///
/// One client (and connection pool) is kept per distinct proxy. Certificate
/// verification is off: many profile hosts sit behind broken or intercepting
/// TLS and the probe only looks at status and final URL.
pub struct HttpFetcher {
    clients: Mutex<HashMap<Option<String>, Client>>,
    connection_slots: Semaphore,
    request_timeout: Duration,
    session_timeout: Duration,
}

impl HttpFetcher {
    pub fn new(
        request_timeout: Duration,
        session_timeout: Duration,
        max_connections: usize,
    ) -> Result<Self, FetchError> {
        // Build the direct client up front so a broken HTTP stack fails the run early
        let direct = Self::build_client(session_timeout, None)?;
        let mut clients = HashMap::new();
        clients.insert(None, direct);

        Ok(Self {
            clients: Mutex::new(clients),
            connection_slots: Semaphore::new(max_connections.max(1)),
            request_timeout,
            session_timeout,
        })
    }

    fn build_client(session_timeout: Duration, proxy: Option<&str>) -> Result<Client, FetchError> {
        let builder = Client::builder()
            .timeout(session_timeout)
            .default_headers(browser_headers())
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true);

        let builder = match proxy {
            Some(url) => builder.proxy(
                Proxy::all(url).map_err(|e| FetchError::InvalidProxy(format!("{url}: {e}")))?,
            ),
            None => builder.no_proxy(),
        };

        builder
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to build HTTP client: {e}")))
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<Client, FetchError> {
        let key = proxy.map(String::from);
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let client = Self::build_client(self.session_timeout, proxy)?;
        clients.insert(key, client.clone());
        Ok(client)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<FetchedPage, FetchError> {
        let client = self.client_for(proxy)?;
        let _permit = self
            .connection_slots
            .acquire()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let response = client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Ok(FetchedPage {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
        })
    }
}

/// Per-run probe context: fetcher, rate limiter and proxy rotator plus retry policy
#[derive(Clone)]
pub struct PlatformProbe {
    fetcher: Arc<dyn PageFetcher>,
    rate_limiter: Arc<RateLimitManager>,
    proxy_rotator: Arc<ProxyRotator>,
    max_retries: u32,
    backoff_base: Duration,
}

impl PlatformProbe {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        rate_limiter: Arc<RateLimitManager>,
        proxy_rotator: Arc<ProxyRotator>,
    ) -> Self {
        Self {
            fetcher,
            rate_limiter,
            proxy_rotator,
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Probe one platform, retrying transport failures with exponential backoff.
    ///
    /// Never fails: exhausted retries come back as `timeout` or `error` results.
    pub async fn check(&self, platform: &PlatformSpec, url: &str) -> ProbeResult {
        for attempt in 1..=self.max_retries {
            self.rate_limiter.acquire(&platform.name).await;
            let proxy = self.proxy_rotator.proxy_for_request();

            debug!(
                "Probing {} (attempt {}/{}) at {}",
                platform.name, attempt, self.max_retries, url
            );

            let failure = match self.fetcher.fetch(url, proxy.as_deref()).await {
                Ok(page) => {
                    let status = classify(&platform.rule, url, page.status, &page.final_url);
                    debug!(
                        "{} answered {} at {} -> {}",
                        platform.name, page.status, page.final_url, status
                    );
                    return ProbeResult::answered(
                        &platform.name,
                        status,
                        page.status,
                        page.final_url,
                        attempt,
                    );
                }
                Err(FetchError::Timeout(_)) => {
                    (ProbeStatus::Timeout, "Request timeout".to_string())
                }
                Err(e) => (ProbeStatus::Error, e.to_string()),
            };

            if attempt == self.max_retries {
                warn!(
                    "Giving up on {} after {} attempts: {}",
                    platform.name, attempt, failure.1
                );
                return ProbeResult::failure(&platform.name, failure.0, failure.1, attempt);
            }

            let delay = self.backoff_base * 2u32.pow(attempt - 1);
            debug!(
                "{} attempt {} failed ({}), retrying in {:?}",
                platform.name, attempt, failure.1, delay
            );
            sleep(delay).await;
        }

        ProbeResult::failure(
            &platform.name,
            ProbeStatus::Failed,
            "No attempts made",
            self.max_retries,
        )
    }
}
