//! Proxy selection for outgoing probes

use std::error::Error;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Proxy settings for a run
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Whether probes go through a proxy at all
    pub enabled: bool,
    /// Proxy used when rotation is off or the list is empty
    pub static_proxy: Option<String>,
    pub rotation_enabled: bool,
    pub proxy_list: Vec<String>,
}

impl ProxyConfig {
    /// Route every request through a single proxy
    pub fn with_static(proxy: impl Into<String>) -> Self {
        Self {
            enabled: true,
            static_proxy: Some(proxy.into()),
            ..Self::default()
        }
    }

    /// Rotate round-robin through `proxy_list`
    pub fn with_rotation(proxy_list: Vec<String>) -> Self {
        Self {
            enabled: true,
            rotation_enabled: true,
            proxy_list,
            ..Self::default()
        }
    }
}

/// Read one proxy URL per line, skipping blanks and `#` comments
pub fn load_proxy_list(path: &Path) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read proxy list {}: {}", path.display(), e))?;

    let proxies: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect();

    info!("Loaded {} proxies from {}", proxies.len(), path.display());
    Ok(proxies)
}

/// Deterministic round-robin over the configured proxies
#[derive(Debug)]
pub struct ProxyRotator {
    config: ProxyConfig,
    cursor: AtomicUsize,
}

impl ProxyRotator {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Next proxy in rotation, or the static proxy when rotation is off
    pub fn next_proxy(&self) -> Option<String> {
        let list = &self.config.proxy_list;
        if !self.config.rotation_enabled || list.is_empty() {
            return self.config.static_proxy.clone();
        }

        let len = list.len();
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        list.get(index % len).cloned()
    }

    /// Proxy for one request, `None` when proxying is disabled
    pub fn proxy_for_request(&self) -> Option<String> {
        if self.config.enabled {
            self.next_proxy()
        } else {
            None
        }
    }
}

impl Default for ProxyRotator {
    fn default() -> Self {
        Self::new(ProxyConfig::default())
    }
}
