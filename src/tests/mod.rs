mod probe_orchestrator_tests;

use crate::platform_probe::{FetchError, FetchedPage, PageFetcher};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;

/// Canned behaviour for one fetch
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    /// Answer with a status; `None` final URL means "no redirect"
    Page(u16, Option<&'static str>),
    Timeout,
    Transport,
    Panic,
}

/// One observed fetch
#[derive(Debug, Clone)]
pub(crate) struct FetchCall {
    pub url: String,
    pub proxy: Option<String>,
    pub at: Instant,
}

/// Fetcher double keyed by URL.
///
/// Each URL replays its script in order and keeps repeating the last step.
/// Unknown URLs answer 404.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, Vec<Scripted>>>,
    calls: Mutex<Vec<FetchCall>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, url: &str, script: Vec<Scripted>) -> Self {
        self.scripts.lock().insert(url.to_string(), script);
        self
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, url: &str) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.url == url)
            .collect()
    }

    fn next_step(&self, url: &str) -> Scripted {
        let mut scripts = self.scripts.lock();
        match scripts.get_mut(url) {
            Some(script) if script.len() > 1 => script.remove(0),
            Some(script) if !script.is_empty() => script[0].clone(),
            _ => Scripted::Page(404, None),
        }
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, proxy: Option<&str>) -> Result<FetchedPage, FetchError> {
        self.calls.lock().push(FetchCall {
            url: url.to_string(),
            proxy: proxy.map(String::from),
            at: Instant::now(),
        });

        match self.next_step(url) {
            Scripted::Page(status, final_url) => Ok(FetchedPage {
                status,
                final_url: final_url.unwrap_or(url).to_string(),
            }),
            Scripted::Timeout => Err(FetchError::Timeout("deadline elapsed".to_string())),
            Scripted::Transport => Err(FetchError::Transport("connection reset".to_string())),
            Scripted::Panic => panic!("scripted panic for {url}"),
        }
    }
}
