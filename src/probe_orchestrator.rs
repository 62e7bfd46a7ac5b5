//! Probe orchestrator - fans a username out over the platform table in batches
//!
//! Probes inside a batch run concurrently; batches run strictly one after
//! another with a short pause in between. Every platform ends up with exactly
//! one result, whatever happens to its probe, and results keep scan order.

use crate::platform_probe::{PlatformProbe, ProbeResult, ProbeStatus};
use crate::platforms::PlatformSpec;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Configuration for batch scheduling
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Number of probes launched together
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub inter_batch_delay: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            inter_batch_delay: Duration::from_millis(500),
        }
    }
}

/// Counts derived from a finished scan.
///
/// `errors` covers every probe without a usable answer (error, timeout,
/// failed), so `found + not_found + errors == total_platforms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStatistics {
    pub total_platforms: usize,
    pub found: usize,
    pub not_found: usize,
    pub errors: usize,
    /// Percentage of platforms where the username was found
    pub success_rate: f64,
}

impl ScanStatistics {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a ProbeResult>) -> Self {
        let mut total_platforms = 0;
        let mut found = 0;
        let mut not_found = 0;
        let mut errors = 0;

        for result in results {
            total_platforms += 1;
            match result.status {
                ProbeStatus::Found => found += 1,
                ProbeStatus::NotFound => not_found += 1,
                ProbeStatus::Timeout | ProbeStatus::Error | ProbeStatus::Failed => errors += 1,
            }
        }

        let success_rate = if total_platforms == 0 {
            0.0
        } else {
            found as f64 / total_platforms as f64 * 100.0
        };

        Self {
            total_platforms,
            found,
            not_found,
            errors,
            success_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub username: String,
    pub platform_results: IndexMap<String, ProbeResult>,
    pub statistics: ScanStatistics,
    pub timestamp: DateTime<Utc>,
}

impl ScanReport {
    /// Platforms where the username was found, in scan order
    pub fn found_platforms(&self) -> Vec<&str> {
        self.platform_results
            .values()
            .filter(|r| r.status == ProbeStatus::Found)
            .map(|r| r.platform.as_str())
            .collect()
    }
}

pub struct ProbeOrchestrator {
    probe: PlatformProbe,
    config: ScanConfig,
    progress: ProgressBar,
}

impl ProbeOrchestrator {
    pub fn new(probe: PlatformProbe, config: ScanConfig) -> Self {
        Self {
            probe,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-platform progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Probe every platform for `username` and assemble the scan report.
    ///
    /// Platforms are scanned in the given order. A repeated name is skipped so
    /// each platform is probed and recorded once.
    pub async fn scan(&self, username: &str, platforms: &[PlatformSpec]) -> ScanReport {
        let platforms = first_occurrences(platforms);
        let batch_size = self.config.batch_size.max(1);
        let batch_count = platforms.len().div_ceil(batch_size);

        info!(
            "💪 Muscle scanning {} across {} platforms in {} batches",
            username,
            platforms.len(),
            batch_count
        );
        self.progress.set_length(platforms.len() as u64);

        let mut platform_results = IndexMap::with_capacity(platforms.len());

        for (batch_index, batch) in platforms.chunks(batch_size).enumerate() {
            let handles: Vec<_> = batch
                .iter()
                .map(|&platform| {
                    let probe = self.probe.clone();
                    let platform = platform.clone();
                    let url = platform.resolve_url(username);
                    tokio::spawn(async move { probe.check(&platform, &url).await })
                })
                .collect();

            // Wait for every probe in this batch before moving on
            let outcomes = join_all(handles).await;

            for (platform, outcome) in batch.iter().zip(outcomes) {
                let result = match outcome {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => {
                        error!("Probe for {} panicked: {}", platform.name, e);
                        ProbeResult::failure(
                            &platform.name,
                            ProbeStatus::Error,
                            format!("Probe task panicked: {e}"),
                            1,
                        )
                    }
                    Err(e) => {
                        warn!("Probe for {} was cancelled: {}", platform.name, e);
                        ProbeResult::failure(
                            &platform.name,
                            ProbeStatus::Failed,
                            format!("Probe task cancelled: {e}"),
                            1,
                        )
                    }
                };

                self.record_progress(&result);
                platform_results.insert(platform.name.clone(), result);
            }

            if batch_index + 1 < batch_count {
                sleep(self.config.inter_batch_delay).await;
            }
        }

        let statistics = ScanStatistics::from_results(platform_results.values());
        self.progress.finish_with_message("Scan complete");

        info!(
            "Scan of {} finished: {} found, {} not found, {} errors",
            username, statistics.found, statistics.not_found, statistics.errors
        );

        ScanReport {
            username: username.to_string(),
            platform_results,
            statistics,
            timestamp: Utc::now(),
        }
    }

    fn record_progress(&self, result: &ProbeResult) {
        self.progress.inc(1);
        match result.status {
            ProbeStatus::Found => {
                self.progress.set_message(format!("✓ {}", result.platform));
                self.progress.println(format!("✓ Found on {}", result.platform));
            }
            status if status.is_failure() => {
                self.progress
                    .set_message(format!("⚠ {} ({})", result.platform, status));
            }
            _ => self.progress.set_message(result.platform.clone()),
        }
    }
}

/// Drop repeated platform names, keeping the first entry for each
fn first_occurrences(platforms: &[PlatformSpec]) -> Vec<&PlatformSpec> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(platforms.len());
    for platform in platforms {
        if seen.insert(platform.name.as_str()) {
            unique.push(platform);
        } else {
            warn!("Platform {} is listed more than once, skipping the repeat", platform.name);
        }
    }
    unique
}
