//! Report assembly, persistence and terminal summary

use crate::config::ReaperConfig;
use crate::dns_analyzer::{DnsAnalyzer, DomainAnalysis};
use crate::platform_probe::{HttpFetcher, PageFetcher, PlatformProbe};
use crate::platforms::PlatformSpec;
use crate::probe_orchestrator::{ProbeOrchestrator, ScanReport};
use crate::proxy_rotator::{ProxyConfig, ProxyRotator};
use crate::rate_limit_manager::RateLimitManager;
use crate::username_analyzer::{analyze_username, RiskLevel, UsernameAnalysis};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Found platforms listed individually in the summary
const SUMMARY_FOUND_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteReport {
    pub brain_analyze: UsernameAnalysis,
    pub muscle_scan: ScanReport,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_analysis: Vec<DomainAnalysis>,
    pub timestamp: DateTime<Utc>,
}

/// Final document of a run; `Failed` replaces the body when the run could not start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OsintReport {
    Complete(Box<CompleteReport>),
    Failed { error: String },
}

/// Wires one run together: heuristic analysis, platform scan and DNS recon
pub struct ReportAssembler {
    config: ReaperConfig,
    proxy_config: ProxyConfig,
    progress: ProgressBar,
}

impl ReportAssembler {
    pub fn new(config: ReaperConfig, proxy_config: ProxyConfig) -> Self {
        Self {
            config,
            proxy_config,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Run a full scan over the network
    pub async fn run(
        &self,
        username: &str,
        platforms: &[PlatformSpec],
        domains: &[String],
    ) -> OsintReport {
        let fetcher = match HttpFetcher::new(
            self.config.request_timeout,
            self.config.session_timeout,
            self.config.max_connections,
        ) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                error!("OSINT scan failed: {}", e);
                return OsintReport::Failed {
                    error: e.to_string(),
                };
            }
        };
        warn!("TLS certificate verification is disabled for platform probes");

        self.run_with_fetcher(Arc::new(fetcher), username, platforms, domains)
            .await
    }

    /// Run a full scan with the given fetcher.
    ///
    /// Rate limiter and proxy rotator are created here so nothing leaks between runs.
    pub async fn run_with_fetcher(
        &self,
        fetcher: Arc<dyn PageFetcher>,
        username: &str,
        platforms: &[PlatformSpec],
        domains: &[String],
    ) -> OsintReport {
        info!("🔥 Starting OSINT scan for: {}", username);

        let brain_analyze = analyze_username(username);
        info!(
            "🧠 {} looks {} (risk {})",
            username,
            brain_analyze.pattern_type,
            brain_analyze.risk_assessment.level.as_str()
        );

        let rate_limiter = Arc::new(RateLimitManager::new(
            self.config.max_requests,
            self.config.time_window,
        ));
        let proxy_rotator = Arc::new(ProxyRotator::new(self.proxy_config.clone()));
        let probe = PlatformProbe::new(fetcher, rate_limiter, proxy_rotator)
            .with_max_retries(self.config.max_retries)
            .with_backoff_base(self.config.retry_backoff_base);
        let orchestrator = ProbeOrchestrator::new(probe, self.config.scan_config())
            .with_progress(self.progress.clone());

        let muscle_scan = orchestrator.scan(username, platforms).await;

        let mut dns_analysis = Vec::with_capacity(domains.len());
        if !domains.is_empty() {
            let analyzer = DnsAnalyzer::new(self.config.dns_timeout);
            for domain in domains {
                dns_analysis.push(analyzer.analyze_domain(domain).await);
            }
        }

        OsintReport::Complete(Box::new(CompleteReport {
            brain_analyze,
            muscle_scan,
            dns_analysis,
            timestamp: Utc::now(),
        }))
    }
}

/// Keep the username usable as a file name component
fn file_safe(username: &str) -> String {
    username
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write the report as pretty JSON to `<output_dir>/osint_<username>_<yyyyMMdd_HHmmss>.json`
pub fn save_report(
    report: &OsintReport,
    username: &str,
    output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error + Send + Sync>> {
    std::fs::create_dir_all(output_dir)
        .map_err(|e| format!("Failed to create {}: {}", output_dir.display(), e))?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = output_dir.join(format!("osint_{}_{}.json", file_safe(username), stamp));

    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

    info!("📁 Results saved to: {}", path.display());
    Ok(path)
}

/// Startup banner shown before a scan
pub fn render_banner() -> String {
    format!(
        "\n{}\n{}\n",
        "🔥 HANDY REAPER - Advanced OSINT Intelligence System 🔥"
            .magenta()
            .bold(),
        "        username reconnaissance across social platforms".magenta()
    )
}

pub fn print_banner() {
    println!("{}", render_banner());
}

/// Human-readable summary of a report
pub fn render_summary(report: &OsintReport) -> String {
    let report = match report {
        OsintReport::Complete(report) => report,
        OsintReport::Failed { error } => {
            return format!("{}\n", format!("❌ Scan failed: {error}").red());
        }
    };

    let stats = &report.muscle_scan.statistics;
    let rule = "=".repeat(50).cyan();
    let mut out = String::new();

    let _ = writeln!(out, "\n{}", "🔥 HANDY REAPER - OSINT REPORT".magenta().bold());
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{}", "📊 Summary:".bold());
    let _ = writeln!(out, "  Platforms Found: {}", stats.found.to_string().green());
    let _ = writeln!(out, "  Total Checked: {}", stats.total_platforms);
    let _ = writeln!(out, "  Errors: {}", stats.errors);
    let _ = writeln!(
        out,
        "  Success Rate: {}",
        format!("{:.1}%", stats.success_rate).cyan()
    );

    let level = report.brain_analyze.risk_assessment.level;
    let label = level.as_str().to_uppercase();
    let label = match level {
        RiskLevel::High => label.red(),
        RiskLevel::Medium => label.yellow(),
        RiskLevel::Low => label.green(),
    };
    let _ = writeln!(out, "  Risk Level: {label}");

    let found = report.muscle_scan.found_platforms();
    if !found.is_empty() {
        let _ = writeln!(out, "\n{}", "🔍 Found Profiles:".bold());
        for platform in found.iter().take(SUMMARY_FOUND_LIMIT) {
            let _ = writeln!(out, "  ✓ {platform}");
        }
        if found.len() > SUMMARY_FOUND_LIMIT {
            let _ = writeln!(out, "  ... and {} more", found.len() - SUMMARY_FOUND_LIMIT);
        }
    }

    for domain in &report.dns_analysis {
        let security = &domain.security;
        let _ = writeln!(
            out,
            "\n🌐 {}: SPF {} | DMARC {} | DKIM hints {}",
            domain.domain.bold(),
            yes_no(security.spf_configured),
            yes_no(security.dmarc_configured),
            yes_no(security.dkim_hints)
        );
    }

    let _ = writeln!(out, "{rule}");
    out
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".red()
    }
}

pub fn print_summary(report: &OsintReport) {
    print!("{}", render_summary(report));
}
