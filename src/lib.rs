pub mod config;
pub mod dns_analyzer;
pub mod platform_probe;
pub mod platforms;
pub mod probe_orchestrator;
pub mod proxy_rotator;
pub mod rate_limit_manager;
pub mod report;
pub mod username_analyzer;

#[cfg(test)]
mod tests;

pub use config::ReaperConfig;
pub use dns_analyzer::{check_security, DnsAnalyzer, DomainAnalysis};
pub use platform_probe::{
    classify, FetchError, FetchedPage, HttpFetcher, PageFetcher, PlatformProbe, ProbeResult,
    ProbeStatus,
};
pub use platforms::{
    default_platforms, filter_platforms, validate_platforms, FoundRule, PlatformSpec,
};
pub use probe_orchestrator::{ProbeOrchestrator, ScanConfig, ScanReport, ScanStatistics};
pub use proxy_rotator::{load_proxy_list, ProxyConfig, ProxyRotator};
pub use rate_limit_manager::RateLimitManager;
pub use report::{
    print_banner, print_summary, render_banner, render_summary, save_report, OsintReport,
    ReportAssembler,
};
pub use username_analyzer::{analyze_username, check_username, RiskLevel, UsernameAnalysis};
