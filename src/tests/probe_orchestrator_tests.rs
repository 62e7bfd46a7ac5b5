use super::{Scripted, ScriptedFetcher};
use crate::platform_probe::{PlatformProbe, ProbeResult, ProbeStatus};
use crate::platforms::PlatformSpec;
use crate::probe_orchestrator::{ProbeOrchestrator, ScanConfig, ScanStatistics};
use crate::proxy_rotator::ProxyRotator;
use crate::rate_limit_manager::RateLimitManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn site(name: &str) -> PlatformSpec {
    PlatformSpec::new(name, format!("https://{name}.example/{{username}}"))
}

fn create_orchestrator(fetcher: Arc<ScriptedFetcher>, config: ScanConfig) -> ProbeOrchestrator {
    let probe = PlatformProbe::new(
        fetcher,
        Arc::new(RateLimitManager::default()),
        Arc::new(ProxyRotator::default()),
    );
    ProbeOrchestrator::new(probe, config)
}

#[tokio::test(start_paused = true)]
async fn test_one_result_per_platform_with_mixed_outcomes() {
    let platforms: Vec<PlatformSpec> = ["found", "missing", "slow", "broken", "crashy", "quiet"]
        .into_iter()
        .map(site)
        .collect();
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .on(&platforms[0].resolve_url("bob"), vec![Scripted::Page(200, None)])
            .on(&platforms[1].resolve_url("bob"), vec![Scripted::Page(404, None)])
            .on(&platforms[2].resolve_url("bob"), vec![Scripted::Timeout])
            .on(&platforms[3].resolve_url("bob"), vec![Scripted::Transport])
            .on(&platforms[4].resolve_url("bob"), vec![Scripted::Panic]),
        // "quiet" has no script and answers 404
    );
    let orchestrator = create_orchestrator(fetcher, ScanConfig::default());

    let report = orchestrator.scan("bob", &platforms).await;

    assert_eq!(report.username, "bob");
    assert_eq!(report.platform_results.len(), platforms.len());
    for platform in &platforms {
        let result = &report.platform_results[&platform.name];
        assert_eq!(result.platform, platform.name);
    }

    let status = |name: &str| report.platform_results[name].status;
    assert_eq!(status("found"), ProbeStatus::Found);
    assert_eq!(status("missing"), ProbeStatus::NotFound);
    assert_eq!(status("slow"), ProbeStatus::Timeout);
    assert_eq!(status("broken"), ProbeStatus::Error);
    assert_eq!(status("crashy"), ProbeStatus::Error);
    assert_eq!(status("quiet"), ProbeStatus::NotFound);
    assert!(report.platform_results["crashy"]
        .error_message
        .as_deref()
        .unwrap()
        .contains("panicked"));

    let stats = &report.statistics;
    assert_eq!(stats.total_platforms, 6);
    assert_eq!(stats.found, 1);
    assert_eq!(stats.not_found, 2);
    assert_eq!(stats.errors, 3);
    assert_eq!(stats.found + stats.not_found + stats.errors, stats.total_platforms);
    assert_eq!(report.found_platforms(), vec!["found"]);
}

#[tokio::test(start_paused = true)]
async fn test_batches_run_sequentially_with_delay() {
    let platforms: Vec<PlatformSpec> = ["a", "b", "c", "d", "e"].into_iter().map(site).collect();
    let fetcher = Arc::new(ScriptedFetcher::new());
    let config = ScanConfig {
        batch_size: 2,
        inter_batch_delay: Duration::from_millis(500),
    };
    let orchestrator = create_orchestrator(fetcher.clone(), config);
    let start = Instant::now();

    orchestrator.scan("bob", &platforms).await;

    let offset = |name: &str| {
        let url = site(name).resolve_url("bob");
        fetcher.calls_for(&url)[0].at - start
    };
    // Probes in a batch start together
    assert_eq!(offset("a"), offset("b"));
    assert_eq!(offset("c"), Duration::from_millis(500));
    assert_eq!(offset("d"), Duration::from_millis(500));
    assert_eq!(offset("e"), Duration::from_millis(1000));
    // No trailing pause after the last batch
    assert_eq!(Instant::now() - start, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_next_batch_waits_for_slow_platform() {
    let platforms: Vec<PlatformSpec> = ["slow", "next"].into_iter().map(site).collect();
    let fetcher = Arc::new(ScriptedFetcher::new().on(
        &platforms[0].resolve_url("bob"),
        vec![Scripted::Timeout, Scripted::Page(200, None)],
    ));
    let config = ScanConfig {
        batch_size: 1,
        inter_batch_delay: Duration::from_millis(500),
    };
    let orchestrator = create_orchestrator(fetcher.clone(), config);
    let start = Instant::now();

    let report = orchestrator.scan("bob", &platforms).await;

    assert_eq!(report.platform_results["slow"].attempts, 2);
    let next_at = fetcher.calls_for(&platforms[1].resolve_url("bob"))[0].at - start;
    // 1s retry backoff then the batch pause
    assert_eq!(next_at, Duration::from_millis(1500));
}

#[tokio::test(start_paused = true)]
async fn test_empty_platform_list() {
    let orchestrator = create_orchestrator(Arc::new(ScriptedFetcher::new()), ScanConfig::default());

    let report = orchestrator.scan("bob", &[]).await;

    assert!(report.platform_results.is_empty());
    assert_eq!(report.statistics.total_platforms, 0);
    assert_eq!(report.statistics.success_rate, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_batch_size_still_scans() {
    let platforms: Vec<PlatformSpec> = ["a", "b"].into_iter().map(site).collect();
    let config = ScanConfig {
        batch_size: 0,
        inter_batch_delay: Duration::from_millis(10),
    };
    let orchestrator = create_orchestrator(Arc::new(ScriptedFetcher::new()), config);

    let report = orchestrator.scan("bob", &platforms).await;

    assert_eq!(report.platform_results.len(), 2);
}

#[test]
fn test_statistics_success_rate() {
    let results = vec![
        ProbeResult::answered("a", ProbeStatus::Found, 200, "https://a".to_string(), 1),
        ProbeResult::answered("b", ProbeStatus::NotFound, 404, "https://b".to_string(), 1),
        ProbeResult::failure("c", ProbeStatus::Timeout, "Request timeout", 3),
        ProbeResult::failure("d", ProbeStatus::Failed, "No attempts made", 3),
    ];

    let stats = ScanStatistics::from_results(&results);

    assert_eq!(stats.total_platforms, 4);
    assert_eq!(stats.found, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.errors, 2);
    assert!((stats.success_rate - 25.0).abs() < f64::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_results_keep_scan_order() {
    let platforms: Vec<PlatformSpec> = ["zeta", "github", "alpha", "mid"]
        .into_iter()
        .map(site)
        .collect();
    let mut fetcher = ScriptedFetcher::new();
    for platform in &platforms {
        fetcher = fetcher.on(&platform.resolve_url("bob"), vec![Scripted::Page(200, None)]);
    }
    let config = ScanConfig {
        batch_size: 3,
        inter_batch_delay: Duration::from_millis(10),
    };
    let orchestrator = create_orchestrator(Arc::new(fetcher), config);

    let report = orchestrator.scan("bob", &platforms).await;

    let keys: Vec<&str> = report.platform_results.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "github", "alpha", "mid"]);
    assert_eq!(report.found_platforms(), vec!["zeta", "github", "alpha", "mid"]);

    let json = serde_json::to_string(&report.platform_results).unwrap();
    assert!(json.starts_with(r#"{"zeta":"#), "{json}");
}

#[tokio::test(start_paused = true)]
async fn test_repeated_platform_is_checked_once() {
    let platforms = vec![
        site("alpha"),
        site("beta"),
        PlatformSpec::new("alpha", "https://other.example/{username}"),
    ];
    let fetcher = Arc::new(ScriptedFetcher::new().on(
        &platforms[0].resolve_url("bob"),
        vec![Scripted::Page(200, None)],
    ));
    let orchestrator = create_orchestrator(fetcher.clone(), ScanConfig::default());

    let report = orchestrator.scan("bob", &platforms).await;

    assert_eq!(report.platform_results.len(), 2);
    assert_eq!(report.statistics.total_platforms, 2);
    // The first entry wins; the repeat is never requested
    assert_eq!(report.platform_results["alpha"].status, ProbeStatus::Found);
    assert!(fetcher.calls_for("https://other.example/bob").is_empty());
    assert_eq!(fetcher.calls().len(), 2);
}
