use async_trait::async_trait;
use handy_reaper::{
    default_platforms, filter_platforms, save_report, FetchError, FetchedPage, OsintReport,
    PageFetcher, PlatformSpec, ProbeStatus, ProxyConfig, ReaperConfig, ReportAssembler,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Answers by URL: a status code, or a timeout when absent
struct CannedFetcher {
    pages: HashMap<String, u16>,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl CannedFetcher {
    fn new(pages: &[(&str, u16)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, status)| (url.to_string(), *status))
                .collect(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    fn attempts_for(&self, url: &str) -> Vec<Instant> {
        self.attempts.lock().get(url).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PageFetcher for CannedFetcher {
    async fn fetch(&self, url: &str, _proxy: Option<&str>) -> Result<FetchedPage, FetchError> {
        self.attempts
            .lock()
            .entry(url.to_string())
            .or_default()
            .push(Instant::now());

        match self.pages.get(url) {
            Some(status) => Ok(FetchedPage {
                status: *status,
                final_url: url.to_string(),
            }),
            None => Err(FetchError::Timeout("operation timed out".to_string())),
        }
    }
}

fn three_platforms() -> Vec<PlatformSpec> {
    vec![
        PlatformSpec::new("A", "https://a.example/{username}"),
        PlatformSpec::new("B", "https://b.example/{username}"),
        PlatformSpec::new("C", "https://c.example/{username}"),
    ]
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scan_with_mixed_outcomes() {
    let fetcher = Arc::new(CannedFetcher::new(&[
        ("https://a.example/admin_test123", 200),
        ("https://b.example/admin_test123", 404),
    ]));
    let assembler = ReportAssembler::new(ReaperConfig::default(), ProxyConfig::default());
    let start = Instant::now();

    let report = assembler
        .run_with_fetcher(fetcher.clone(), "admin_test123", &three_platforms(), &[])
        .await;

    let OsintReport::Complete(report) = report else {
        panic!("scan should complete");
    };

    let results = &report.muscle_scan.platform_results;
    assert_eq!(results.len(), 3);
    assert_eq!(results["A"].status, ProbeStatus::Found);
    assert_eq!(results["A"].http_status_code, Some(200));
    assert_eq!(results["B"].status, ProbeStatus::NotFound);
    assert_eq!(results["C"].status, ProbeStatus::Timeout);
    assert_eq!(results["C"].attempts, 3);

    let stats = &report.muscle_scan.statistics;
    assert_eq!(stats.total_platforms, 3);
    assert_eq!(stats.found, 1);
    assert_eq!(stats.not_found, 1);
    assert_eq!(stats.errors, 1);

    // Three attempts separated by 1s and 2s of backoff
    let attempts = fetcher.attempts_for("https://c.example/admin_test123");
    assert_eq!(attempts.len(), 3);
    assert!(attempts[2] - attempts[0] >= Duration::from_secs(3));
    assert!(Instant::now() - start >= Duration::from_secs(3));

    assert_eq!(report.brain_analyze.pattern_type, "generic");
    assert!(report
        .brain_analyze
        .patterns_detected
        .contains(&"generic".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_saved_report_round_trips_through_disk() {
    let fetcher = Arc::new(CannedFetcher::new(&[
        ("https://a.example/admin_test123", 200),
        ("https://b.example/admin_test123", 404),
        ("https://c.example/admin_test123", 404),
    ]));
    let assembler = ReportAssembler::new(ReaperConfig::default(), ProxyConfig::default());
    let report = assembler
        .run_with_fetcher(fetcher, "admin_test123", &three_platforms(), &[])
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = save_report(&report, "admin_test123", dir.path()).unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    let results = &saved["muscle_scan"]["platform_results"];
    assert_eq!(results["A"]["status"], "found");
    assert_eq!(results["A"]["status_code"], 200);
    assert_eq!(results["B"]["status"], "not_found");
    assert_eq!(saved["muscle_scan"]["statistics"]["total_platforms"], 3);
    assert_eq!(saved["brain_analyze"]["risk_assessment"]["level"], "low");
}

#[tokio::test]
#[ignore] // Hits github.com over the network
async fn test_live_github_check() {
    let names = vec!["github".to_string()];
    let platforms = filter_platforms(default_platforms(), Some(&names));
    let assembler = ReportAssembler::new(ReaperConfig::default(), ProxyConfig::default());

    let report = assembler.run("torvalds", &platforms, &[]).await;

    let OsintReport::Complete(report) = report else {
        panic!("scan should complete");
    };
    assert_eq!(
        report.muscle_scan.platform_results["github"].status,
        ProbeStatus::Found
    );
}
