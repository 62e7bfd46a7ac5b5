use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Extra sleep after a computed wait so woken callers don't land exactly on the window edge
const WAKE_MARGIN: Duration = Duration::from_millis(100);

type AdmissionWindow = Arc<Mutex<VecDeque<Instant>>>;

/// Sliding-window admission control keyed by platform name.
///
/// Each key keeps the instants of its admissions inside the trailing window.
/// Old instants are pruned lazily on the next `acquire` for that key.
pub struct RateLimitManager {
    max_requests: usize,
    time_window: Duration,
    // Per-key windows; the outer lock is only held to look up or insert a key
    windows: Mutex<HashMap<String, AdmissionWindow>>,
}

impl RateLimitManager {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            time_window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn time_window(&self) -> Duration {
        self.time_window
    }

    /// Get or create the admission window for a key
    fn window_for(&self, key: &str) -> AdmissionWindow {
        let mut windows = self.windows.lock();
        windows
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }

    /// Wait until `key` has capacity in its window, then record the admission.
    ///
    /// Concurrent waiters on the same key all wake and race for the freed slot;
    /// losers compute a fresh wait and go back to sleep.
    pub async fn acquire(&self, key: &str) {
        let window = self.window_for(key);

        loop {
            let wait_time = {
                let mut admitted = window.lock();
                let now = Instant::now();

                while let Some(&oldest) = admitted.front() {
                    if now.duration_since(oldest) >= self.time_window {
                        admitted.pop_front();
                    } else {
                        break;
                    }
                }

                let oldest = admitted.front().copied();
                match oldest {
                    Some(oldest) if admitted.len() >= self.max_requests => {
                        self.time_window.saturating_sub(now.duration_since(oldest))
                    }
                    _ => {
                        admitted.push_back(now);
                        debug!(
                            "Admitted request for {} ({}/{} in window)",
                            key,
                            admitted.len(),
                            self.max_requests
                        );
                        return;
                    }
                }
            };

            warn!(
                "Rate limit reached for {}. Waiting {:.2}s",
                key,
                wait_time.as_secs_f64()
            );
            sleep(wait_time + WAKE_MARGIN).await;
        }
    }
}

impl Default for RateLimitManager {
    fn default() -> Self {
        // 10 requests per minute per platform
        Self::new(10, Duration::from_secs(60))
    }
}
