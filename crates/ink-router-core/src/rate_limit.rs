//! Fixed-window rate limiter keyed by `(pipeline, client)`.
//!
//! Each pair owns one window: a request count and the timestamp the window
//! started. The first request opens a window with `count = 1`. Requests
//! inside the window are admitted while `count < limit`. Once
//! `now - window_start > window`, the next request resets the count to 1 and
//! restarts the window; counts are never partially decayed.
//!
//! A burst of up to `2 × limit` requests straddling a window boundary is
//! therefore admitted. That is the accepted behaviour of a fixed window.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::clock::Clock;

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: u64,
}

/// Outcome of a single [`RateLimiter::allow`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests still admissible in the current window.
    pub remaining: u32,
    /// When the current window ends (ms since epoch).
    pub window_reset_at: u64,
}

/// Shared fixed-window limiter.
pub struct RateLimiter {
    windows: Mutex<HashMap<(String, String), RateWindow>>,
    window_ms: u64,
    default_limit: u32,
    limits: HashMap<String, u32>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter with one window length and a fallback per-pair limit.
    pub fn new(window: Duration, default_limit: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_ms: window.as_millis().min(u64::MAX as u128) as u64,
            default_limit: default_limit.max(1),
            limits: HashMap::new(),
            clock,
        }
    }

    /// Override the limit for every client of `pipeline`.
    pub fn with_pipeline_limit(mut self, pipeline: impl Into<String>, limit: u32) -> Self {
        self.limits.insert(pipeline.into(), limit.max(1));
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(String, String), RateWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit_for(&self, pipeline: &str) -> u32 {
        self.limits
            .get(pipeline)
            .copied()
            .unwrap_or(self.default_limit)
    }

    /// Count one request for `(pipeline, client)` and decide whether to admit it.
    pub fn allow(&self, pipeline: &str, client: &str) -> RateDecision {
        debug_assert!(!pipeline.is_empty(), "pipeline id must not be empty");
        let limit = self.limit_for(pipeline);
        let now = self.clock.now_ms();
        let mut windows = self.lock();

        let window = windows
            .entry((pipeline.to_string(), client.to_string()))
            .or_insert(RateWindow {
                count: 0,
                window_start: now,
            });

        if window.count > 0 && now.saturating_sub(window.window_start) > self.window_ms {
            window.count = 0;
            window.window_start = now;
        }

        let allowed = window.count < limit;
        if allowed {
            window.count += 1;
        }

        RateDecision {
            allowed,
            remaining: limit.saturating_sub(window.count),
            window_reset_at: window.window_start.saturating_add(self.window_ms),
        }
    }

    /// Drop windows that have already elapsed. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let now = self.clock.now_ms();
        let mut windows = self.lock();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_sub(w.window_start) <= self.window_ms);
        before - windows.len()
    }

    /// Number of `(pipeline, client)` windows currently tracked.
    pub fn tracked_windows(&self) -> usize {
        self.lock().len()
    }

    /// Requests counted so far in the live window for `(pipeline, client)`.
    pub fn count(&self, pipeline: &str, client: &str) -> u32 {
        self.lock()
            .get(&(pipeline.to_string(), client.to_string()))
            .map(|w| w.count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(limit: u32, window_ms: u64) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(50_000));
        let limiter = RateLimiter::new(Duration::from_millis(window_ms), limit, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_fourth_call_in_window_is_refused() {
        let (limiter, _) = limiter(3, 1_000);
        let allowed: Vec<bool> = (0..4).map(|_| limiter.allow("p", "c").allowed).collect();
        assert_eq!(allowed, vec![true, true, true, false]);
    }

    #[test]
    fn test_window_resets_after_elapsing() {
        let (limiter, clock) = limiter(3, 1_000);
        for _ in 0..4 {
            limiter.allow("p", "c");
        }
        clock.advance(1_001);
        let decision = limiter.allow("p", "c");
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.window_reset_at, 50_000 + 1_001 + 1_000);
        assert_eq!(limiter.count("p", "c"), 1);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let (limiter, clock) = limiter(1, 1_000);
        assert!(limiter.allow("p", "c").allowed);
        clock.advance(1_000);
        assert!(!limiter.allow("p", "c").allowed, "exactly window length is still inside");
        clock.advance(1);
        assert!(limiter.allow("p", "c").allowed);
    }

    #[test]
    fn test_remaining_counts_down_to_zero() {
        let (limiter, _) = limiter(2, 1_000);
        assert_eq!(limiter.allow("p", "c").remaining, 1);
        assert_eq!(limiter.allow("p", "c").remaining, 0);
        let refused = limiter.allow("p", "c");
        assert!(!refused.allowed);
        assert_eq!(refused.remaining, 0);
        assert_eq!(refused.window_reset_at, 51_000);
    }

    #[test]
    fn test_pairs_are_independent() {
        let (limiter, _) = limiter(1, 1_000);
        assert!(limiter.allow("p", "a").allowed);
        assert!(limiter.allow("p", "b").allowed);
        assert!(limiter.allow("q", "a").allowed);
        assert!(!limiter.allow("p", "a").allowed);
        assert_eq!(limiter.tracked_windows(), 3);
    }

    #[test]
    fn test_pipeline_limit_override() {
        let (limiter, _) = limiter(1, 1_000);
        let limiter = limiter.with_pipeline_limit("busy", 3);
        assert_eq!(limiter.limit_for("busy"), 3);
        assert_eq!(limiter.limit_for("other"), 1);
        let allowed = (0..4).filter(|_| limiter.allow("busy", "c").allowed).count();
        assert_eq!(allowed, 3);
    }

    #[test]
    fn test_prune_drops_elapsed_windows() {
        let (limiter, clock) = limiter(5, 1_000);
        limiter.allow("p", "old");
        clock.advance(600);
        limiter.allow("p", "new");
        clock.advance(500);
        assert_eq!(limiter.prune(), 1);
        assert_eq!(limiter.tracked_windows(), 1);
        assert_eq!(limiter.count("p", "new"), 1);
    }

    #[test]
    fn test_concurrent_allow_never_exceeds_limit() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60), 50, clock));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..20).filter(|_| limiter.allow("p", "c").allowed).count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
