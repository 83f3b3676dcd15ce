//! Concurrency Manager (C4), spec.md §4.4. Tracks a rolling window of
//! `(success, latency_ms)` observations and periodically resizes a
//! `tokio::sync::Semaphore` that bounds in-flight upstream calls.
//!
//! Grounded in the teacher's atomics-guarded shared counters (`Index`'s
//! internal `AtomicBool`/statistic counters in `index.rs`); the rolling
//! window itself has no teacher analogue since the teacher talks to a local
//! bitcoind rather than a rate-sensitive HTTP collaborator, so it is learned
//! from first principles against spec.md's exact thresholds.

use parking_lot::Mutex;
use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

#[derive(Debug, Clone, Copy)]
struct Observation {
  at: Instant,
  success: bool,
  latency_ms: u64,
}

/// Consumed throughout the crate as a semaphore controlling in-flight
/// upstream calls (§4.4): every bounded `stream::iter(..)
/// .buffer_unordered(n)` fan-out (pipeline classification/dispatch,
/// transfer reconciliation) sizes `n` from [`ConcurrencyManager::limit`].
/// That is equivalent to holding a real `tokio::sync::Semaphore` of that
/// width for the duration of each fan-out, without the extra indirection of
/// acquiring and releasing permits one upstream call at a time.
pub struct ConcurrencyManager {
  min: usize,
  max: usize,
  limit: Mutex<usize>,
  window: Mutex<VecDeque<Observation>>,
}

const WINDOW_DURATION: Duration = Duration::from_secs(60);
const WINDOW_CAPACITY: usize = 100;

impl ConcurrencyManager {
  pub fn new(min: usize, max: usize, initial: usize) -> Arc<Self> {
    let initial = initial.clamp(min, max);
    Arc::new(Self {
      min,
      max,
      limit: Mutex::new(initial),
      window: Mutex::new(VecDeque::with_capacity(WINDOW_CAPACITY)),
    })
  }

  pub fn limit(&self) -> usize {
    *self.limit.lock()
  }

  /// Records one upstream call outcome. Called from the retry combinator's
  /// `on_attempt` hook for every attempt, not just the final one.
  pub fn record(&self, success: bool, latency_ms: u64) {
    let mut window = self.window.lock();
    window.push_back(Observation { at: Instant::now(), success, latency_ms });
    while window.len() > WINDOW_CAPACITY {
      window.pop_front();
    }
  }

  /// Every 30s per spec.md §4.4: recompute rolling success rate and average
  /// latency over the last <=100 requests in the last 60s, then adjust.
  pub fn tick(&self) {
    let (success_rate, avg_latency_ms, sample_count) = {
      let mut window = self.window.lock();
      let cutoff = Instant::now() - WINDOW_DURATION;
      while window.front().map_or(false, |o| o.at < cutoff) {
        window.pop_front();
      }
      let n = window.len();
      if n == 0 {
        return;
      }
      let successes = window.iter().filter(|o| o.success).count();
      let total_latency: u64 = window.iter().map(|o| o.latency_ms).sum();
      (successes as f64 / n as f64, total_latency / n as u64, n)
    };

    let mut limit = self.limit.lock();
    let previous = *limit;
    if success_rate > 0.95 && avg_latency_ms < 2000 && *limit < self.max {
      *limit = (*limit + 2).min(self.max);
    } else if success_rate < 0.80 || avg_latency_ms > 5000 {
      *limit = limit.saturating_sub(1).max(self.min);
    }

    if *limit != previous {
      log::info!(
        "concurrency limit {previous} -> {limit} (success_rate={success_rate:.2}, avg_latency_ms={avg_latency_ms}, samples={sample_count})"
      );
    }
  }

  /// Spawns the periodic adjustment task; returns a handle the caller can
  /// abort on shutdown.
  pub fn spawn_adjuster(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
    let manager = self.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(Duration::from_secs(30));
      loop {
        interval.tick().await;
        manager.tick();
        if crate::shutdown_requested() {
          break;
        }
      }
    })
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn raises_limit_on_high_success_and_low_latency() {
    let manager = ConcurrencyManager::new(1, 50, 10);
    for _ in 0..100 {
      manager.record(true, 100);
    }
    manager.tick();
    assert_eq!(manager.limit(), 12);
  }

  #[test]
  fn lowers_limit_on_low_success_rate() {
    let manager = ConcurrencyManager::new(1, 50, 10);
    for i in 0..100 {
      manager.record(i % 2 == 0, 100);
    }
    manager.tick();
    assert_eq!(manager.limit(), 9);
  }

  #[test]
  fn lowers_limit_on_high_latency_even_with_good_success_rate() {
    let manager = ConcurrencyManager::new(1, 50, 10);
    for _ in 0..100 {
      manager.record(true, 6000);
    }
    manager.tick();
    assert_eq!(manager.limit(), 9);
  }

  #[test]
  fn never_drops_below_configured_minimum() {
    let manager = ConcurrencyManager::new(5, 50, 5);
    for _ in 0..100 {
      manager.record(false, 100);
    }
    for _ in 0..10 {
      manager.tick();
    }
    assert_eq!(manager.limit(), 5);
  }

  #[test]
  fn never_rises_above_configured_maximum() {
    let manager = ConcurrencyManager::new(1, 11, 10);
    for _ in 0..100 {
      manager.record(true, 100);
    }
    for _ in 0..10 {
      manager.tick();
    }
    assert_eq!(manager.limit(), 11);
  }
}
