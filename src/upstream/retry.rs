//! Generic retry combinator. Design Note §9: "Promise-based retry loops...
//! express as a generic retry combinator accepting (classifier, backoff
//! policy, max_attempts)." Grounded in the doubling-backoff loops in
//! `index.rs::get_transaction_with_retries` and
//! `index/updater.rs::get_block_with_retries` in the teacher, generalized
//! from synchronous `thread::sleep` to `tokio::time::sleep` and from a
//! single endpoint to any async upstream call.

use crate::error::UpstreamError;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
  pub base_delay: Duration,
  pub cap: Duration,
  pub max_attempts: u32,
  pub initial_timeout: Duration,
  pub timeout_growth: f64,
}

impl BackoffPolicy {
  /// Per spec.md §4.1: delay `min(1s * 2^attempt, 30s)`, up to 5 attempts;
  /// per-call timeout starts at 30s and grows ×1.5 per attempt.
  pub fn upstream_default() -> Self {
    Self {
      base_delay: Duration::from_secs(1),
      cap: Duration::from_secs(30),
      max_attempts: 5,
      initial_timeout: Duration::from_secs(30),
      timeout_growth: 1.5,
    }
  }

  fn delay_for(&self, attempt: u32) -> Duration {
    let scaled = self.base_delay.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    scaled.min(self.cap)
  }

  fn timeout_for(&self, attempt: u32) -> Duration {
    let secs = self.initial_timeout.as_secs_f64() * self.timeout_growth.powi(attempt as i32);
    Duration::from_secs_f64(secs)
  }
}

#[cfg(test)]
mod policy_test {
  use super::*;

  #[test]
  fn timeout_grows_by_1_5x_per_attempt_from_30s() {
    let policy = BackoffPolicy::upstream_default();
    assert_eq!(policy.timeout_for(0), Duration::from_secs_f64(30.0));
    assert_eq!(policy.timeout_for(1), Duration::from_secs_f64(45.0));
    assert_eq!(policy.timeout_for(2), Duration::from_secs_f64(67.5));
  }
}

/// Retries `call` while it returns a transient `UpstreamError`, recording
/// `(success, latency_ms)` observations via `on_attempt`. A `NotFound` result
/// is returned immediately and does not count as a retry (§7). Each attempt
/// is bounded by `policy.timeout_for(attempt)`; a timed-out attempt is
/// treated as a transient failure so it participates in the same backoff
/// and retry-count logic as any other (§4.1).
pub async fn retry_with_backoff<T, F, Fut>(
  endpoint: &str,
  policy: BackoffPolicy,
  mut on_attempt: impl FnMut(bool, u64),
  mut call: F,
) -> Result<T, UpstreamError>
where
  F: FnMut() -> Fut,
  Fut: std::future::Future<Output = Result<T, UpstreamError>>,
{
  let mut attempt = 0u32;
  loop {
    let attempt_timeout = policy.timeout_for(attempt);
    let start = std::time::Instant::now();
    let result = match tokio::time::timeout(attempt_timeout, call()).await {
      Ok(result) => result,
      Err(_) => Err(UpstreamError::Transient {
        endpoint: endpoint.to_string(),
        source: anyhow::anyhow!("call exceeded {attempt_timeout:?} timeout"),
      }),
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
      Ok(value) => {
        on_attempt(true, latency_ms);
        return Ok(value);
      }
      Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
        on_attempt(false, latency_ms);
        let delay = policy.delay_for(attempt);
        log::warn!(
          "transient failure calling {endpoint} (attempt {}/{}), retrying in {:?}: {err}",
          attempt + 1,
          policy.max_attempts,
          delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(err) => {
        on_attempt(false, latency_ms);
        return Err(err);
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[tokio::test]
  async fn retries_transient_failures_until_success() {
    let attempts = AtomicU32::new(0);
    let policy = BackoffPolicy {
      base_delay: Duration::from_millis(1),
      cap: Duration::from_millis(5),
      max_attempts: 5,
      initial_timeout: Duration::from_secs(5),
      timeout_growth: 1.5,
    };
    let result = retry_with_backoff(
      "test",
      policy,
      |_, _| {},
      || {
        let n = attempts.fetch_add(1, Ordering::SeqCst);
        async move {
          if n < 2 {
            Err(UpstreamError::Transient {
              endpoint: "test".into(),
              source: anyhow::anyhow!("boom"),
            })
          } else {
            Ok(42)
          }
        }
      },
    )
    .await;
    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn not_found_is_returned_immediately_without_retrying() {
    let attempts = AtomicU32::new(0);
    let policy = BackoffPolicy {
      base_delay: Duration::from_millis(1),
      cap: Duration::from_millis(5),
      max_attempts: 5,
      initial_timeout: Duration::from_secs(5),
      timeout_growth: 1.5,
    };
    let result: Result<(), UpstreamError> = retry_with_backoff(
      "test",
      policy,
      |_, _| {},
      || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(UpstreamError::NotFound { endpoint: "test".into() }) }
      },
    )
    .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn gives_up_after_max_attempts() {
    let attempts = AtomicU32::new(0);
    let policy = BackoffPolicy {
      base_delay: Duration::from_millis(1),
      cap: Duration::from_millis(2),
      max_attempts: 3,
      initial_timeout: Duration::from_secs(5),
      timeout_growth: 1.5,
    };
    let result: Result<(), UpstreamError> = retry_with_backoff(
      "test",
      policy,
      |_, _| {},
      || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async {
          Err(UpstreamError::Transient {
            endpoint: "test".into(),
            source: anyhow::anyhow!("boom"),
          })
        }
      },
    )
    .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }
}
