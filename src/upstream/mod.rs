//! Upstream Client (C1), spec.md §4.1 and §6. Two HTTP collaborators — the
//! Ordinals service and the Address/Tx service — each with its own ordered
//! list of local candidate base URLs and an optional external fallback.
//!
//! Grounded in `src/rpc.rs`'s `BRCZeroRpcClient`, which builds one
//! `reqwest::Client` with default headers and reuses it for every call; this
//! module generalizes that single-endpoint client into one that probes a
//! candidate list and can re-probe and fall back at runtime (§4.1).

pub mod ordinals;
pub mod retry;
pub mod tx;
pub mod types;

use crate::{adaptive::ConcurrencyManager, cache::PreviewCache, error::UpstreamError};
use std::{
  sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
  },
  time::Duration,
};

pub use ordinals::OrdinalsClient;
pub use tx::TxClient;

/// Consecutive transient (or DNS-class) call failures a client tolerates
/// against its current primary before re-probing the candidate list (§4.1
/// paragraph 2: "on repeated Transient or DNS-class failures during
/// operation, the client re-probes"). One bad call is noise; three in a row
/// against the same primary means it is actually down.
const REPROBE_THRESHOLD: u32 = 3;

/// An ordered list of candidate base URLs for one upstream service, with an
/// optional external fallback used when local candidates are exhausted and
/// `use_local_apis_only` is false (§4.1, §6). Tracks consecutive call
/// failures against the current primary so a client can trigger re-discovery
/// without each call site re-implementing the threshold.
pub struct Endpoints {
  candidates: Vec<String>,
  external_fallback: Option<String>,
  local_only: bool,
  probe_path: String,
  primary: parking_lot::Mutex<Option<String>>,
  consecutive_failures: AtomicU32,
}

impl Endpoints {
  pub fn new(
    candidates: Vec<String>,
    external_fallback: Option<String>,
    local_only: bool,
    probe_path: impl Into<String>,
  ) -> Self {
    Self {
      candidates,
      external_fallback,
      local_only,
      probe_path: probe_path.into(),
      primary: parking_lot::Mutex::new(None),
      consecutive_failures: AtomicU32::new(0),
    }
  }

  /// Probes candidates in order, issuing one smoke GET per candidate and
  /// picking the first that succeeds within 10s (§4.1). Falls back to the
  /// external base URL unless `local_only` forbids it. Used both for the
  /// initial discovery at bootstrap and for re-discovery after repeated
  /// operational failures.
  pub async fn discover(&self, http: &reqwest::Client) -> Result<String, UpstreamError> {
    for candidate in &self.candidates {
      let ok = tokio::time::timeout(Duration::from_secs(10), probe(http, candidate, &self.probe_path))
        .await
        .unwrap_or(false);
      if ok {
        *self.primary.lock() = Some(candidate.clone());
        return Ok(candidate.clone());
      }
    }
    if !self.local_only {
      if let Some(fallback) = &self.external_fallback {
        *self.primary.lock() = Some(fallback.clone());
        return Ok(fallback.clone());
      }
    }
    Err(UpstreamError::Transient {
      endpoint: "discovery".to_string(),
      source: anyhow::anyhow!("no candidate base URL responded and no fallback is permitted"),
    })
  }

  pub fn current(&self) -> Option<String> {
    self.primary.lock().clone()
  }

  pub fn invalidate(&self) {
    *self.primary.lock() = None;
  }

  /// Feeds one call's outcome into the consecutive-failure counter. A
  /// success resets it; a transient/DNS-class failure that reaches
  /// [`REPROBE_THRESHOLD`] invalidates the current primary and re-runs
  /// discovery against `http` (§4.1 paragraph 2). Re-discovery failing is
  /// logged, not propagated — the caller already has the original error to
  /// return, and the next call will simply try again.
  pub async fn note_outcome<T>(&self, http: &reqwest::Client, result: &Result<T, UpstreamError>) {
    match result {
      Ok(_) => {
        self.consecutive_failures.store(0, Ordering::Relaxed);
      }
      Err(err) if err.is_transient() => {
        if self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1 >= REPROBE_THRESHOLD {
          self.consecutive_failures.store(0, Ordering::Relaxed);
          self.invalidate();
          log::warn!("re-probing endpoint candidates after {REPROBE_THRESHOLD} consecutive transient failures");
          if let Err(e) = self.discover(http).await {
            log::error!("endpoint re-discovery failed: {e}");
          }
        }
      }
      Err(_) => {}
    }
  }
}

/// Smoke-checks one candidate base URL by issuing a single GET and
/// accepting any non-5xx response (§4.1: "one smoke call per candidate").
async fn probe(http: &reqwest::Client, candidate: &str, path: &str) -> bool {
  match http.get(format!("{candidate}{path}")).send().await {
    Ok(response) => !response.status().is_server_error(),
    Err(_) => false,
  }
}

/// Builds the shared `reqwest::Client` used by both the Ordinals and Tx
/// clients. `Accept` headers are set per-request (§6 requires `application/
/// json` or `text/plain` depending on the endpoint), so the shared client
/// carries only connection-pooling configuration. No fixed per-request
/// timeout is set here: the retry combinator (`retry::BackoffPolicy`) owns
/// the growing per-attempt timeout (§4.1) via `tokio::time::timeout`, and a
/// client-level timeout would fight it on later attempts once the policy's
/// timeout grows past a fixed value.
pub fn build_http_client() -> reqwest::Client {
  reqwest::Client::builder().build().expect("failed to build reqwest client")
}

/// Bundles both upstream clients plus the shared preview cache and
/// concurrency manager, so the pipeline and transfer tracker depend on one
/// type instead of threading four.
pub struct Upstream {
  pub ordinals: OrdinalsClient,
  pub tx: TxClient,
  pub cache: Arc<PreviewCache>,
  pub concurrency: Arc<ConcurrencyManager>,
}

impl Upstream {
  pub fn new(
    ordinals: OrdinalsClient,
    tx: TxClient,
    cache: Arc<PreviewCache>,
    concurrency: Arc<ConcurrencyManager>,
  ) -> Self {
    Self { ordinals, tx, cache, concurrency }
  }
}
