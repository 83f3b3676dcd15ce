//! Observability gauges for the Adaptive Controllers and Preview Cache, per
//! SPEC_FULL.md §10: spec.md's Non-goals exclude the HTTP read API, not
//! observability of the core's own health, and the rolling statistics C4
//! already keeps (§4.4) are natural `prometheus` gauges. No HTTP exporter
//! lives here — that would cross into the excluded read-API territory —
//! the embedding binary owns the `Registry` and may serve or ignore it.

use prometheus::{Gauge, Registry};

pub struct Metrics {
  pub registry: Registry,
  pub concurrency_limit: Gauge,
  pub batch_size: Gauge,
  pub preview_cache_entries: Gauge,
  pub error_block_backlog: Gauge,
}

impl Metrics {
  pub fn new() -> anyhow::Result<Self> {
    let registry = Registry::new();

    let concurrency_limit = Gauge::new("ordoverlay_concurrency_limit", "Current in-flight upstream call limit")?;
    let batch_size = Gauge::new("ordoverlay_batch_size", "Current inscription-processing batch size")?;
    let preview_cache_entries = Gauge::new("ordoverlay_preview_cache_entries", "Preview cache entry count")?;
    let error_block_backlog = Gauge::new("ordoverlay_error_block_backlog", "Count of blocks awaiting retry")?;

    registry.register(Box::new(concurrency_limit.clone()))?;
    registry.register(Box::new(batch_size.clone()))?;
    registry.register(Box::new(preview_cache_entries.clone()))?;
    registry.register(Box::new(error_block_backlog.clone()))?;

    Ok(Self { registry, concurrency_limit, batch_size, preview_cache_entries, error_block_backlog })
  }

  /// Refreshes every gauge from its live source. Called once per
  /// `Adaptive Controller` tick so the gauges never lag more than one
  /// adjustment interval behind reality.
  pub fn refresh(&self, indexer: &crate::indexer::Indexer) {
    self.concurrency_limit.set(indexer.upstream.concurrency.limit() as f64);
    self.batch_size.set(indexer.batch_sizer.size() as f64);
    self.preview_cache_entries.set(indexer.upstream.cache.len() as f64);
    match indexer.store.error_block_count() {
      Ok(count) => self.error_block_backlog.set(count as f64),
      Err(err) => log::warn!("metrics: failed to read error-block backlog: {err}"),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn registers_every_gauge_exactly_once() {
    let metrics = Metrics::new().unwrap();
    assert_eq!(metrics.registry.gather().len(), 4);
  }
}
