//! Preview Cache (C2), spec.md §4.2. A process-wide, time-expiring
//! `DashMap<String, (Vec<u8>, Instant)>`, sized by memory pressure rather
//! than cardinality. `preview:`, `content:`, `details:` are just key
//! prefixes applied by callers; spec.md §4.2 also names a `deployer:`
//! namespace, but since every deployer-address lookup here is just an
//! `inscription(id)` call, it is already covered by the `details:`
//! namespace — a separate prefix for the same cached value would only
//! duplicate entries under two keys.
//!
//! `dashmap` is already part of the teacher's dependency tree (used for
//! concurrent maps throughout `okx::datastore`); it is the natural fit here
//! too since the cache is read and written from many concurrently running
//! pipeline tasks (§5, "shared read/write across all tasks").

use dashmap::DashMap;
use std::{
  sync::Arc,
  time::{Duration, Instant},
};
use sysinfo::{System, SystemExt};

struct Entry {
  value: Vec<u8>,
  inserted_at: Instant,
}

pub struct PreviewCache {
  entries: DashMap<String, Entry>,
  ttl: Duration,
  pressure_threshold: f32,
  emergency_bytes: u64,
}

impl PreviewCache {
  pub fn new(ttl_ms: u64, pressure_threshold: f32, emergency_mb: u64) -> Arc<Self> {
    Arc::new(Self {
      entries: DashMap::new(),
      ttl: Duration::from_millis(ttl_ms),
      pressure_threshold,
      emergency_bytes: emergency_mb * 1024 * 1024,
    })
  }

  pub fn get(&self, key: &str) -> Option<Vec<u8>> {
    let fresh = self
      .entries
      .get(key)
      .filter(|entry| entry.inserted_at.elapsed() <= self.ttl)
      .map(|entry| entry.value.clone());
    if fresh.is_none() {
      self.entries.remove(key);
    }
    fresh
  }

  pub fn put(&self, key: String, value: Vec<u8>) {
    self.entries.insert(key, Entry { value, inserted_at: Instant::now() });
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Drops the oldest `fraction` of entries by insertion time. Used by both
  /// the pressure sweep (25%) and the emergency sweep (50%).
  fn evict_oldest_fraction(&self, fraction: f64) {
    let mut ages: Vec<(String, Instant)> = self
      .entries
      .iter()
      .map(|entry| (entry.key().clone(), entry.inserted_at))
      .collect();
    ages.sort_by_key(|(_, inserted_at)| *inserted_at);
    let to_evict = ((ages.len() as f64) * fraction).ceil() as usize;
    for (key, _) in ages.into_iter().take(to_evict) {
      self.entries.remove(&key);
    }
  }

  /// One sweep pass: discards expired entries, then applies memory-pressure
  /// eviction if the process is over threshold, or the emergency eviction if
  /// it is over the hard cap (§4.2).
  pub fn sweep(&self, system: &mut System) {
    let expired: Vec<String> = self
      .entries
      .iter()
      .filter(|entry| entry.inserted_at.elapsed() > self.ttl)
      .map(|entry| entry.key().clone())
      .collect();
    for key in expired {
      self.entries.remove(&key);
    }

    system.refresh_memory();
    let used = system.used_memory() * 1024;
    let total = system.total_memory().max(1) * 1024;
    let used_fraction = used as f32 / total as f32;

    if used >= self.emergency_bytes {
      log::warn!("preview cache emergency sweep: used={used} bytes >= cap={}", self.emergency_bytes);
      self.evict_oldest_fraction(0.5);
    } else if used_fraction > self.pressure_threshold {
      log::warn!("preview cache pressure sweep: used_fraction={used_fraction:.2}");
      self.evict_oldest_fraction(0.25);
    }
  }

  /// Spawns the background sweeper at a fixed interval; returns a handle the
  /// caller can abort on shutdown.
  pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
    let cache = self.clone();
    tokio::spawn(async move {
      let mut system = System::new();
      let mut ticker = tokio::time::interval(interval);
      loop {
        ticker.tick().await;
        cache.sweep(&mut system);
        if crate::shutdown_requested() {
          break;
        }
      }
    })
  }
}

pub fn preview_key(id: &str) -> String {
  format!("preview:{id}")
}

pub fn content_key(id: &str) -> String {
  format!("content:{id}")
}

pub fn details_key(id: &str) -> String {
  format!("details:{id}")
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn returns_none_after_ttl_elapses() {
    let cache = PreviewCache::new(0, 0.85, 3072);
    cache.put("preview:abc".to_string(), vec![1, 2, 3]);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(cache.get("preview:abc"), None);
  }

  #[test]
  fn returns_value_within_ttl() {
    let cache = PreviewCache::new(60_000, 0.85, 3072);
    cache.put("preview:abc".to_string(), vec![1, 2, 3]);
    assert_eq!(cache.get("preview:abc"), Some(vec![1, 2, 3]));
  }

  #[test]
  fn evicts_oldest_quarter_under_pressure() {
    let cache = PreviewCache::new(60_000, 0.0, u64::MAX);
    for i in 0..8 {
      cache.put(format!("preview:{i}"), vec![i as u8]);
      std::thread::sleep(Duration::from_millis(2));
    }
    let mut system = System::new();
    cache.sweep(&mut system);
    assert_eq!(cache.len(), 6);
    assert_eq!(cache.get("preview:0"), None);
    assert_eq!(cache.get("preview:1"), None);
  }
}
