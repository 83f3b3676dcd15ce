//! Typed configuration, per spec.md §6. Loading the file and merging
//! environment overrides is deliberately thin glue — spec.md §1 places
//! "configuration loading" outside the core's scope; what the core needs is
//! the `Config` type and sane `Default`/`test_default` constructors so every
//! component takes typed values instead of loose ones (Design Note §9,
//! "Global mutable state... encapsulate in an explicit Indexer context").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub start_block: u64,
  pub retry_block_delay: u64,
  pub use_local_apis_only: bool,
  pub ordinals_local_candidates: Vec<String>,
  pub tx_local_candidates: Vec<String>,
  pub ordinals_external_fallback: Option<String>,
  pub tx_external_fallback: Option<String>,
  pub db_path: String,
  pub cache_ttl_ms: u64,
  pub cache_pressure_threshold: f32,
  pub cache_emergency_mb: u64,
  pub concurrency_min: usize,
  pub concurrency_max: usize,
  pub concurrency_initial: usize,
  pub batch_min: usize,
  pub batch_max: usize,
  pub batch_initial: usize,
  pub process_timeout_seconds: u64,
  pub consecutive_block_error_limit: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      start_block: 0,
      retry_block_delay: 10,
      use_local_apis_only: false,
      ordinals_local_candidates: vec!["http://127.0.0.1:8080".to_string()],
      tx_local_candidates: vec!["http://127.0.0.1:3000".to_string()],
      ordinals_external_fallback: None,
      tx_external_fallback: None,
      db_path: "ordoverlay.sqlite3".to_string(),
      cache_ttl_ms: 5 * 60 * 1000,
      cache_pressure_threshold: 0.85,
      cache_emergency_mb: 3 * 1024,
      concurrency_min: 1,
      concurrency_max: 50,
      concurrency_initial: 10,
      batch_min: 10,
      batch_max: 200,
      batch_initial: 50,
      process_timeout_seconds: 120,
      consecutive_block_error_limit: 10,
    }
  }
}

impl Config {
  /// Loads configuration from a TOML file, falling back to defaults for any
  /// field the file omits.
  pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
    let text = std::fs::read_to_string(path)
      .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&text)
      .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
    Ok(config)
  }

  /// Not `#[cfg(test)]`-gated: `src/test_support.rs` calls this from a module
  /// that must stay compiled for `tests/lib.rs`, a separate crate that links
  /// against this one as an ordinary (non-`--cfg test`) dependency.
  pub fn test_default() -> Self {
    Self {
      db_path: ":memory:".to_string(),
      ..Default::default()
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn defaults_are_within_their_own_bounds() {
    let config = Config::default();
    assert!(config.concurrency_min <= config.concurrency_initial);
    assert!(config.concurrency_initial <= config.concurrency_max);
    assert!(config.batch_min <= config.batch_initial);
    assert!(config.batch_initial <= config.batch_max);
  }

  #[test]
  fn loads_partial_toml_with_defaults_for_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "start_block = 792000\ndb_path = \"/tmp/x.sqlite3\"\n").unwrap();
    let config = Config::load(&path).unwrap();
    assert_eq!(config.start_block, 792000);
    assert_eq!(config.db_path, "/tmp/x.sqlite3");
    assert_eq!(config.retry_block_delay, 10);
  }
}
