//! Subcommand dispatch, grounded in the teacher's `Subcommand` enum and its
//! one-file-per-variant layout (`subcommand/index.rs`,
//! `subcommand/read_database_info.rs`). `bootstrap` replaces the teacher's
//! `Index::open(&options)` with this crate's own wiring: discover both
//! upstream endpoint sets, build the shared cache and adaptive controllers,
//! open the store, and hand back one [`Indexer`].

mod index;
mod serve;
mod stats;

use crate::{
  adaptive::ConcurrencyManager,
  cache::PreviewCache,
  config::Config,
  indexer::Indexer,
  store::Store,
  upstream::{build_http_client, Endpoints, OrdinalsClient, TxClient, Upstream},
};
use clap::Subcommand as ClapSubcommand;

#[derive(Debug, ClapSubcommand)]
pub enum Subcommand {
  /// Catch up to the current chain tip, then exit (§0).
  Index,
  /// Run the scanner loop forever, until a shutdown signal arrives (§0, §5).
  Serve,
  /// Print a snapshot of indexed counts and backlog (§10).
  Stats,
}

impl Subcommand {
  pub async fn run(self, config: Config) -> anyhow::Result<()> {
    match self {
      Self::Index => index::run(config).await,
      Self::Serve => serve::run(config).await,
      Self::Stats => stats::run(config).await,
    }
  }
}

/// Builds one [`Indexer`] from a loaded [`Config`]: opens the store, probes
/// both upstream endpoint sets, and wires the shared cache and adaptive
/// controllers through to both HTTP clients (§4.1, §4.2, §4.4, §4.9).
async fn bootstrap(config: Config) -> anyhow::Result<Indexer> {
  let store = Store::open(&config.db_path)?;

  let http = build_http_client();
  let cache = PreviewCache::new(config.cache_ttl_ms, config.cache_pressure_threshold, config.cache_emergency_mb);
  let concurrency =
    ConcurrencyManager::new(config.concurrency_min, config.concurrency_max, config.concurrency_initial);
  concurrency.spawn_adjuster();
  cache.spawn_sweeper(std::time::Duration::from_secs(30));

  let ordinals_endpoints = Endpoints::new(
    config.ordinals_local_candidates.clone(),
    config.ordinals_external_fallback.clone(),
    config.use_local_apis_only,
    "/inscriptions/block/0",
  );
  ordinals_endpoints.discover(&http).await?;

  let tx_endpoints = Endpoints::new(
    config.tx_local_candidates.clone(),
    config.tx_external_fallback.clone(),
    config.use_local_apis_only,
    "/blocks/tip/height",
  );
  tx_endpoints.discover(&http).await?;

  let ordinals = OrdinalsClient::new(http.clone(), ordinals_endpoints, concurrency.clone(), cache.clone());
  let tx = TxClient::new(http, tx_endpoints, concurrency.clone());
  let upstream = Upstream::new(ordinals, tx, cache, concurrency);

  Indexer::new(config, store, upstream)
}
