//! `stats` subcommand, supplemented per SPEC_FULL.md §10: grounded in the
//! teacher's `read_database_info` subcommand, which opens the index purely
//! to print a summary with no mutation. Prints the [`crate::store::StoreStats`]
//! snapshot as JSON, the same shape the teacher prints its own index
//! summaries in (`serde_json::to_string_pretty`).

use super::bootstrap;
use crate::config::Config;

pub async fn run(config: Config) -> anyhow::Result<()> {
  let indexer = bootstrap(config).await?;
  let stats = indexer.store.snapshot_stats()?;
  println!(
    "{}",
    serde_json::json!({
      "deploys": stats.deploys,
      "mints": stats.mints,
      "bitmaps": stats.bitmaps,
      "parcels": stats.parcels,
      "highest_processed_block": stats.highest_processed_block,
      "error_block_backlog": stats.error_block_backlog,
    })
  );
  Ok(())
}
