//! `index` subcommand: catch up to the chain tip, then exit. Grounded in the
//! teacher's `subcommand/index.rs`, which likewise builds an `Index` and
//! runs its updater once to completion.

use super::bootstrap;
use crate::{config::Config, scanner};

pub async fn run(config: Config) -> anyhow::Result<()> {
  let indexer = bootstrap(config).await?;
  scanner::run_to_tip(&indexer).await?;
  Ok(())
}
