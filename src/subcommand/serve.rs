//! `serve` subcommand: run the scanner loop forever. Grounded in the
//! teacher's `subcommand/server.rs`, which likewise builds an `Index` and
//! keeps the process alive until a shutdown signal arrives.

use super::bootstrap;
use crate::{config::Config, scanner};

pub async fn run(config: Config) -> anyhow::Result<()> {
  let indexer = bootstrap(config).await?;
  scanner::run_forever(&indexer).await?;
  Ok(())
}
