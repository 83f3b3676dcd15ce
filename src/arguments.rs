//! Top-level CLI surface, grounded in the teacher's `Arguments` (a global
//! `Options` flatten plus a `#[clap(subcommand)] Subcommand`). This crate
//! has no per-run chain/cookie options worth flattening, so `Arguments`
//! carries the config path directly instead of a separate `Options` type.

use crate::subcommand::Subcommand;
use clap::Parser;

#[derive(Debug, Parser)]
#[clap(version, about = "Bitcoin Ordinals inscription overlay indexer")]
pub struct Arguments {
  /// Path to a TOML config file (spec.md §6). Missing fields fall back to
  /// [`crate::Config::default`].
  #[clap(long, value_name = "PATH")]
  pub config: Option<std::path::PathBuf>,

  #[clap(subcommand)]
  pub subcommand: Subcommand,
}

impl Arguments {
  pub fn load_config(&self) -> anyhow::Result<crate::Config> {
    match &self.config {
      Some(path) => crate::Config::load(path),
      None => Ok(crate::Config::default()),
    }
  }

  pub async fn run(self) -> anyhow::Result<()> {
    let config = self.load_config()?;
    self.subcommand.run(config).await
  }
}
