use {
  log::warn,
  std::sync::atomic::{AtomicBool, Ordering},
};

pub use crate::{
  config::Config,
  error::{Error, Result, UpstreamError},
  indexer::Indexer,
};

pub mod adaptive;
pub mod arguments;
pub mod cache;
pub mod config;
pub mod error;
pub mod indexer;
pub mod metrics;
pub mod pattern;
pub mod pipeline;
pub mod protocol;
pub mod scanner;
pub mod store;
pub mod subcommand;
pub mod transfer;
pub mod upstream;

/// Fixture server and `Indexer` builder for integration tests (SPEC_FULL.md
/// §2.4). Always compiled (not `#[cfg(test)]`-gated) so `tests/lib.rs`, a
/// separate crate, can link against it; nothing here is part of the crate's
/// intended public API.
#[doc(hidden)]
pub mod test_support;

/// Set by signal handlers; checked between blocks by the scanner loop so a
/// shutdown never interrupts a block's writes (spec.md §5).
pub static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

pub fn shutdown_requested() -> bool {
  SHUTTING_DOWN.load(Ordering::Relaxed)
}

/// Installs handlers for INT, TERM, USR1 and USR2 that flip [`SHUTTING_DOWN`].
/// The scanner polls this flag between blocks rather than being interrupted
/// mid-write (spec.md §5, §6).
pub fn install_signal_handlers() -> anyhow::Result<()> {
  use signal_hook::{consts::*, iterator::Signals};

  let mut signals = Signals::new([SIGINT, SIGTERM, SIGUSR1, SIGUSR2])?;
  std::thread::spawn(move || {
    for signal in signals.forever() {
      warn!("received signal {signal}, scheduling graceful shutdown");
      SHUTTING_DOWN.store(true, Ordering::Relaxed);
    }
  });
  Ok(())
}
