//! Thin binary shim, grounded in the teacher's `pub fn main()` (the teacher
//! keeps its real `main` in `lib.rs` and calls it from a one-line
//! `src/bin/main.rs`-equivalent entry point). This crate's `main` lives
//! here directly since there is no library-level output type analogous to
//! the teacher's `SubcommandResult` to print afterward.

use clap::Parser;
use ordoverlay::arguments::Arguments;

#[tokio::main]
async fn main() {
  env_logger::init();

  if let Err(err) = ordoverlay::install_signal_handlers() {
    eprintln!("error: failed to install signal handlers: {err}");
    std::process::exit(1);
  }

  let args = Arguments::parse();

  if let Err(err) = args.run().await {
    eprintln!("error: {err}");
    for cause in err.chain().skip(1) {
      eprintln!("because: {cause}");
    }
    std::process::exit(1);
  }
}
