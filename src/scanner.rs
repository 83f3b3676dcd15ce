//! Block Scanner (C7), spec.md §4.7. A resumable, cooperative outer loop:
//! retry due error-blocks, process the next unprocessed height, mark it
//! done, repeat. Grounded in `index/updater.rs::update_index`'s
//! "find starting height from the store, loop, commit, check a shutdown
//! flag" shape (Design Note §9), adapted from a `redb` write transaction
//! per iteration to one `pipeline::process_block` call per height.

use crate::{error::Result, indexer::Indexer, pipeline};

/// Runs the scanner loop forever (the `serve` subcommand's only job),
/// stopping when [`crate::shutdown_requested`] is observed between blocks
/// or when too many consecutive blocks fail outright (§7: "consecutive
/// block-level errors beyond a configured threshold cause graceful
/// shutdown").
pub async fn run_forever(indexer: &Indexer) -> Result<()> {
  run(indexer, None).await
}

/// Runs the scanner loop until `current_block` exceeds the chain tip (as
/// reported by the Tx service), then returns — the `index` subcommand's
/// one-shot behaviour. `tip` is re-resolved once per outer iteration so a
/// long catch-up run notices blocks mined while it was working.
pub async fn run_to_tip(indexer: &Indexer) -> Result<()> {
  run(indexer, Some(())).await
}

async fn run(indexer: &Indexer, stop_at_tip: Option<()>) -> Result<()> {
  let mut current = indexer.store.resume_height(indexer.config.start_block)?;
  let mut consecutive_failures = 0u32;

  loop {
    if crate::shutdown_requested() {
      log::info!("shutdown requested, scanner stopping at block {current}");
      break;
    }

    if stop_at_tip.is_some() {
      match indexer.upstream.tx.block_height().await {
        Ok(tip) if current > tip => {
          log::info!("reached chain tip {tip}, stopping");
          break;
        }
        Err(err) => log::warn!("could not resolve chain tip, continuing anyway: {err}"),
        _ => {}
      }
    }

    retry_due_error_blocks(indexer, current).await;

    let already_processed = indexer.store.block(current)?.map(|block| block.processed).unwrap_or(false);
    if already_processed {
      current += 1;
      continue;
    }

    match pipeline::process_block(indexer, current).await {
      Ok(_stats) => {
        let now = chrono::Utc::now().timestamp();
        indexer.store.mark_block_processed(current, now)?;
        indexer.store.clear_error_block(current)?;
        consecutive_failures = 0;
        current += 1;
      }
      Err(err) => {
        consecutive_failures += 1;
        let retry_at = current + indexer.config.retry_block_delay;
        log::error!("block {current}: failed (scheduling retry at {retry_at}): {err}");
        indexer.store.upsert_error_block(current, &err.to_string(), retry_at)?;
        if consecutive_failures >= indexer.config.consecutive_block_error_limit {
          log::error!(
            "{consecutive_failures} consecutive block failures reached the configured limit, shutting down"
          );
          break;
        }
        current += 1;
      }
    }
  }

  indexer.flush_wallet_batcher()?;
  indexer.store.checkpoint()?;
  Ok(())
}

/// Retry sweep (§4.7 step 1): reprocesses every ErrorBlock whose
/// `retry_at <= current`, clearing it on success and rescheduling it
/// (with an incremented `retry_count`) on another failure. Never aborts
/// the outer loop — a retry failing just leaves the row in place.
async fn retry_due_error_blocks(indexer: &Indexer, current: u64) {
  let due = match indexer.store.due_error_blocks(current) {
    Ok(due) => due,
    Err(err) => {
      log::error!("failed to list due error-blocks at {current}: {err}");
      return;
    }
  };

  for error_block in due {
    log::info!("retrying error-block {} (attempt {})", error_block.block_height, error_block.retry_count + 1);
    match pipeline::process_block(indexer, error_block.block_height).await {
      Ok(_stats) => {
        let now = chrono::Utc::now().timestamp();
        if let Err(err) = indexer.store.mark_block_processed(error_block.block_height, now) {
          log::error!("failed to mark retried block {} processed: {err}", error_block.block_height);
          continue;
        }
        if let Err(err) = indexer.store.clear_error_block(error_block.block_height) {
          log::error!("failed to clear error-block {}: {err}", error_block.block_height);
        }
      }
      Err(err) => {
        let retry_at = current + indexer.config.retry_block_delay;
        log::warn!("retry of block {} failed again (next retry at {retry_at}): {err}", error_block.block_height);
        if let Err(store_err) = indexer.store.upsert_error_block(error_block.block_height, &err.to_string(), retry_at)
        {
          log::error!("failed to reschedule error-block {}: {store_err}", error_block.block_height);
        }
      }
    }
  }
}
