//! Transfer Tracker (C8), spec.md §4.8. Runs after each block: re-resolves
//! the current holder of every tracked inscription and reconciles Wallet
//! rows and AddressHistory. Bounded parallelism via
//! `stream::iter(..).buffer_unordered(limit)`, the same idiom the
//! `CharmsDev` block processor reference file uses for its per-block fan-out
//! (`block_processor.rs`'s `buffer_unordered(batch_size)`), adapted here so
//! the bound tracks the live Concurrency Manager limit instead of a fixed
//! config value.

use crate::{indexer::Indexer, store::models::Wallet};
use futures::{stream, StreamExt};

/// Reconciles every tracked wallet against its current upstream holder.
/// Best-effort: a single inscription's failure is logged and skipped, never
/// aborts block finalisation (§4.8).
pub async fn reconcile(indexer: &Indexer, current_block: u64, now: i64) {
  let wallets = match indexer.store.all_wallets() {
    Ok(wallets) => wallets,
    Err(err) => {
      log::error!("transfer tracker: failed to list wallets for block {current_block}: {err}");
      return;
    }
  };

  let limit = indexer.upstream.concurrency.limit().max(1);
  let changed = stream::iter(wallets)
    .map(|wallet| reconcile_one(indexer, wallet, current_block, now))
    .buffer_unordered(limit)
    .filter_map(|result| async move { result })
    .count()
    .await;

  if changed > 0 {
    log::info!("transfer tracker: {changed} ownership change(s) at block {current_block}");
  }
}

async fn reconcile_one(indexer: &Indexer, wallet: Wallet, current_block: u64, now: i64) -> Option<()> {
  let current_address = match indexer.upstream.ordinals.inscription(&wallet.inscription_id).await {
    Ok(details) => details.address,
    Err(err) if err.is_not_found() => None,
    Err(err) => {
      log::warn!("transfer tracker: skipping {} after fetch failure: {err}", wallet.inscription_id);
      return None;
    }
  };

  let Some(new_address) = current_address else {
    return None;
  };
  if new_address == wallet.address {
    return None;
  }

  if let Err(err) = indexer.store.update_entity_wallet(wallet.kind, &wallet.inscription_id, &new_address) {
    log::error!("transfer tracker: failed to update entity wallet for {}: {err}", wallet.inscription_id);
    return None;
  }
  // Written directly rather than through `queue_wallet_upsert`'s size-50
  // batcher (§4.3): that batcher exists to coalesce the high-volume upserts
  // coming out of the pipeline, but here the entity-table update just above
  // already landed immediately, and §4.8 requires the `wallets` row to be
  // current by the time reconciliation for this block finishes, not
  // whenever the next block happens to fill the batch.
  if let Err(err) = indexer.store.upsert_wallet(&Wallet {
    inscription_id: wallet.inscription_id.clone(),
    address: new_address.clone(),
    kind: wallet.kind,
    updated_at: now,
  }) {
    log::error!("transfer tracker: failed to upsert wallet row for {}: {err}", wallet.inscription_id);
    return None;
  }
  if let Err(err) = indexer.store.record_address_history(&crate::store::models::AddressHistory {
    inscription_id: wallet.inscription_id.clone(),
    old_address: wallet.address.clone(),
    new_address,
    block_height: current_block,
    timestamp: now,
  }) {
    log::error!("transfer tracker: failed to record address history for {}: {err}", wallet.inscription_id);
    return None;
  }

  Some(())
}
