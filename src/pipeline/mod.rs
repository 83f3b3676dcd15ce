//! Inscription Pipeline (C5), spec.md §4.5. Orchestrates the six steps —
//! paginated fetch, content-type pre-filter, preview classification,
//! prioritised queueing, per-inscription validation with retry, and
//! block-end completion — over one block. `scanner.rs` calls
//! [`process_block`] once per height and never calls it twice
//! concurrently (§5: "single-threaded cooperative outer loop").

pub mod classify;
pub mod fetch;
pub mod priority;

use crate::{
  error::{Outcome, Reason, Result},
  indexer::Indexer,
  pattern,
  protocol::{
    bitmap,
    brc420::{deploy::DeployPayload, deploy, mint},
    parcel,
  },
  store::models::{BlockStats, FailedInscription},
};
use classify::{classify_preview, is_parcel_content, InscriptionKind};
use futures::{stream, StreamExt};
use std::{collections::HashMap, time::Duration};

/// Length of the "50-byte prefix" preview fetched per §4.5 step 3. A real
/// BRC-420 mint reference (`/content/<64-hex>i<digits>`) is longer than 50
/// bytes, so a preview-only classification can never positively match the
/// mint rule; [`classify_one`] below re-runs classification against full
/// content whenever the preview comes back `Text` or `Unknown`; this also
/// picks up the pattern `^\d+\.\d+\.bitmap$` that a `Parcel` content makes
/// only at the full-content stage (§4.5 step 3, Design Note §9's parcel
/// children caching note does not apply here since this is content, not
/// children).
const PREVIEW_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DispatchResult {
  Deploy,
  Mint,
  Bitmap,
  Parcel,
  NotOverlay,
}

/// Runs every step of §4.5 for one block and returns its [`BlockStats`].
/// Never returns `Err` for a single inscription's failure — those are
/// captured as `failed_inscriptions` rows — only for failures that make
/// continuing the block meaningless (the initial paginated fetch itself
/// failing, for instance).
pub async fn process_block(indexer: &Indexer, height: u64) -> Result<BlockStats> {
  log::info!("block {height}: fetching inscription ids");
  let all_ids = fetch::fetch_all_ids(&indexer.upstream, height).await?;
  let total_inscriptions = all_ids.len() as u64;

  let kept = fetch::prefilter_by_content_type(&indexer.upstream, &all_ids).await;
  log::debug!("block {height}: {} of {total_inscriptions} ids kept after content-type pre-filter", kept.len());

  // Preview classification (§4.5 step 3) fans out concurrently across the
  // kept ids, bounded by the live Concurrency Manager limit, the same
  // `buffer_unordered` idiom used for validator dispatch below.
  let classify_limit = indexer.upstream.concurrency.limit().max(1);
  let classify_results = stream::iter(kept.into_iter())
    .map(|(id, _priority)| async move {
      let result = classify_one(indexer, &id).await;
      (id, result)
    })
    .buffer_unordered(classify_limit)
    .collect::<Vec<_>>()
    .await;

  let mut classified = Vec::with_capacity(classify_results.len());
  let mut content_by_id = HashMap::with_capacity(classify_results.len());
  for (id, result) in classify_results {
    match result {
      Ok((kind, content)) => {
        classified.push((id.clone(), kind));
        content_by_id.insert(id, content);
      }
      Err(err) if err.is_not_found() => {}
      Err(err) => {
        log::warn!("block {height}: skipping {id} after classification failure: {err}");
        let _ = indexer.store.record_failed_inscription(&FailedInscription {
          inscription_id: id,
          block_height: height,
          reason: err.to_string(),
        });
      }
    }
  }

  let ordered = priority::partition(classified);
  let mut stats = BlockStats {
    block_height: height,
    total_transactions: block_transaction_count(indexer, height).await,
    total_inscriptions,
    ..Default::default()
  };
  let timestamp = chrono::Utc::now().timestamp();

  let mut index = 0usize;
  while index < ordered.len() {
    let batch_size = indexer.batch_sizer.size();
    let end = (index + batch_size).min(ordered.len());
    let batch = &ordered[index..end];
    let outcomes = process_batch(indexer, height, timestamp, batch, &content_by_id).await;

    if outcomes.iter().any(|o| matches!(o, Outcome::Invalid(reason) if reason.0 == TRANSIENT_MARKER)) {
      indexer.batch_sizer.record_batch_failure();
    } else {
      indexer.batch_sizer.record_batch_success();
    }

    for outcome in outcomes {
      if let Outcome::Valid(result) = outcome {
        match result {
          DispatchResult::Deploy => stats.brc420_deploys += 1,
          DispatchResult::Mint => stats.brc420_mints += 1,
          DispatchResult::Bitmap => stats.bitmaps += 1,
          DispatchResult::Parcel => stats.parcels += 1,
          DispatchResult::NotOverlay => {}
        }
      }
    }
    index = end;
  }

  indexer.flush_wallet_batcher()?;
  indexer.store.record_block_stats(&stats)?;
  indexer.metrics.refresh(indexer);
  log::info!(
    "block {height}: {} inscriptions, {} deploys, {} mints, {} bitmaps, {} parcels",
    stats.total_inscriptions,
    stats.brc420_deploys,
    stats.brc420_mints,
    stats.bitmaps,
    stats.parcels
  );

  crate::transfer::reconcile(indexer, height, timestamp).await;

  Ok(stats)
}

/// Best-effort transaction count for the block, used only for `BlockStats`
/// (§3). Never fails the block: an upstream miss just leaves the counter
/// at zero.
async fn block_transaction_count(indexer: &Indexer, height: u64) -> u64 {
  match indexer.upstream.tx.block_hash_at(height).await {
    Ok(hash) => match indexer.upstream.tx.block(&hash).await {
      Ok(block) => block.tx_count.unwrap_or(0),
      Err(err) => {
        log::info!("block {height}: could not resolve transaction count: {err}");
        0
      }
    },
    Err(err) => {
      log::info!("block {height}: could not resolve block hash: {err}");
      0
    }
  }
}

/// Step 3 of §4.5: fetch a 50-byte preview, classify it, and — for the
/// ambiguous `Text`/`Unknown` buckets — re-classify against full content to
/// resolve mint references (too long to fit the preview) and parcel claims
/// (only distinguishable from plain text at the full-content stage).
async fn classify_one(
  indexer: &Indexer,
  id: &str,
) -> std::result::Result<(InscriptionKind, Option<String>), crate::error::UpstreamError> {
  let preview = indexer.upstream.ordinals.content_prefix(id, PREVIEW_LEN).await?;
  let kind = classify_preview(&preview);

  match kind {
    InscriptionKind::Brc420Deploy => {
      let full = indexer.upstream.ordinals.content_full(id).await?;
      Ok((kind, Some(String::from_utf8_lossy(&full).to_string())))
    }
    InscriptionKind::Bitmap => Ok((kind, Some(String::from_utf8_lossy(&preview).trim().to_string()))),
    InscriptionKind::Text | InscriptionKind::Unknown => {
      let full = indexer.upstream.ordinals.content_full(id).await?;
      let text = String::from_utf8_lossy(&full).trim().to_string();
      if is_parcel_content(&text) {
        return Ok((InscriptionKind::Parcel, Some(text)));
      }
      Ok((classify_preview(&full), Some(text)))
    }
    InscriptionKind::Brc420Mint => {
      let full = indexer.upstream.ordinals.content_full(id).await?;
      Ok((kind, Some(String::from_utf8_lossy(&full).trim().to_string())))
    }
    InscriptionKind::Binary | InscriptionKind::Json => Ok((kind, None)),
  }
}

async fn process_batch(
  indexer: &Indexer,
  height: u64,
  timestamp: i64,
  batch: &[(String, InscriptionKind)],
  content_by_id: &HashMap<String, Option<String>>,
) -> Vec<Outcome<DispatchResult>> {
  let limit = indexer.upstream.concurrency.limit().max(1);
  stream::iter(batch.iter().cloned())
    .map(|(id, kind)| {
      let content = content_by_id.get(&id).cloned().flatten();
      async move { dispatch_with_retry(indexer, height, timestamp, id, kind, content).await }
    })
    .buffer_unordered(limit)
    .collect::<Vec<_>>()
    .await
}

/// Marker stashed in a transient `Outcome::Invalid` so the batch-outcome
/// scan above can tell "this item exhausted its retries" apart from an
/// ordinary rule-failure `Invalid`, without adding a third `Outcome`
/// variant that every other caller would need to match on.
const TRANSIENT_MARKER: &str = "\0pipeline-batch-failure";

/// Wraps one dispatch in the per-inscription retry policy (§4.5 step 5):
/// up to 3 attempts, backoff `1s * 2^attempt`. A terminal failure records a
/// `failed_inscriptions` row and is folded into the batch outcome as a
/// (marked) `Invalid` so the caller can still count it without a new error
/// type crossing the batch boundary.
async fn dispatch_with_retry(
  indexer: &Indexer,
  height: u64,
  timestamp: i64,
  id: String,
  kind: InscriptionKind,
  content: Option<String>,
) -> Outcome<DispatchResult> {
  let mut attempt = 0u32;
  loop {
    match dispatch_one(indexer, height, timestamp, &id, kind, content.as_deref()).await {
      Ok(outcome) => return outcome,
      Err(err) => {
        attempt += 1;
        if attempt >= 3 {
          log::error!("block {height}: {id} failed after {attempt} attempts: {err}");
          let _ = indexer.store.record_failed_inscription(&FailedInscription {
            inscription_id: id,
            block_height: height,
            reason: err.to_string(),
          });
          return Outcome::Invalid(Reason::new(TRANSIENT_MARKER));
        }
        let delay = Duration::from_secs(1) * 2u32.pow(attempt - 1);
        log::warn!("block {height}: retrying {id} (attempt {attempt}/3) in {delay:?}: {err}");
        tokio::time::sleep(delay).await;
      }
    }
  }
}

/// Exhaustive dispatch by `InscriptionKind` (Design Note §9: "replace
/// dynamic runtime dispatch by string type with a tagged variant... the
/// pipeline's dispatch becomes an exhaustive match").
async fn dispatch_one(
  indexer: &Indexer,
  height: u64,
  timestamp: i64,
  id: &str,
  kind: InscriptionKind,
  content: Option<&str>,
) -> Result<Outcome<DispatchResult>> {
  match kind {
    InscriptionKind::Brc420Deploy => {
      let Some(content) = content else {
        return Ok(Outcome::Invalid(Reason::new("deploy inscription had no content")));
      };
      let payload: DeployPayload = match serde_json::from_str(content) {
        Ok(payload) => payload,
        Err(err) => return Ok(Outcome::Invalid(Reason::new(format!("malformed deploy payload: {err}")))),
      };
      let outcome = deploy::validate(indexer, id, height, timestamp, &payload).await?;
      Ok(outcome.map(|_| DispatchResult::Deploy))
    }
    InscriptionKind::Brc420Mint => {
      let Some(content) = content else {
        return Ok(Outcome::Invalid(Reason::new("mint inscription had no content")));
      };
      let Some(source_id) = content.trim().strip_prefix("/content/") else {
        return Ok(Outcome::Invalid(Reason::new("mint content missing /content/ prefix")));
      };
      let outcome = mint::validate(indexer, id, source_id, height, timestamp).await?;
      Ok(outcome.map(|_| DispatchResult::Mint))
    }
    InscriptionKind::Bitmap => {
      let Some(content) = content else {
        return Ok(Outcome::Invalid(Reason::new("bitmap inscription had no content")));
      };
      let outcome = bitmap::validate(indexer, id, content, height, timestamp).await?;
      if let Outcome::Valid(record) = &outcome {
        let claim_txid = mint::convert_inscription_id_to_txid(id).unwrap_or_default();
        pattern::generate_for_bitmap(indexer, record.bitmap_number, &claim_txid).await;
      }
      Ok(outcome.map(|_| DispatchResult::Bitmap))
    }
    InscriptionKind::Parcel => {
      let Some(content) = content else {
        return Ok(Outcome::Invalid(Reason::new("parcel inscription had no content")));
      };
      let outcome = parcel::validate(indexer, id, content, height, timestamp).await?;
      Ok(outcome.map(|_| DispatchResult::Parcel))
    }
    InscriptionKind::Json | InscriptionKind::Text => {
      Ok(Outcome::Invalid(Reason::new("no overlay protocol matched")))
    }
    InscriptionKind::Binary | InscriptionKind::Unknown => {
      Ok(Outcome::Invalid(Reason::new("skipped before dispatch")))
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn dispatch_result_maps_to_distinct_stat_buckets() {
    let results = [
      DispatchResult::Deploy,
      DispatchResult::Mint,
      DispatchResult::Bitmap,
      DispatchResult::Parcel,
      DispatchResult::NotOverlay,
    ];
    assert_eq!(results.len(), 5);
  }
}
