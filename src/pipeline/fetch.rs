//! Step 1 and step 2 of the Inscription Pipeline (C5), spec.md §4.5:
//! paginated ID fetch with dedup and a safety cap, then a content-type
//! pre-filter in batches of 100.

use crate::{error::UpstreamError, upstream::Upstream};
use futures::{stream, StreamExt};
use std::collections::BTreeSet;

const PAGE_SAFETY_CAP: u64 = 10_000;
const PREFILTER_BATCH_SIZE: usize = 100;

/// Repeatedly calls `inscriptions_in_block(height, page)`, deduplicating IDs
/// within the block (§4.5 step 1: "upstream is known to repeat"). Stops on
/// `more=false` with no new IDs, an empty page, or the page safety cap.
pub async fn fetch_all_ids(upstream: &Upstream, height: u64) -> Result<Vec<String>, UpstreamError> {
  let mut seen = BTreeSet::new();
  let mut ordered = Vec::new();
  let mut page = 0u64;

  loop {
    if page >= PAGE_SAFETY_CAP {
      log::warn!("block {height}: hit pagination safety cap of {PAGE_SAFETY_CAP} pages");
      break;
    }

    let response = upstream.ordinals.inscriptions_in_block(height, page).await?;
    if response.ids.is_empty() {
      break;
    }

    for id in response.ids {
      if seen.insert(id.clone()) {
        ordered.push(id);
      }
    }

    if !response.more {
      break;
    }
    page += 1;
  }

  Ok(ordered)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ContentTypePriority {
  Json = 1,
  TextPlain = 2,
  OtherText = 3,
}

/// Fetches `inscription(id).content_type` in batches of [`PREFILTER_BATCH_SIZE`],
/// keeping only `text/plain`, `application/json`, `text/json` (§4.5 step 2).
/// Lookups within a batch run concurrently, bounded by the live Concurrency
/// Manager limit (§4.4), the same `buffer_unordered` idiom the rest of the
/// pipeline and the transfer tracker use for their own upstream fan-out.
pub async fn prefilter_by_content_type(
  upstream: &Upstream,
  ids: &[String],
) -> Vec<(String, ContentTypePriority)> {
  let limit = upstream.concurrency.limit().max(1);
  let mut kept = Vec::new();
  for batch in ids.chunks(PREFILTER_BATCH_SIZE) {
    let results = stream::iter(batch.iter().cloned())
      .map(|id| async move {
        let details = match upstream.ordinals.inscription(&id).await {
          Ok(details) => details,
          Err(err) if err.is_not_found() => return None,
          Err(err) => {
            log::warn!("skipping {id} after content-type fetch failure: {err}");
            return None;
          }
        };
        let content_type = details.content_type?;
        let priority = match content_type.as_str() {
          "application/json" => ContentTypePriority::Json,
          "text/plain" => ContentTypePriority::TextPlain,
          "text/json" => ContentTypePriority::OtherText,
          _ => return None,
        };
        Some((id, priority))
      })
      .buffer_unordered(limit)
      .collect::<Vec<_>>()
      .await;
    kept.extend(results.into_iter().flatten());
  }
  kept
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn content_type_priority_orders_json_first() {
    let mut priorities = vec![ContentTypePriority::OtherText, ContentTypePriority::Json, ContentTypePriority::TextPlain];
    priorities.sort();
    assert_eq!(
      priorities,
      vec![ContentTypePriority::Json, ContentTypePriority::TextPlain, ContentTypePriority::OtherText]
    );
  }
}
