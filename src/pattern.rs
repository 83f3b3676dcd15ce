//! Pattern Generator (C9), spec.md §4.9. Computes a transaction-size-class
//! digit string for a bitmap's block, used only by downstream renderers
//! (out of scope here, §1) and therefore never allowed to fail the block
//! that triggers it.
//!
//! The bucketing/concatenation algorithm (steps 2-3) is the deterministic,
//! testable core and is implemented exactly as specified. Step 1 ("obtain a
//! list of per-transaction value tuples for the bitmap's block") needs a
//! per-block transaction enumeration endpoint that §6's external interfaces
//! do not expose — only `tx_count` for a block and single-txid lookup are
//! available, and a full per-block iterator belongs to a full node (a
//! Non-goal, §1). Per Open Question 4's own recommendation ("forbid
//! synthetic patterns"), this never fabricates values: it uses the single
//! value it can honestly obtain — the claiming transaction's own output
//! total — rather than inventing a block-wide series.

use crate::indexer::Indexer;

/// Buckets one satoshi value into a digit 1..=9 per the §4.9 thresholds.
fn bucket(value_sats: u64) -> u8 {
  let btc = value_sats as f64 / 100_000_000.0;
  if btc <= 0.01 {
    1
  } else if btc <= 0.1 {
    2
  } else if btc <= 1.0 {
    3
  } else if btc <= 10.0 {
    4
  } else if btc <= 100.0 {
    5
  } else if btc <= 1_000.0 {
    6
  } else if btc <= 10_000.0 {
    7
  } else if btc <= 100_000.0 {
    8
  } else {
    9
  }
}

/// Concatenates the bucket digit for each value, in order (§4.9 step 3).
pub fn generate(values: &[u64]) -> String {
  values.iter().map(|v| bucket(*v).to_string()).collect()
}

/// Best-effort collection of the one transaction value this crate can
/// honestly attribute to a bitmap's block (see module docs): the sum of the
/// claiming transaction's own outputs. Returns `None` rather than fabricate
/// data; the caller treats that as "skip pattern generation for this
/// bitmap" and logs at INFO, never failing the block.
pub async fn collect_claim_transaction_value(indexer: &Indexer, transaction_id: &str) -> Option<u64> {
  match indexer.upstream.tx.tx(transaction_id).await {
    Ok(tx) => Some(tx.vout.iter().map(|out| out.value).sum()),
    Err(err) => {
      log::info!("pattern generation: could not fetch tx {transaction_id}: {err}");
      None
    }
  }
}

/// Runs the generator for a newly committed bitmap and stores the result.
/// Never returns an error to the caller; any failure is logged and the
/// bitmap is simply left without a pattern.
pub async fn generate_for_bitmap(indexer: &Indexer, bitmap_number: u64, claim_transaction_id: &str) {
  let Some(value) = collect_claim_transaction_value(indexer, claim_transaction_id).await else {
    return;
  };
  let pattern = generate(&[value]);
  if let Err(err) = indexer.store.upsert_bitmap_pattern(bitmap_number, &pattern) {
    log::warn!("failed to store pattern for bitmap {bitmap_number}: {err}");
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn buckets_values_at_threshold_boundaries() {
    assert_eq!(bucket(1_000_000), 1); // 0.01 BTC exactly
    assert_eq!(bucket(1_000_001), 2);
    assert_eq!(bucket(10_000_000), 2); // 0.1 BTC exactly
    assert_eq!(bucket(100_000_000), 3); // 1 BTC exactly
    assert_eq!(bucket(100_000_000_000), 6); // 1000 BTC exactly
    assert_eq!(bucket(200_000_000_000_000), 9); // 2,000,000 BTC, above the 1e6 threshold
  }

  #[test]
  fn generate_concatenates_digits_in_order() {
    let values = [5_000_000u64, 50_000_000, 500_000_000];
    assert_eq!(generate(&values), "234");
  }

  #[test]
  fn generate_on_empty_input_is_empty_string() {
    assert_eq!(generate(&[]), "");
  }
}
