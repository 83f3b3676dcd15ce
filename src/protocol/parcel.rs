//! Parcel validator, spec.md §4.6.4.

use crate::{
  error::{Outcome, Result},
  indexer::Indexer,
  protocol::invalid,
  store::{
    models::{Parcel, Wallet, WalletKind},
    ParcelClaim,
  },
};
use once_cell::sync::Lazy;
use regex::Regex;

static PARCEL_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.bitmap$").unwrap());

/// Validates and, on success, persists a Parcel claim. `content` is the
/// inscription's full text content.
pub async fn validate(
  indexer: &Indexer,
  id: &str,
  content: &str,
  block_height: u64,
  timestamp: i64,
) -> Result<Outcome<Parcel>> {
  let captures = match PARCEL_CONTENT.captures(content.trim()) {
    Some(captures) => captures,
    None => return Ok(invalid("content is not a canonical <P>.<N>.bitmap claim")),
  };
  let parcel_number: u64 = match captures[1].parse() {
    Ok(n) => n,
    Err(_) => return Ok(invalid("parcel number does not fit in u64")),
  };
  let bitmap_number: u64 = match captures[2].parse() {
    Ok(n) => n,
    Err(_) => return Ok(invalid("bitmap number does not fit in u64")),
  };

  // Step 1: parent bitmap must exist.
  let bitmap = match indexer.store.bitmap_by_number(bitmap_number)? {
    Some(bitmap) => bitmap,
    None => return Ok(invalid(format!("no bitmap {bitmap_number} to parent this parcel"))),
  };

  // Step 2: provenance — the parcel must be a child of the bitmap inscription.
  let children = indexer.upstream.ordinals.children(&bitmap.inscription_id).await?;
  if !children.iter().any(|child| child == id) {
    return Ok(invalid("parcel is not a child of its parent bitmap inscription"));
  }

  // Step 3: range check against the bitmap block's transaction count.
  let transaction_count = match indexer.upstream.tx.block_hash_at(bitmap.block_height).await {
    Ok(hash) => match indexer.upstream.tx.block(&hash).await {
      Ok(block) => block.tx_count,
      Err(err) if err.is_not_found() => None,
      Err(err) => return Err(err.into()),
    },
    Err(err) if err.is_not_found() => None,
    Err(err) => return Err(err.into()),
  };
  if let Some(tx_count) = transaction_count {
    if parcel_number >= tx_count {
      return Ok(invalid(format!("parcel {parcel_number} out of range for {tx_count} transactions")));
    }
  }

  let details = match indexer.upstream.ordinals.inscription(id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("parcel inscription not found")),
    Err(err) => return Err(err.into()),
  };
  let address = match details.address {
    Some(address) => address,
    None => return Ok(invalid("parcel inscription has no current address")),
  };

  let candidate = Parcel {
    inscription_id: id.to_string(),
    parcel_number,
    bitmap_number,
    bitmap_inscription_id: bitmap.inscription_id,
    content: content.trim().to_string(),
    address: address.clone(),
    block_height,
    timestamp,
    transaction_count,
    wallet: address.clone(),
  };

  // Step 4: tie-breaker, resolved atomically by the store in one
  // transaction (§5) rather than as a separate read-then-write here, which
  // would race against another concurrently validated parcel for the same
  // slot the same way an unguarded bitmap claim would.
  match indexer.store.claim_parcel(&candidate)? {
    ParcelClaim::Rejected => return Ok(invalid("an earlier parcel already claims this slot")),
    ParcelClaim::Inserted | ParcelClaim::Replaced(_) => {}
  }

  indexer.queue_wallet_upsert(Wallet {
    inscription_id: id.to_string(),
    address,
    kind: WalletKind::Parcel,
    updated_at: timestamp,
  })?;

  Ok(Outcome::Valid(candidate))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn content_regex_matches_parcel_not_bitmap() {
    assert!(PARCEL_CONTENT.is_match("3.42.bitmap"));
    assert!(!PARCEL_CONTENT.is_match("42.bitmap"));
    assert!(!PARCEL_CONTENT.is_match("03.42.bitmap"));
  }
}
