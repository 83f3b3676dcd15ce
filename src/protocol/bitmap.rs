//! Bitmap validator, spec.md §4.6.3.

use crate::{
  error::{Outcome, Result},
  indexer::Indexer,
  protocol::invalid,
  store::{
    models::{Bitmap, Wallet, WalletKind},
    BitmapClaim,
  },
};
use once_cell::sync::Lazy;
use regex::Regex;

static BITMAP_CONTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|[1-9]\d*)\.bitmap$").unwrap());

/// Validates and, on success, persists a Bitmap claim. `content` is the
/// inscription's full text content (already known to end in `.bitmap` by
/// the pipeline's classification step).
pub async fn validate(
  indexer: &Indexer,
  id: &str,
  content: &str,
  block_height: u64,
  timestamp: i64,
) -> Result<Outcome<Bitmap>> {
  let captures = match BITMAP_CONTENT.captures(content.trim()) {
    Some(captures) => captures,
    None => return Ok(invalid("content is not a canonical <N>.bitmap claim")),
  };
  let bitmap_number: u64 = match captures[1].parse() {
    Ok(n) => n,
    Err(_) => return Ok(invalid("bitmap number does not fit in u64")),
  };

  if bitmap_number > block_height {
    return Ok(invalid(format!("bitmap {bitmap_number} exceeds block height {block_height}")));
  }

  let details = match indexer.upstream.ordinals.inscription(id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("bitmap inscription not found")),
    Err(err) => return Err(err.into()),
  };
  let address = match details.address {
    Some(address) => address,
    None => return Ok(invalid("bitmap inscription has no current address")),
  };

  let record = Bitmap {
    inscription_id: id.to_string(),
    bitmap_number,
    content: content.trim().to_string(),
    address: address.clone(),
    block_height,
    timestamp,
    sat: details.sat,
    wallet: address.clone(),
  };

  match indexer.store.claim_bitmap(&record)? {
    BitmapClaim::Rejected => return Ok(invalid(format!("bitmap {bitmap_number} already claimed"))),
    BitmapClaim::Inserted | BitmapClaim::Replaced(_) => {}
  }
  indexer.queue_wallet_upsert(Wallet {
    inscription_id: id.to_string(),
    address,
    kind: WalletKind::Bitmap,
    updated_at: timestamp,
  })?;

  Ok(Outcome::Valid(record))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn content_regex_rejects_leading_zeros() {
    assert!(BITMAP_CONTENT.is_match("0.bitmap"));
    assert!(BITMAP_CONTENT.is_match("792000.bitmap"));
    assert!(!BITMAP_CONTENT.is_match("0792000.bitmap"));
    assert!(!BITMAP_CONTENT.is_match("3.42.bitmap"));
  }
}
