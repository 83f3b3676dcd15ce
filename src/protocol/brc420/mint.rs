//! BRC-420 Mint validator, spec.md §4.6.2.

use crate::{
  error::{Outcome, Result},
  indexer::Indexer,
  protocol::invalid,
  store::models::{Mint, Wallet, WalletKind},
};

/// Parses the trailing `i<digits>` suffix of an inscription id and drops it
/// to recover the txid. Design Note §9 flags the source's off-by-one bug
/// (dropping only the last character, which mis-maps `i10` and above); this
/// parses the full numeric suffix instead.
pub fn convert_inscription_id_to_txid(id: &str) -> Option<String> {
  let pos = id.rfind('i')?;
  let (txid, suffix) = id.split_at(pos);
  let index = &suffix[1..];
  if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
    Some(txid.to_string())
  } else {
    None
  }
}

/// Validates and, on success, persists a BRC-420 mint. `id` is the mint
/// inscription; `source_id` is parsed from its content (`/content/<id>`) by
/// the caller.
pub async fn validate(
  indexer: &Indexer,
  id: &str,
  source_id: &str,
  block_height: u64,
  timestamp: i64,
) -> Result<Outcome<Mint>> {
  // Step 1: the referenced source must already have a Deploy.
  let deploy = match indexer.store.deploy_by_source_id(source_id)? {
    Some(deploy) => deploy,
    None => return Ok(invalid(format!("no deploy for source {source_id}"))),
  };

  // Step 6: supply cap, checked early since it needs no network call.
  let minted = indexer.store.count_mints_for_deploy(&deploy.id)?;
  if minted >= deploy.max_supply {
    return Ok(invalid("deploy supply cap reached"));
  }

  // Step 2: mint holder.
  let mint_details = match indexer.upstream.ordinals.inscription(id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("mint inscription not found")),
    Err(err) => return Err(err.into()),
  };
  let mint_address = match &mint_details.address {
    Some(address) => address.clone(),
    None => return Ok(invalid("mint inscription has no current address")),
  };

  // Step 5: content-type parity with the source.
  let source_details = match indexer.upstream.ordinals.inscription(source_id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("source inscription not found")),
    Err(err) => return Err(err.into()),
  };
  if mint_details.content_type != source_details.content_type {
    return Ok(invalid("mint content-type does not match source"));
  }

  // Step 3: resolve the paying transaction.
  let txid = match convert_inscription_id_to_txid(id) {
    Some(txid) => txid,
    None => return Ok(invalid("mint inscription id has no parseable txid suffix")),
  };
  let tx = match indexer.upstream.tx.tx(&txid).await {
    Ok(tx) => tx,
    Err(err) if err.is_not_found() => return Ok(invalid("mint transaction not found")),
    Err(err) => return Err(err.into()),
  };

  // Step 4: royalty check.
  let paid: u64 = tx
    .vout
    .iter()
    .filter(|out| out.scriptpubkey_address.as_deref() == Some(deploy.deployer_address.as_str()))
    .map(|out| out.value)
    .sum();
  if paid < deploy.price_sats {
    return Ok(invalid(format!("royalty underpaid: paid {paid}, expected {}", deploy.price_sats)));
  }

  let record = Mint {
    id: id.to_string(),
    deploy_id: deploy.id.clone(),
    source_id: deploy.source_id.clone(),
    mint_address: mint_address.clone(),
    transaction_id: txid,
    block_height,
    timestamp,
  };

  if !indexer.store.insert_mint(&record)? {
    return Ok(invalid("mint id already recorded"));
  }
  indexer.queue_wallet_upsert(Wallet {
    inscription_id: id.to_string(),
    address: mint_address,
    kind: WalletKind::Mint,
    updated_at: timestamp,
  })?;

  Ok(Outcome::Valid(record))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn convert_parses_multi_digit_indices() {
    assert_eq!(convert_inscription_id_to_txid(&format!("{}i0", "a".repeat(64))), Some("a".repeat(64)));
    assert_eq!(convert_inscription_id_to_txid(&format!("{}i10", "a".repeat(64))), Some("a".repeat(64)));
    assert_eq!(convert_inscription_id_to_txid(&format!("{}i123", "b".repeat(64))), Some("b".repeat(64)));
  }

  #[test]
  fn convert_rejects_malformed_ids() {
    assert_eq!(convert_inscription_id_to_txid("no-i-here"), None);
    assert_eq!(convert_inscription_id_to_txid("abci"), None);
  }

  #[test]
  fn convert_round_trips_to_the_zeroth_child_for_single_output_inscriptions() {
    let id = format!("{}i0", "c".repeat(64));
    let txid = convert_inscription_id_to_txid(&id).unwrap();
    assert_eq!(format!("{txid}i0"), id);
  }
}
