//! BRC-420 Deploy validator, spec.md §4.6.1.

use crate::{
  error::{Outcome, Result},
  indexer::Indexer,
  protocol::{decimal_to_sats, invalid, positive_int},
  store::models::{Deploy, Wallet, WalletKind},
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DeployPayload {
  pub p: String,
  pub op: String,
  pub id: String,
  pub name: String,
  pub max: serde_json::Value,
  pub price: serde_json::Value,
}

/// Validates and, on success, persists a BRC-420 deploy.
///
/// `id` is the deploy inscription itself; `payload` is its parsed JSON body.
pub async fn validate(
  indexer: &Indexer,
  id: &str,
  block_height: u64,
  timestamp: i64,
  payload: &DeployPayload,
) -> Result<Outcome<Deploy>> {
  if payload.p != "brc-420" || payload.op != "deploy" {
    return Ok(invalid("payload is not a brc-420 deploy envelope"));
  }

  // Step 4: schema validation, checked first to avoid network calls for
  // obviously malformed payloads.
  let max_supply = match positive_int(&payload.max) {
    Some(max) => max,
    None => return Ok(invalid("max supply must be a positive integer")),
  };
  let price_sats = match decimal_to_sats(&payload.price) {
    Some(sats) => sats,
    None => return Ok(invalid("price must be a positive decimal")),
  };
  if payload.name.trim().is_empty() {
    return Ok(invalid("name must be non-empty"));
  }

  // Step 3: source_id must not already be deployed.
  if indexer.store.deploy_by_source_id(&payload.id)?.is_some() {
    return Ok(invalid(format!("source {} is already deployed", payload.id)));
  }

  // Step 1: deployer address is the current holder of the deploy inscription.
  let deployer = match indexer.upstream.ordinals.inscription(id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("deploy inscription not found")),
    Err(err) => return Err(err.into()),
  };
  let deployer_address = match deployer.address {
    Some(address) => address,
    None => return Ok(invalid("deploy inscription has no current address")),
  };

  // Step 2: deployer must currently own the source inscription too.
  let source = match indexer.upstream.ordinals.inscription(&payload.id).await {
    Ok(details) => details,
    Err(err) if err.is_not_found() => return Ok(invalid("source inscription not found")),
    Err(err) => return Err(err.into()),
  };
  let source_owner = source.address.unwrap_or_default();
  if source_owner != deployer_address {
    return Ok(invalid("deployer does not own the source inscription"));
  }

  let record = Deploy {
    id: id.to_string(),
    source_id: payload.id.clone(),
    name: payload.name.clone(),
    max_supply,
    price_sats,
    deployer_address: deployer_address.clone(),
    block_height,
    timestamp,
  };

  if !indexer.store.insert_deploy(&record)? {
    return Ok(invalid("deploy id or source id already recorded"));
  }
  indexer.queue_wallet_upsert(Wallet {
    inscription_id: id.to_string(),
    address: deployer_address,
    kind: WalletKind::Deploy,
    updated_at: timestamp,
  })?;

  Ok(Outcome::Valid(record))
}
