//! Typed payloads for every upstream endpoint in spec.md §6. Parsed and
//! validated at the boundary per Design Note §9 ("expose every upstream
//! payload as a strongly-typed record with explicit optional fields").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct InscriptionsInBlockPage {
  pub ids: Vec<String>,
  pub more: bool,
  #[serde(default)]
  pub page_index: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InscriptionDetails {
  pub address: Option<String>,
  pub sat: Option<u64>,
  pub content_type: Option<String>,
  pub content_length: Option<u64>,
  pub height: u64,
  pub timestamp: i64,
  pub value: Option<u64>,
  pub fee: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildrenResponse {
  pub ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxOut {
  pub scriptpubkey_address: Option<String>,
  pub value: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxDetails {
  pub vout: Vec<TxOut>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDetails {
  pub tx_count: Option<u64>,
}
