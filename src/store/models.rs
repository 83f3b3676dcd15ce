//! Entity structs, spec.md §3, unchanged in shape. Plain data carried
//! between the Protocol Validators (C6) and the Store (C3) — no behaviour,
//! no SQL in this file, the way the teacher keeps `brc20/types/*.rs` free of
//! persistence concerns.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deploy {
  pub id: String,
  pub source_id: String,
  pub name: String,
  pub max_supply: u64,
  pub price_sats: u64,
  pub deployer_address: String,
  pub block_height: u64,
  pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mint {
  pub id: String,
  pub deploy_id: String,
  pub source_id: String,
  pub mint_address: String,
  pub transaction_id: String,
  pub block_height: u64,
  pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bitmap {
  pub inscription_id: String,
  pub bitmap_number: u64,
  pub content: String,
  pub address: String,
  pub block_height: u64,
  pub timestamp: i64,
  pub sat: Option<u64>,
  pub wallet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parcel {
  pub inscription_id: String,
  pub parcel_number: u64,
  pub bitmap_number: u64,
  pub bitmap_inscription_id: String,
  pub content: String,
  pub address: String,
  pub block_height: u64,
  pub timestamp: i64,
  pub transaction_count: Option<u64>,
  pub wallet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WalletKind {
  Deploy,
  Mint,
  Bitmap,
  Parcel,
}

impl WalletKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      WalletKind::Deploy => "deploy",
      WalletKind::Mint => "mint",
      WalletKind::Bitmap => "bitmap",
      WalletKind::Parcel => "parcel",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "deploy" => Some(WalletKind::Deploy),
      "mint" => Some(WalletKind::Mint),
      "bitmap" => Some(WalletKind::Bitmap),
      "parcel" => Some(WalletKind::Parcel),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wallet {
  pub inscription_id: String,
  pub address: String,
  pub kind: WalletKind,
  pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
  pub block_height: u64,
  pub processed: bool,
  pub processed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBlock {
  pub block_height: u64,
  pub error_message: String,
  pub retry_count: u32,
  pub retry_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BlockStats {
  pub block_height: u64,
  pub total_transactions: u64,
  pub total_inscriptions: u64,
  pub brc420_deploys: u64,
  pub brc420_mints: u64,
  pub bitmaps: u64,
  pub parcels: u64,
  pub processed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressHistory {
  pub inscription_id: String,
  pub old_address: String,
  pub new_address: String,
  pub block_height: u64,
  pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BitmapPattern {
  pub bitmap_number: u64,
  pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedInscription {
  pub inscription_id: String,
  pub block_height: u64,
  pub reason: String,
}
