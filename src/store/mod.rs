//! Store (C3), spec.md §4.3. A single-writer relational store over
//! `rusqlite`, serialised behind one `parking_lot::Mutex<Connection>` — the
//! spec's "one writer at a time" is taken literally rather than layered with
//! a reader-pool, since this crate has no separate read-API surface (§1
//! Non-goals) to justify the extra connection management.
//!
//! Pragmas set at connection open realise §4.3's prose directly:
//! `journal_mode=WAL` (write-ahead log), `synchronous=NORMAL` (normal
//! fsync), `busy_timeout=30000` (30s busy timeout). Per-block commits use
//! `Connection::transaction()`, the same primitive the `hord-cli` pipeline
//! uses for its per-block `inscriptions_db_tx` in
//! `core/pipeline/processors/inscription_indexing.rs::process_blocks`
//! (commit on success, rollback on conflict) — generalized here from a
//! block-already-seen rollback condition to ordinary commit-or-propagate.

pub mod batcher;
pub mod models;
pub mod queries;

use crate::error::{Result, StoreError};
use models::{
  AddressHistory, Bitmap, Block, BlockStats, Deploy, ErrorBlock, FailedInscription, Mint, Parcel,
  Wallet, WalletKind,
};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

pub struct Store {
  conn: Mutex<Connection>,
}

impl Store {
  pub fn open(path: &str) -> Result<Self> {
    let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
    conn
      .pragma_update(None, "journal_mode", "WAL")
      .map_err(StoreError::Sqlite)?;
    conn
      .pragma_update(None, "synchronous", "NORMAL")
      .map_err(StoreError::Sqlite)?;
    conn
      .pragma_update(None, "busy_timeout", 30_000i64)
      .map_err(StoreError::Sqlite)?;
    conn.execute_batch(queries::SCHEMA).map_err(StoreError::Sqlite)?;
    Ok(Self { conn: Mutex::new(conn) })
  }

  /// Issues a WAL checkpoint before shutdown (§5, "issues a checkpoint on
  /// the journal").
  pub fn checkpoint(&self) -> Result<()> {
    self
      .conn
      .lock()
      .pragma_update(None, "wal_checkpoint", "TRUNCATE")
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  // ---- Deploys -----------------------------------------------------

  /// Inserts a Deploy if neither `id` nor `source_id` already exist.
  /// Returns `true` if the row was actually inserted.
  pub fn insert_deploy(&self, deploy: &Deploy) -> Result<bool> {
    let conn = self.conn.lock();
    let changed = conn
      .execute(
        "INSERT OR IGNORE INTO deploys
           (id, source_id, name, max_supply, price_sats, deployer_address, block_height, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
          deploy.id,
          deploy.source_id,
          deploy.name,
          deploy.max_supply as i64,
          deploy.price_sats as i64,
          deploy.deployer_address,
          deploy.block_height as i64,
          deploy.timestamp,
        ],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(changed == 1)
  }

  pub fn deploy_by_source_id(&self, source_id: &str) -> Result<Option<Deploy>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT id, source_id, name, max_supply, price_sats, deployer_address, block_height, timestamp
         FROM deploys WHERE source_id = ?1",
        params![source_id],
        row_to_deploy,
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  pub fn deploy_by_id(&self, id: &str) -> Result<Option<Deploy>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT id, source_id, name, max_supply, price_sats, deployer_address, block_height, timestamp
         FROM deploys WHERE id = ?1",
        params![id],
        row_to_deploy,
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  pub fn count_mints_for_deploy(&self, deploy_id: &str) -> Result<u64> {
    let conn = self.conn.lock();
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM mints WHERE deploy_id = ?1", params![deploy_id], |r| r.get(0))
      .map_err(StoreError::Sqlite)?;
    Ok(count as u64)
  }

  // ---- Mints ---------------------------------------------------------

  pub fn insert_mint(&self, mint: &Mint) -> Result<bool> {
    let conn = self.conn.lock();
    let changed = conn
      .execute(
        "INSERT OR IGNORE INTO mints
           (id, deploy_id, source_id, mint_address, transaction_id, block_height, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
          mint.id,
          mint.deploy_id,
          mint.source_id,
          mint.mint_address,
          mint.transaction_id,
          mint.block_height as i64,
          mint.timestamp,
        ],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(changed == 1)
  }

  // ---- Bitmaps ---------------------------------------------------------

  pub fn bitmap_by_number(&self, bitmap_number: u64) -> Result<Option<Bitmap>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT inscription_id, bitmap_number, content, address, block_height, timestamp, sat, wallet
         FROM bitmaps WHERE bitmap_number = ?1",
        params![bitmap_number as i64],
        row_to_bitmap,
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  fn insert_bitmap_locked(conn: &Connection, bitmap: &Bitmap) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO bitmaps
         (inscription_id, bitmap_number, content, address, block_height, timestamp, sat, wallet)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
      params![
        bitmap.inscription_id,
        bitmap.bitmap_number as i64,
        bitmap.content,
        bitmap.address,
        bitmap.block_height as i64,
        bitmap.timestamp,
        bitmap.sat.map(|s| s as i64),
        bitmap.wallet,
      ],
    )?;
    Ok(())
  }

  /// Atomically claims `bitmap_number` for `candidate` (§3: "first-seen wins
  /// by `(block_height, inscription_id)` lexicographic order"). Since
  /// pipeline tasks for the same block run concurrently, a plain
  /// check-then-insert from the caller would race; this does the
  /// select-then-insert-or-replace under one transaction, the same
  /// discipline §4.6.4 step 4 already requires for the parcel tie-breaker.
  pub fn claim_bitmap(&self, candidate: &Bitmap) -> Result<BitmapClaim> {
    let mut conn = self.conn.lock();
    let tx = conn.transaction().map_err(StoreError::Sqlite)?;
    let existing: Option<(String, i64)> = tx
      .query_row(
        "SELECT inscription_id, block_height FROM bitmaps WHERE bitmap_number = ?1",
        params![candidate.bitmap_number as i64],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(StoreError::Sqlite)?;

    let claim = match existing {
      None => {
        Self::insert_bitmap_locked(&tx, candidate).map_err(StoreError::Sqlite)?;
        BitmapClaim::Inserted
      }
      Some((existing_id, existing_height)) => {
        let candidate_key = (candidate.block_height, candidate.inscription_id.as_str());
        let existing_key = (existing_height as u64, existing_id.as_str());
        if candidate_key < existing_key {
          tx.execute("DELETE FROM bitmaps WHERE inscription_id = ?1", params![existing_id])
            .map_err(StoreError::Sqlite)?;
          Self::insert_bitmap_locked(&tx, candidate).map_err(StoreError::Sqlite)?;
          BitmapClaim::Replaced(existing_id)
        } else {
          BitmapClaim::Rejected
        }
      }
    };
    tx.commit().map_err(StoreError::Sqlite)?;
    Ok(claim)
  }

  // ---- Parcels ---------------------------------------------------------

  pub fn parcel_by_numbers(&self, parcel_number: u64, bitmap_number: u64) -> Result<Option<Parcel>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT inscription_id, parcel_number, bitmap_number, bitmap_inscription_id, content,
                address, block_height, timestamp, transaction_count, wallet
         FROM parcels WHERE parcel_number = ?1 AND bitmap_number = ?2",
        params![parcel_number as i64, bitmap_number as i64],
        row_to_parcel,
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  fn insert_parcel_locked(conn: &Connection, parcel: &Parcel) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO parcels
         (inscription_id, parcel_number, bitmap_number, bitmap_inscription_id, content, address,
          block_height, timestamp, transaction_count, wallet)
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      params![
        parcel.inscription_id,
        parcel.parcel_number as i64,
        parcel.bitmap_number as i64,
        parcel.bitmap_inscription_id,
        parcel.content,
        parcel.address,
        parcel.block_height as i64,
        parcel.timestamp,
        parcel.transaction_count.map(|t| t as i64),
        parcel.wallet,
      ],
    )?;
    Ok(())
  }

  /// Atomically resolves the tie-breaker for `(candidate.parcel_number,
  /// candidate.bitmap_number)` (§4.6.4 step 4, §5: "resolved within C3
  /// atomically, select-then-insert-or-replace under a single
  /// transaction"). Since pipeline tasks for the same block run
  /// concurrently, a separate check-then-insert from the caller (two
  /// distinct lock acquisitions) would race exactly like the bitmap claim
  /// would without [`Store::claim_bitmap`]; this does the same
  /// select-then-insert-or-replace under one transaction instead.
  pub fn claim_parcel(&self, candidate: &Parcel) -> Result<ParcelClaim> {
    let mut conn = self.conn.lock();
    let tx = conn.transaction().map_err(StoreError::Sqlite)?;
    let existing: Option<(String, i64)> = tx
      .query_row(
        "SELECT inscription_id, block_height FROM parcels WHERE parcel_number = ?1 AND bitmap_number = ?2",
        params![candidate.parcel_number as i64, candidate.bitmap_number as i64],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(StoreError::Sqlite)?;

    let claim = match existing {
      None => {
        Self::insert_parcel_locked(&tx, candidate).map_err(StoreError::Sqlite)?;
        ParcelClaim::Inserted
      }
      Some((existing_id, existing_height)) => {
        let candidate_key = (candidate.block_height, candidate.inscription_id.as_str());
        let existing_key = (existing_height as u64, existing_id.as_str());
        if candidate_key < existing_key {
          tx.execute("DELETE FROM parcels WHERE inscription_id = ?1", params![existing_id])
            .map_err(StoreError::Sqlite)?;
          Self::insert_parcel_locked(&tx, candidate).map_err(StoreError::Sqlite)?;
          ParcelClaim::Replaced(existing_id)
        } else {
          ParcelClaim::Rejected
        }
      }
    };
    tx.commit().map_err(StoreError::Sqlite)?;
    Ok(claim)
  }

  // ---- Wallets & address history ---------------------------------------

  pub fn upsert_wallet(&self, wallet: &Wallet) -> Result<()> {
    let conn = self.conn.lock();
    Self::upsert_wallet_locked(&conn, wallet).map_err(StoreError::Sqlite)?;
    Ok(())
  }

  fn upsert_wallet_locked(conn: &Connection, wallet: &Wallet) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO wallets (inscription_id, address, kind, updated_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT(inscription_id) DO UPDATE SET address = excluded.address, updated_at = excluded.updated_at",
      params![wallet.inscription_id, wallet.address, wallet.kind.as_str(), wallet.updated_at],
    )?;
    Ok(())
  }

  /// Flushes a coalesced batch of wallet upserts inside one transaction
  /// (§4.3's write batcher).
  pub fn flush_wallet_batch(&self, wallets: &[Wallet]) -> Result<()> {
    if wallets.is_empty() {
      return Ok(());
    }
    let mut conn = self.conn.lock();
    let tx = conn.transaction().map_err(StoreError::Sqlite)?;
    for wallet in wallets {
      Self::upsert_wallet_locked(&tx, wallet).map_err(StoreError::Sqlite)?;
    }
    tx.commit().map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn wallet_for(&self, inscription_id: &str) -> Result<Option<Wallet>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT inscription_id, address, kind, updated_at FROM wallets WHERE inscription_id = ?1",
        params![inscription_id],
        row_to_wallet,
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  /// Every tracked inscription, for the Transfer Tracker (§4.8) to re-check
  /// against the upstream holder.
  pub fn all_wallets(&self) -> Result<Vec<Wallet>> {
    let conn = self.conn.lock();
    let mut stmt = conn
      .prepare("SELECT inscription_id, address, kind, updated_at FROM wallets")
      .map_err(StoreError::Sqlite)?;
    let rows = stmt
      .query_map([], row_to_wallet)
      .map_err(StoreError::Sqlite)?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(StoreError::Sqlite)?;
    Ok(rows)
  }

  /// Updates the `wallet` column on the entity table that carries one
  /// (bitmaps, parcels); deploys/mints have no such column in §3's data
  /// model, so this is a no-op for those kinds.
  pub fn update_entity_wallet(&self, kind: WalletKind, inscription_id: &str, address: &str) -> Result<()> {
    let conn = self.conn.lock();
    match kind {
      WalletKind::Bitmap => {
        conn
          .execute(
            "UPDATE bitmaps SET wallet = ?1 WHERE inscription_id = ?2",
            params![address, inscription_id],
          )
          .map_err(StoreError::Sqlite)?;
      }
      WalletKind::Parcel => {
        conn
          .execute(
            "UPDATE parcels SET wallet = ?1 WHERE inscription_id = ?2",
            params![address, inscription_id],
          )
          .map_err(StoreError::Sqlite)?;
      }
      WalletKind::Deploy | WalletKind::Mint => {}
    }
    Ok(())
  }

  pub fn record_address_history(&self, entry: &AddressHistory) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO address_history (inscription_id, old_address, new_address, block_height, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![entry.inscription_id, entry.old_address, entry.new_address, entry.block_height as i64, entry.timestamp],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  // ---- Blocks & resume ---------------------------------------------------

  pub fn mark_block_processed(&self, block_height: u64, processed_at: i64) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO blocks (block_height, processed, processed_at) VALUES (?1, 1, ?2)
         ON CONFLICT(block_height) DO UPDATE SET processed = 1, processed_at = excluded.processed_at",
        params![block_height as i64, processed_at],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn block(&self, block_height: u64) -> Result<Option<Block>> {
    let conn = self.conn.lock();
    conn
      .query_row(
        "SELECT block_height, processed, processed_at FROM blocks WHERE block_height = ?1",
        params![block_height as i64],
        |row| {
          Ok(Block {
            block_height: row.get::<_, i64>(0)? as u64,
            processed: row.get::<_, i64>(1)? != 0,
            processed_at: row.get(2)?,
          })
        },
      )
      .optional()
      .map_err(StoreError::Sqlite)
      .map_err(Into::into)
  }

  /// `max(processed block) + 1`, or `configured_start` if nothing has been
  /// processed yet (§4.7, §8 invariant 6).
  pub fn resume_height(&self, configured_start: u64) -> Result<u64> {
    let conn = self.conn.lock();
    let max_processed: Option<i64> = conn
      .query_row("SELECT MAX(block_height) FROM blocks WHERE processed = 1", [], |r| r.get(0))
      .map_err(StoreError::Sqlite)?;
    Ok(match max_processed {
      Some(height) => (height as u64) + 1,
      None => configured_start,
    })
  }

  // ---- Error blocks -------------------------------------------------------

  pub fn upsert_error_block(&self, block_height: u64, error_message: &str, retry_at: u64) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO error_blocks (block_height, error_message, retry_count, retry_at)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(block_height) DO UPDATE SET
           error_message = excluded.error_message,
           retry_count = error_blocks.retry_count + 1,
           retry_at = excluded.retry_at",
        params![block_height as i64, error_message, retry_at as i64],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn clear_error_block(&self, block_height: u64) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute("DELETE FROM error_blocks WHERE block_height = ?1", params![block_height as i64])
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn due_error_blocks(&self, current_block: u64) -> Result<Vec<ErrorBlock>> {
    let conn = self.conn.lock();
    let mut stmt = conn
      .prepare(
        "SELECT block_height, error_message, retry_count, retry_at FROM error_blocks
         WHERE retry_at <= ?1 ORDER BY block_height ASC",
      )
      .map_err(StoreError::Sqlite)?;
    let rows = stmt
      .query_map(params![current_block as i64], |row| {
        Ok(ErrorBlock {
          block_height: row.get::<_, i64>(0)? as u64,
          error_message: row.get(1)?,
          retry_count: row.get::<_, i64>(2)? as u32,
          retry_at: row.get::<_, i64>(3)? as u64,
        })
      })
      .map_err(StoreError::Sqlite)?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(StoreError::Sqlite)?;
    Ok(rows)
  }

  pub fn error_block_count(&self) -> Result<u64> {
    let conn = self.conn.lock();
    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM error_blocks", [], |r| r.get(0))
      .map_err(StoreError::Sqlite)?;
    Ok(count as u64)
  }

  // ---- Stats & failures ---------------------------------------------------

  pub fn record_block_stats(&self, stats: &BlockStats) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO block_stats
           (block_height, total_transactions, total_inscriptions, brc420_deploys, brc420_mints,
            bitmaps, parcels, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(block_height) DO UPDATE SET
           total_transactions = excluded.total_transactions,
           total_inscriptions = excluded.total_inscriptions,
           brc420_deploys = excluded.brc420_deploys,
           brc420_mints = excluded.brc420_mints,
           bitmaps = excluded.bitmaps,
           parcels = excluded.parcels,
           processed_at = excluded.processed_at",
        params![
          stats.block_height as i64,
          stats.total_transactions as i64,
          stats.total_inscriptions as i64,
          stats.brc420_deploys as i64,
          stats.brc420_mints as i64,
          stats.bitmaps as i64,
          stats.parcels as i64,
          stats.processed_at,
        ],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn record_failed_inscription(&self, failed: &FailedInscription) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO failed_inscriptions (inscription_id, block_height, reason) VALUES (?1, ?2, ?3)",
        params![failed.inscription_id, failed.block_height as i64, failed.reason],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  pub fn upsert_bitmap_pattern(&self, bitmap_number: u64, pattern: &str) -> Result<()> {
    let conn = self.conn.lock();
    conn
      .execute(
        "INSERT INTO bitmap_patterns (bitmap_number, pattern) VALUES (?1, ?2)
         ON CONFLICT(bitmap_number) DO UPDATE SET pattern = excluded.pattern",
        params![bitmap_number as i64, pattern],
      )
      .map_err(StoreError::Sqlite)?;
    Ok(())
  }

  /// Snapshot used by the `stats` subcommand (§10).
  pub fn snapshot_stats(&self) -> Result<StoreStats> {
    let conn = self.conn.lock();
    let count = |sql: &str| -> rusqlite::Result<u64> {
      conn.query_row(sql, [], |r| r.get::<_, i64>(0)).map(|n| n as u64)
    };
    let max_processed: Option<i64> = conn
      .query_row("SELECT MAX(block_height) FROM blocks WHERE processed = 1", [], |r| r.get(0))
      .map_err(StoreError::Sqlite)?;
    Ok(StoreStats {
      deploys: count("SELECT COUNT(*) FROM deploys").map_err(StoreError::Sqlite)?,
      mints: count("SELECT COUNT(*) FROM mints").map_err(StoreError::Sqlite)?,
      bitmaps: count("SELECT COUNT(*) FROM bitmaps").map_err(StoreError::Sqlite)?,
      parcels: count("SELECT COUNT(*) FROM parcels").map_err(StoreError::Sqlite)?,
      highest_processed_block: max_processed.map(|h| h as u64),
      error_block_backlog: count("SELECT COUNT(*) FROM error_blocks").map_err(StoreError::Sqlite)?,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitmapClaim {
  Inserted,
  Replaced(String),
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParcelClaim {
  Inserted,
  Replaced(String),
  Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
  pub deploys: u64,
  pub mints: u64,
  pub bitmaps: u64,
  pub parcels: u64,
  pub highest_processed_block: Option<u64>,
  pub error_block_backlog: u64,
}

fn row_to_deploy(row: &rusqlite::Row) -> rusqlite::Result<Deploy> {
  Ok(Deploy {
    id: row.get(0)?,
    source_id: row.get(1)?,
    name: row.get(2)?,
    max_supply: row.get::<_, i64>(3)? as u64,
    price_sats: row.get::<_, i64>(4)? as u64,
    deployer_address: row.get(5)?,
    block_height: row.get::<_, i64>(6)? as u64,
    timestamp: row.get(7)?,
  })
}

fn row_to_bitmap(row: &rusqlite::Row) -> rusqlite::Result<Bitmap> {
  Ok(Bitmap {
    inscription_id: row.get(0)?,
    bitmap_number: row.get::<_, i64>(1)? as u64,
    content: row.get(2)?,
    address: row.get(3)?,
    block_height: row.get::<_, i64>(4)? as u64,
    timestamp: row.get(5)?,
    sat: row.get::<_, Option<i64>>(6)?.map(|v| v as u64),
    wallet: row.get(7)?,
  })
}

fn row_to_parcel(row: &rusqlite::Row) -> rusqlite::Result<Parcel> {
  Ok(Parcel {
    inscription_id: row.get(0)?,
    parcel_number: row.get::<_, i64>(1)? as u64,
    bitmap_number: row.get::<_, i64>(2)? as u64,
    bitmap_inscription_id: row.get(3)?,
    content: row.get(4)?,
    address: row.get(5)?,
    block_height: row.get::<_, i64>(6)? as u64,
    timestamp: row.get(7)?,
    transaction_count: row.get::<_, Option<i64>>(8)?.map(|v| v as u64),
    wallet: row.get(9)?,
  })
}

fn row_to_wallet(row: &rusqlite::Row) -> rusqlite::Result<Wallet> {
  let kind_str: String = row.get(2)?;
  Ok(Wallet {
    inscription_id: row.get(0)?,
    address: row.get(1)?,
    kind: WalletKind::from_str(&kind_str).unwrap_or(WalletKind::Bitmap),
    updated_at: row.get(3)?,
  })
}

#[cfg(test)]
mod test {
  use super::*;

  fn test_store() -> Store {
    Store::open(":memory:").unwrap()
  }

  fn sample_deploy() -> Deploy {
    Deploy {
      id: "A".to_string(),
      source_id: "SRC".to_string(),
      name: "FOO".to_string(),
      max_supply: 100,
      price_sats: 100_000,
      deployer_address: "bc1qX".to_string(),
      block_height: 792_435,
      timestamp: 0,
    }
  }

  #[test]
  fn insert_deploy_is_idempotent_on_id() {
    let store = test_store();
    assert!(store.insert_deploy(&sample_deploy()).unwrap());
    assert!(!store.insert_deploy(&sample_deploy()).unwrap());
    assert_eq!(store.deploy_by_id("A").unwrap().unwrap().name, "FOO");
  }

  #[test]
  fn insert_deploy_rejects_duplicate_source_id() {
    let store = test_store();
    store.insert_deploy(&sample_deploy()).unwrap();
    let mut other = sample_deploy();
    other.id = "B".to_string();
    assert!(!store.insert_deploy(&other).unwrap());
    assert!(store.deploy_by_id("B").unwrap().is_none());
  }

  #[test]
  fn resume_height_falls_back_to_configured_start() {
    let store = test_store();
    assert_eq!(store.resume_height(792_000).unwrap(), 792_000);
    store.mark_block_processed(792_000, 1).unwrap();
    assert_eq!(store.resume_height(792_000).unwrap(), 792_001);
  }

  #[test]
  fn parcel_tie_breaker_replaces_the_losing_row() {
    let store = test_store();
    let earlier = Parcel {
      inscription_id: "bbb...i0".to_string(),
      parcel_number: 3,
      bitmap_number: 42,
      bitmap_inscription_id: "bitmapid".to_string(),
      content: "3.42.bitmap".to_string(),
      address: "bc1qY".to_string(),
      block_height: 799_999,
      timestamp: 0,
      transaction_count: Some(10),
      wallet: "bc1qY".to_string(),
    };
    let later = Parcel { inscription_id: "aaa...i0".to_string(), block_height: 800_000, ..earlier.clone() };
    assert_eq!(store.claim_parcel(&later).unwrap(), ParcelClaim::Inserted);
    assert_eq!(store.claim_parcel(&earlier).unwrap(), ParcelClaim::Replaced(later.inscription_id.clone()));
    let winner = store.parcel_by_numbers(3, 42).unwrap().unwrap();
    assert_eq!(winner.inscription_id, "bbb...i0");
    // a later, higher-height candidate never displaces the winner
    let too_late = Parcel { inscription_id: "zzz...i0".to_string(), block_height: 900_000, ..earlier.clone() };
    assert_eq!(store.claim_parcel(&too_late).unwrap(), ParcelClaim::Rejected);
    assert_eq!(store.parcel_by_numbers(3, 42).unwrap().unwrap().inscription_id, "bbb...i0");
  }

  fn sample_bitmap(inscription_id: &str, block_height: u64) -> Bitmap {
    Bitmap {
      inscription_id: inscription_id.to_string(),
      bitmap_number: 792_000,
      content: "792000.bitmap".to_string(),
      address: "bc1qA".to_string(),
      block_height,
      timestamp: 0,
      sat: None,
      wallet: "bc1qA".to_string(),
    }
  }

  #[test]
  fn claim_bitmap_first_seen_wins_lexicographic_tie_break() {
    let store = test_store();
    assert_eq!(store.claim_bitmap(&sample_bitmap("bbb", 792_000)).unwrap(), BitmapClaim::Inserted);
    // later arrival with a lexicographically lower id at the same height wins
    assert_eq!(
      store.claim_bitmap(&sample_bitmap("aaa", 792_000)).unwrap(),
      BitmapClaim::Replaced("bbb".to_string())
    );
    assert_eq!(store.bitmap_by_number(792_000).unwrap().unwrap().inscription_id, "aaa");
    // a later, higher id never displaces the winner
    assert_eq!(store.claim_bitmap(&sample_bitmap("zzz", 792_000)).unwrap(), BitmapClaim::Rejected);
    assert_eq!(store.bitmap_by_number(792_000).unwrap().unwrap().inscription_id, "aaa");
  }

  #[test]
  fn wallet_upsert_is_idempotent() {
    let store = test_store();
    let wallet = Wallet {
      inscription_id: "A".to_string(),
      address: "bc1qX".to_string(),
      kind: WalletKind::Deploy,
      updated_at: 0,
    };
    store.upsert_wallet(&wallet).unwrap();
    store.upsert_wallet(&Wallet { address: "bc1qZ".to_string(), updated_at: 1, ..wallet }).unwrap();
    let current = store.wallet_for("A").unwrap().unwrap();
    assert_eq!(current.address, "bc1qZ");
    assert_eq!(store.all_wallets().unwrap().len(), 1);
  }

  #[test]
  fn error_blocks_round_trip() {
    let store = test_store();
    store.upsert_error_block(800_000, "boom", 800_010).unwrap();
    assert_eq!(store.due_error_blocks(800_005).unwrap().len(), 0);
    let due = store.due_error_blocks(800_010).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].retry_count, 1);
    store.upsert_error_block(800_000, "boom again", 800_020).unwrap();
    assert_eq!(store.due_error_blocks(800_020).unwrap()[0].retry_count, 2);
    store.clear_error_block(800_000).unwrap();
    assert_eq!(store.error_block_count().unwrap(), 0);
  }
}
