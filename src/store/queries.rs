//! The schema, as DDL, and the SQL text used by `Store`. Kept in one place
//! so the UNIQUE constraints enforcing spec.md §3/§8's invariants are easy
//! to audit against that list in one read.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS deploys (
  id               TEXT PRIMARY KEY,
  source_id        TEXT NOT NULL UNIQUE,
  name             TEXT NOT NULL,
  max_supply       INTEGER NOT NULL,
  price_sats       INTEGER NOT NULL,
  deployer_address TEXT NOT NULL,
  block_height     INTEGER NOT NULL,
  timestamp        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS mints (
  id             TEXT PRIMARY KEY,
  deploy_id      TEXT NOT NULL REFERENCES deploys(id),
  source_id      TEXT NOT NULL,
  mint_address   TEXT NOT NULL,
  transaction_id TEXT NOT NULL,
  block_height   INTEGER NOT NULL,
  timestamp      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS mints_deploy_id ON mints(deploy_id);

CREATE TABLE IF NOT EXISTS bitmaps (
  inscription_id TEXT PRIMARY KEY,
  bitmap_number  INTEGER NOT NULL UNIQUE,
  content        TEXT NOT NULL,
  address        TEXT NOT NULL,
  block_height   INTEGER NOT NULL,
  timestamp      INTEGER NOT NULL,
  sat            INTEGER,
  wallet         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parcels (
  inscription_id        TEXT PRIMARY KEY,
  parcel_number         INTEGER NOT NULL,
  bitmap_number         INTEGER NOT NULL,
  bitmap_inscription_id TEXT NOT NULL,
  content               TEXT NOT NULL,
  address               TEXT NOT NULL,
  block_height          INTEGER NOT NULL,
  timestamp             INTEGER NOT NULL,
  transaction_count     INTEGER,
  wallet                TEXT NOT NULL,
  UNIQUE(parcel_number, bitmap_number)
);

CREATE TABLE IF NOT EXISTS wallets (
  inscription_id TEXT PRIMARY KEY,
  address        TEXT NOT NULL,
  kind           TEXT NOT NULL,
  updated_at     INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS blocks (
  block_height INTEGER PRIMARY KEY,
  processed    INTEGER NOT NULL DEFAULT 0,
  processed_at INTEGER
);

CREATE TABLE IF NOT EXISTS error_blocks (
  block_height  INTEGER PRIMARY KEY,
  error_message TEXT NOT NULL,
  retry_count   INTEGER NOT NULL DEFAULT 0,
  retry_at      INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS block_stats (
  block_height       INTEGER PRIMARY KEY,
  total_transactions INTEGER NOT NULL,
  total_inscriptions INTEGER NOT NULL,
  brc420_deploys     INTEGER NOT NULL,
  brc420_mints       INTEGER NOT NULL,
  bitmaps            INTEGER NOT NULL,
  parcels            INTEGER NOT NULL,
  processed_at       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS address_history (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  inscription_id TEXT NOT NULL,
  old_address    TEXT NOT NULL,
  new_address    TEXT NOT NULL,
  block_height   INTEGER NOT NULL,
  timestamp      INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS address_history_inscription_id ON address_history(inscription_id);

CREATE TABLE IF NOT EXISTS bitmap_patterns (
  bitmap_number INTEGER PRIMARY KEY,
  pattern       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS failed_inscriptions (
  id             INTEGER PRIMARY KEY AUTOINCREMENT,
  inscription_id TEXT NOT NULL,
  block_height   INTEGER NOT NULL,
  reason         TEXT NOT NULL
);
"#;
