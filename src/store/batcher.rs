//! Write batcher (C3), spec.md §4.3: coalesces Wallet upserts in groups of
//! `size`, flushed inside one transaction. Grounded in the teacher's
//! commit-every-N pattern in `index/updater.rs::update_index` (there it
//! counts uncommitted write-transaction operations and commits at a
//! threshold; here the threshold is a buffered-row count instead of an
//! operation count, adapted from redb's write-transaction handle to
//! rusqlite's `Transaction`).

use crate::store::models::Wallet;
use parking_lot::Mutex;

pub struct WalletBatcher {
  size: usize,
  buffer: Mutex<Vec<Wallet>>,
}

impl WalletBatcher {
  pub fn new(size: usize) -> Self {
    Self { size: size.max(1), buffer: Mutex::new(Vec::new()) }
  }

  /// Buffers a wallet upsert; returns the buffered batch if it has reached
  /// `size`, for the caller to flush without holding the lock during I/O.
  pub fn push(&self, wallet: Wallet) -> Option<Vec<Wallet>> {
    let mut buffer = self.buffer.lock();
    buffer.push(wallet);
    if buffer.len() >= self.size {
      Some(std::mem::take(&mut buffer))
    } else {
      None
    }
  }

  /// Drains whatever remains, regardless of size. Called at block end (§4.3
  /// "flushed at end of each block").
  pub fn drain(&self) -> Vec<Wallet> {
    std::mem::take(&mut self.buffer.lock())
  }

  pub fn pending(&self) -> usize {
    self.buffer.lock().len()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::store::models::WalletKind;

  fn wallet(id: &str) -> Wallet {
    Wallet {
      inscription_id: id.to_string(),
      address: "bc1qtest".to_string(),
      kind: WalletKind::Bitmap,
      updated_at: 0,
    }
  }

  #[test]
  fn returns_batch_once_size_is_reached() {
    let batcher = WalletBatcher::new(3);
    assert!(batcher.push(wallet("a")).is_none());
    assert!(batcher.push(wallet("b")).is_none());
    let batch = batcher.push(wallet("c")).unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batcher.pending(), 0);
  }

  #[test]
  fn drain_flushes_a_partial_batch() {
    let batcher = WalletBatcher::new(50);
    batcher.push(wallet("a"));
    batcher.push(wallet("b"));
    let drained = batcher.drain();
    assert_eq!(drained.len(), 2);
    assert_eq!(batcher.pending(), 0);
  }
}
