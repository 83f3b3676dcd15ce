//! Dynamic Batch Sizer (C4), spec.md §4.4: `batch in [10, 200]`, initial 50.
//! Three consecutive successful batches grow it by 10; any failure shrinks
//! it by 10 immediately.

use parking_lot::Mutex;
use std::sync::Arc;

pub struct BatchSizer {
  min: usize,
  max: usize,
  size: Mutex<usize>,
  consecutive_successes: Mutex<u32>,
}

impl BatchSizer {
  pub fn new(min: usize, max: usize, initial: usize) -> Arc<Self> {
    Arc::new(Self {
      min,
      max,
      size: Mutex::new(initial.clamp(min, max)),
      consecutive_successes: Mutex::new(0),
    })
  }

  pub fn size(&self) -> usize {
    *self.size.lock()
  }

  pub fn record_batch_success(&self) {
    let mut streak = self.consecutive_successes.lock();
    *streak += 1;
    if *streak >= 3 {
      *streak = 0;
      let mut size = self.size.lock();
      *size = (*size + 10).min(self.max);
    }
  }

  pub fn record_batch_failure(&self) {
    *self.consecutive_successes.lock() = 0;
    let mut size = self.size.lock();
    *size = size.saturating_sub(10).max(self.min);
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn grows_after_three_consecutive_successes() {
    let sizer = BatchSizer::new(10, 200, 50);
    sizer.record_batch_success();
    sizer.record_batch_success();
    assert_eq!(sizer.size(), 50);
    sizer.record_batch_success();
    assert_eq!(sizer.size(), 60);
  }

  #[test]
  fn shrinks_immediately_on_failure() {
    let sizer = BatchSizer::new(10, 200, 50);
    sizer.record_batch_success();
    sizer.record_batch_success();
    sizer.record_batch_failure();
    sizer.record_batch_success();
    sizer.record_batch_success();
    sizer.record_batch_success();
    assert_eq!(sizer.size(), 50);
  }

  #[test]
  fn never_exceeds_configured_bounds() {
    let sizer = BatchSizer::new(10, 60, 50);
    for _ in 0..10 {
      sizer.record_batch_success();
      sizer.record_batch_success();
      sizer.record_batch_success();
    }
    assert_eq!(sizer.size(), 60);

    let sizer = BatchSizer::new(15, 200, 20);
    for _ in 0..10 {
      sizer.record_batch_failure();
    }
    assert_eq!(sizer.size(), 15);
  }
}
