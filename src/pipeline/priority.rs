//! Step 4 of the Inscription Pipeline (C5), spec.md §4.5: prioritised
//! queues drained in order — `high = deploys; medium = mints + bitmaps;
//! low = other text; skip = binary`.

use super::classify::InscriptionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Queue {
  High,
  Medium,
  Low,
  Skip,
}

pub fn queue_for(kind: InscriptionKind) -> Queue {
  match kind {
    InscriptionKind::Brc420Deploy => Queue::High,
    InscriptionKind::Brc420Mint | InscriptionKind::Bitmap | InscriptionKind::Parcel => Queue::Medium,
    InscriptionKind::Json | InscriptionKind::Text => Queue::Low,
    InscriptionKind::Binary | InscriptionKind::Unknown => Queue::Skip,
  }
}

/// Partitions classified IDs into the four queues, preserving arrival order
/// within each queue, then drains them high-to-low (§4.5 step 4).
pub fn partition(items: Vec<(String, InscriptionKind)>) -> Vec<(String, InscriptionKind)> {
  let mut high = Vec::new();
  let mut medium = Vec::new();
  let mut low = Vec::new();

  for (id, kind) in items {
    match queue_for(kind) {
      Queue::High => high.push((id, kind)),
      Queue::Medium => medium.push((id, kind)),
      Queue::Low => low.push((id, kind)),
      Queue::Skip => {}
    }
  }

  high.into_iter().chain(medium).chain(low).collect()
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn drains_high_before_medium_before_low_and_drops_skip() {
    let items = vec![
      ("low1".to_string(), InscriptionKind::Text),
      ("high1".to_string(), InscriptionKind::Brc420Deploy),
      ("skip1".to_string(), InscriptionKind::Binary),
      ("medium1".to_string(), InscriptionKind::Bitmap),
    ];
    let ordered: Vec<String> = partition(items).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ordered, vec!["high1", "medium1", "low1"]);
  }
}
