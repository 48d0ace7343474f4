//! Explain why candidates were excluded.
//!
//! Pairs every candidate with each busy interval it overlaps. Adjacent
//! intervals (one ends exactly when the other starts) are NOT conflicts.

use serde::Serialize;

use crate::candidates::SlotCandidate;
use crate::freebusy::{overlaps, ReservationInterval};

/// A busy interval that blocks a candidate slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blocking {
    pub candidate: SlotCandidate,
    pub busy: ReservationInterval,
    pub overlap_minutes: i64,
}

/// Find every (candidate, busy interval) pair that overlaps.
///
/// The overlap duration is `min(a.end, b.end) - max(a.start, b.start)`.
pub fn find_blocking(candidates: &[SlotCandidate], busy: &[ReservationInterval]) -> Vec<Blocking> {
    let mut blocking = Vec::new();

    for c in candidates {
        for b in busy {
            if overlaps(c.start, c.end, b.start, b.end) {
                let overlap_start = c.start.max(b.start);
                let overlap_end = c.end.min(b.end);

                blocking.push(Blocking {
                    candidate: c.clone(),
                    busy: b.clone(),
                    overlap_minutes: (overlap_end - overlap_start).num_minutes(),
                });
            }
        }
    }

    blocking
}
