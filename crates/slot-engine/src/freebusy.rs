//! Busy intervals, interval merging and the overlap filter.
//!
//! A candidate slot is available iff it overlaps no busy interval from any
//! source. Intervals are half-open: one ending exactly when another starts
//! does not overlap it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidates::SlotCandidate;

/// Where a busy interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusySource {
    Calendar,
    BookingRecord,
    OnboardingRecord,
}

impl fmt::Display for BusySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BusySource::Calendar => "calendar",
            BusySource::BookingRecord => "booking-record",
            BusySource::OnboardingRecord => "onboarding-record",
        })
    }
}

/// A normalized busy period. `start < end` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: BusySource,
    pub record_id: String,
}

impl ReservationInterval {
    /// Returns `None` unless `start < end`.
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        source: BusySource,
        record_id: impl Into<String>,
    ) -> Option<Self> {
        (start < end).then(|| Self {
            start,
            end,
            source,
            record_id: record_id.into(),
        })
    }
}

/// A merged busy block covering one or more overlapping intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyBlock {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Two intervals overlap iff `a.start < b.end && b.start < a.end`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Keep the candidates that overlap no busy interval, preserving their order.
///
/// Pure: the same inputs always yield the same output.
pub fn filter_available(
    candidates: &[SlotCandidate],
    busy: &[ReservationInterval],
) -> Vec<SlotCandidate> {
    candidates
        .iter()
        .filter(|c| {
            !busy
                .iter()
                .any(|b| overlaps(c.start, c.end, b.start, b.end))
        })
        .cloned()
        .collect()
}

/// Merge overlapping or adjacent busy intervals into sorted, disjoint blocks.
pub fn merge_busy_periods(busy: &[ReservationInterval]) -> Vec<BusyBlock> {
    let mut intervals: Vec<(DateTime<Utc>, DateTime<Utc>)> =
        busy.iter().map(|b| (b.start, b.end)).collect();

    // Sort by start time (then by end time for stability).
    intervals.sort_by_key(|&(start, end)| (start, end));

    let mut merged: Vec<BusyBlock> = Vec::new();
    for (start, end) in intervals {
        if let Some(last) = merged.last_mut() {
            if start <= last.end {
                last.end = last.end.max(end);
                continue;
            }
        }
        merged.push(BusyBlock { start, end });
    }

    merged
}
