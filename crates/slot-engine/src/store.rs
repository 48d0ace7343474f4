//! Local reservation store and principal directory ports, plus normalization
//! of stored reservation records into busy intervals.
//!
//! Two record collections hold reservations. Booking records usually carry
//! explicit start/end instants; onboarding records usually carry only a raw
//! slot-window string for the day. Either shape is accepted from either
//! collection: explicit instants win, and a raw window is decoded otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::civil::{CivilClock, CivilDate};
use crate::error::{Result, StoreError};
use crate::freebusy::{BusySource, ReservationInterval};
use crate::query::Principal;
use crate::window::decode;

const CANCELLED: &str = "cancelled";

/// The local civil day being resolved, with its instant bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub date: CivilDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn new(date: CivilDate, clock: &CivilClock) -> Result<Self> {
        let (start, end) = clock.day_bounds(date)?;
        Ok(Self { date, start, end })
    }
}

/// A reservation row as read from either collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredReservation {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_slot_window: Option<String>,
}

impl StoredReservation {
    /// Status comparison ignores case; historical rows mix `Cancelled` and `cancelled`.
    pub fn is_cancelled(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(CANCELLED)
    }
}

/// Read access to locally persisted reservations.
///
/// Implementations should already omit cancelled records; the resolver filters
/// them again regardless.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reservations from the booking collection for `principal_id` on `day`.
    async fn booking_reservations(
        &self,
        principal_id: &str,
        day: DayWindow,
    ) -> std::result::Result<Vec<StoredReservation>, StoreError>;

    /// Reservations from the onboarding collection for `principal_id` on `day`.
    async fn onboarding_reservations(
        &self,
        principal_id: &str,
        day: DayWindow,
    ) -> std::result::Result<Vec<StoredReservation>, StoreError>;
}

/// Lookup of principals by id.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_principal(
        &self,
        principal_id: &str,
    ) -> std::result::Result<Option<Principal>, StoreError>;
}

/// A live reservation whose time window could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrecognizedWindow {
    pub record_id: String,
    pub source: BusySource,
    pub raw: Option<String>,
}

/// Busy intervals derived from one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecords {
    pub intervals: Vec<ReservationInterval>,
    pub unrecognized: Vec<UnrecognizedWindow>,
}

/// Convert live records into busy intervals on `date`.
///
/// Cancelled records are skipped silently. Records whose window cannot be
/// decoded contribute no interval and are reported in
/// [`NormalizedRecords::unrecognized`] with a warning.
pub fn normalize_records(
    records: &[StoredReservation],
    source: BusySource,
    date: CivilDate,
    clock: &CivilClock,
) -> Result<NormalizedRecords> {
    let mut out = NormalizedRecords::default();

    for record in records.iter().filter(|r| !r.is_cancelled()) {
        if let (Some(start), Some(end)) = (record.start, record.end) {
            match ReservationInterval::new(start, end, source, &record.id) {
                Some(interval) => out.intervals.push(interval),
                None => {
                    warn!(record_id = %record.id, %source, %start, %end, "reservation has inverted instants");
                    out.unrecognized.push(UnrecognizedWindow {
                        record_id: record.id.clone(),
                        source,
                        raw: None,
                    });
                }
            }
            continue;
        }

        let Some(raw) = record.raw_slot_window.as_deref() else {
            warn!(record_id = %record.id, %source, "reservation has neither instants nor a slot window");
            out.unrecognized.push(UnrecognizedWindow {
                record_id: record.id.clone(),
                source,
                raw: None,
            });
            continue;
        };

        let Some((start_hour, end_hour)) = decode(raw).hours() else {
            warn!(record_id = %record.id, %source, raw, "unrecognized slot window; reservation not counted as busy");
            out.unrecognized.push(UnrecognizedWindow {
                record_id: record.id.clone(),
                source,
                raw: Some(raw.to_string()),
            });
            continue;
        };

        let start = clock.to_instant(date, start_hour, 0)?;
        let end = clock.to_instant(date, end_hour, 0)?;
        // The decoder guarantees start_hour < end_hour.
        if let Some(interval) = ReservationInterval::new(start, end, source, &record.id) {
            out.intervals.push(interval);
        }
    }

    Ok(out)
}
