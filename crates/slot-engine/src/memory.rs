//! In-memory collaborators and a JSON snapshot format.
//!
//! Used by the `slots` CLI to replay a captured state and by tests to drive
//! the resolver. Failure and latency injection make upstream errors and
//! timeouts reproducible.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::civil::CivilDate;
use crate::error::{GatewayError, StoreError};
use crate::gateway::{BusyPeriod, CalendarGateway};
use crate::query::Principal;
use crate::store::{DayWindow, PrincipalDirectory, ReservationStore, StoredReservation};

/// Calendar keyed by identity (case-insensitive).
#[derive(Debug, Default)]
pub struct InMemoryCalendar {
    periods: RwLock<HashMap<String, Vec<BusyPeriod>>>,
    failure: RwLock<Option<GatewayError>>,
    latency: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, calendar_identity: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.periods
            .write()
            .entry(calendar_identity.to_ascii_lowercase())
            .or_default()
            .push(BusyPeriod { start, end });
    }

    /// Make every subsequent query fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<GatewayError>) {
        *self.failure.write() = error;
    }

    /// Delay every subsequent query by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Number of queries received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CalendarGateway for InMemoryCalendar {
    async fn busy_periods(
        &self,
        calendar_identity: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyPeriod>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }

        Ok(self
            .periods
            .read()
            .get(&calendar_identity.to_ascii_lowercase())
            .map(|periods| {
                periods
                    .iter()
                    .filter(|p| p.start < range_end && p.end > range_start)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A stored reservation together with its owner and, for window-only
/// records, the civil date it applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub principal_id: String,
    #[serde(default)]
    pub date: Option<CivilDate>,
    #[serde(flatten)]
    pub reservation: StoredReservation,
}

impl SnapshotRecord {
    fn on_day(&self, principal_id: &str, day: &DayWindow) -> bool {
        if self.principal_id != principal_id || self.reservation.is_cancelled() {
            return false;
        }
        if self.date == Some(day.date) {
            return true;
        }
        match (self.reservation.start, self.reservation.end) {
            (Some(start), Some(end)) => start < day.end && end > day.start,
            _ => false,
        }
    }
}

/// Both reservation collections, held in memory.
#[derive(Debug, Default)]
pub struct InMemoryReservations {
    bookings: RwLock<Vec<SnapshotRecord>>,
    onboardings: RwLock<Vec<SnapshotRecord>>,
    failure: RwLock<Option<StoreError>>,
}

impl InMemoryReservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_booking(&self, record: SnapshotRecord) {
        self.bookings.write().push(record);
    }

    pub fn add_onboarding(&self, record: SnapshotRecord) {
        self.onboardings.write().push(record);
    }

    /// Update the status of every record with `id` in either collection.
    /// Returns how many records changed.
    pub fn set_status(&self, id: &str, status: &str) -> usize {
        let mut changed = 0;
        for collection in [&self.bookings, &self.onboardings] {
            for record in collection.write().iter_mut() {
                if record.reservation.id == id {
                    record.reservation.status = status.to_string();
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }

    fn query(
        &self,
        collection: &RwLock<Vec<SnapshotRecord>>,
        principal_id: &str,
        day: &DayWindow,
    ) -> Result<Vec<StoredReservation>, StoreError> {
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }
        Ok(collection
            .read()
            .iter()
            .filter(|r| r.on_day(principal_id, day))
            .map(|r| r.reservation.clone())
            .collect())
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservations {
    async fn booking_reservations(
        &self,
        principal_id: &str,
        day: DayWindow,
    ) -> Result<Vec<StoredReservation>, StoreError> {
        self.query(&self.bookings, principal_id, &day)
    }

    async fn onboarding_reservations(
        &self,
        principal_id: &str,
        day: DayWindow,
    ) -> Result<Vec<StoredReservation>, StoreError> {
        self.query(&self.onboardings, principal_id, &day)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    principals: HashMap<String, Principal>,
}

impl StaticDirectory {
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Self {
        Self {
            principals: principals.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for StaticDirectory {
    async fn find_principal(&self, principal_id: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self.principals.get(principal_id).cloned())
    }
}

/// A captured state of principals, calendars and reservation records.
///
/// ```json
/// {
///   "principals": [{ "id": "p1", "calendar_identity": "p1@example.com" }],
///   "calendar": { "p1@example.com": [{ "start": "2025-03-10T04:30:00Z", "end": "2025-03-10T05:30:00Z" }] },
///   "bookings": [{ "principal_id": "p1", "id": "b1", "status": "Confirmed",
///                  "start": "2025-03-10T09:30:00Z", "end": "2025-03-10T11:30:00Z" }],
///   "onboardings": [{ "principal_id": "p1", "date": "2025-03-10", "id": "o1",
///                     "status": "booked", "raw_slot_window": "18_19" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub principals: Vec<Principal>,
    pub calendar: HashMap<String, Vec<BusyPeriod>>,
    pub bookings: Vec<SnapshotRecord>,
    pub onboardings: Vec<SnapshotRecord>,
}

impl Snapshot {
    /// Parse a snapshot.
    ///
    /// Every record must carry a `date` or both `start` and `end`; a record
    /// with neither could never be matched to a day and would silently read
    /// as free time.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let snapshot: Self = serde_json::from_str(raw)?;

        let undated = snapshot
            .bookings
            .iter()
            .chain(&snapshot.onboardings)
            .find(|r| {
                r.date.is_none() && (r.reservation.start.is_none() || r.reservation.end.is_none())
            });
        if let Some(record) = undated {
            return Err(serde::de::Error::custom(format!(
                "record '{}' has neither a date nor start and end instants",
                record.reservation.id
            )));
        }

        Ok(snapshot)
    }

    pub fn into_parts(self) -> (InMemoryCalendar, InMemoryReservations, StaticDirectory) {
        let calendar = InMemoryCalendar::new();
        for (identity, periods) in &self.calendar {
            for period in periods {
                calendar.insert(identity, period.start, period.end);
            }
        }

        let reservations = InMemoryReservations::new();
        for record in self.bookings {
            reservations.add_booking(record);
        }
        for record in self.onboardings {
            reservations.add_onboarding(record);
        }

        (calendar, reservations, StaticDirectory::new(self.principals))
    }
}
