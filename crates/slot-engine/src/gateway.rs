//! External calendar port and calendar-noise filtering.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::civil::{CivilClock, CivilDate};
use crate::error::GatewayError;
use crate::freebusy::{BusySource, ReservationInterval};

/// A busy period as reported by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Read access to a principal's external calendar.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Busy periods for `calendar_identity` between `range_start` and `range_end`.
    ///
    /// Retry policy, if any, belongs to the implementation.
    async fn busy_periods(
        &self,
        calendar_identity: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<BusyPeriod>, GatewayError>;
}

/// Turn raw calendar periods into busy intervals for `date`.
///
/// Drops periods that are inverted or empty, periods longer than
/// `max_busy_hours` (all-day entries), and periods whose local start date and
/// local end date both differ from `date`.
pub fn normalize_calendar(
    periods: &[BusyPeriod],
    date: CivilDate,
    clock: &CivilClock,
    max_busy_hours: u32,
) -> Vec<ReservationInterval> {
    let max_span = Duration::hours(i64::from(max_busy_hours));

    periods
        .iter()
        .enumerate()
        .filter_map(|(index, period)| {
            if period.end - period.start > max_span {
                debug!(index, start = %period.start, end = %period.end, "discarding all-day calendar period");
                return None;
            }

            let start_date = clock.to_civil(period.start).date;
            let end_date = clock.to_civil(period.end).date;
            if start_date != date && end_date != date {
                debug!(index, %start_date, %end_date, "discarding calendar period outside requested date");
                return None;
            }

            let interval = ReservationInterval::new(
                period.start,
                period.end,
                BusySource::Calendar,
                format!("calendar#{index}"),
            );
            if interval.is_none() {
                debug!(index, start = %period.start, end = %period.end, "discarding empty calendar period");
            }
            interval
        })
        .collect()
}
