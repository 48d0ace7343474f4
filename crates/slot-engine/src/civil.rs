//! Fixed-offset civil time.
//!
//! Converts a local wall-clock reading (date, hour, minute) in a fixed UTC
//! offset into an absolute instant and back. The offset is a plain number of
//! minutes injected through [`CivilClock`]; no time-zone database is consulted.
//! Conversion is exact integer arithmetic: the offset is applied to the
//! minute-of-day and any borrow or carry is propagated through
//! day → month → year using the real month lengths (leap years included).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AvailabilityError, Result};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Gregorian leap-year rule.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in `month` (1-12) of `year`. Returns 0 for an out-of-range month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// A calendar date with no time-of-day and no zone.
///
/// Always a valid Gregorian date; the only constructors validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CivilDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CivilDate {
    /// Build a date, rejecting impossible month/day combinations.
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(AvailabilityError::Validation(format!(
                "year {year} out of range"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(AvailabilityError::Validation(format!(
                "month {month} out of range"
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(AvailabilityError::Validation(format!(
                "day {day} out of range for {year:04}-{month:02}"
            )));
        }
        Ok(Self { year, month, day })
    }

    /// Parse a strict `YYYY-MM-DD` string.
    pub fn parse(raw: &str) -> Result<Self> {
        let bytes = raw.as_bytes();
        let well_formed = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !well_formed {
            return Err(AvailabilityError::Validation(format!(
                "date '{raw}' is not in YYYY-MM-DD form"
            )));
        }

        // All digit positions were checked above, so these parses cannot fail.
        let field = |range: std::ops::Range<usize>| raw[range].parse::<u32>().unwrap_or(0);
        Self::new(field(0..4) as i32, field(5..7), field(8..10))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The previous calendar day, borrowing across month and year boundaries.
    pub fn pred(self) -> Self {
        if self.day > 1 {
            Self {
                day: self.day - 1,
                ..self
            }
        } else if self.month > 1 {
            let month = self.month - 1;
            Self {
                year: self.year,
                month,
                day: days_in_month(self.year, month),
            }
        } else {
            Self {
                year: self.year - 1,
                month: 12,
                day: 31,
            }
        }
    }

    /// The next calendar day, carrying across month and year boundaries.
    pub fn succ(self) -> Self {
        if self.day < days_in_month(self.year, self.month) {
            Self {
                day: self.day + 1,
                ..self
            }
        } else if self.month < 12 {
            Self {
                year: self.year,
                month: self.month + 1,
                day: 1,
            }
        } else {
            Self {
                year: self.year + 1,
                month: 1,
                day: 1,
            }
        }
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CivilDate {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CivilDate {
    type Error = AvailabilityError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CivilDate> for String {
    fn from(date: CivilDate) -> Self {
        date.to_string()
    }
}

/// A wall-clock reading at minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDateTime {
    pub date: CivilDate,
    pub hour: u32,
    pub minute: u32,
}

impl fmt::Display for CivilDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.date, self.hour, self.minute)
    }
}

/// A fixed UTC offset in whole minutes, east of Greenwich positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneOffset {
    minutes: i32,
}

impl ZoneOffset {
    /// India Standard Time, UTC+05:30.
    pub const IST: ZoneOffset = ZoneOffset { minutes: 330 };

    pub const UTC: ZoneOffset = ZoneOffset { minutes: 0 };

    /// Build an offset; it must be strictly less than a day in magnitude.
    pub fn from_minutes(minutes: i32) -> Result<Self> {
        if minutes.abs() >= MINUTES_PER_DAY {
            return Err(AvailabilityError::CivilTime(format!(
                "offset of {minutes} minutes is a day or more"
            )));
        }
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> i32 {
        self.minutes
    }
}

impl Default for ZoneOffset {
    fn default() -> Self {
        Self::IST
    }
}

impl fmt::Display for ZoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.abs();
        write!(f, "{}{:02}:{:02}", sign, abs / 60, abs % 60)
    }
}

/// Converter between civil time in one fixed offset and absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CivilClock {
    offset: ZoneOffset,
}

impl CivilClock {
    pub fn new(offset: ZoneOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> ZoneOffset {
        self.offset
    }

    /// Convert local `hour:minute` on `date` into an absolute instant.
    ///
    /// # Errors
    ///
    /// Returns [`AvailabilityError::CivilTime`] if `hour >= 24` or `minute >= 60`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_engine::civil::{CivilClock, CivilDate, ZoneOffset};
    ///
    /// let clock = CivilClock::new(ZoneOffset::IST);
    /// let date = CivilDate::new(2025, 1, 1).unwrap();
    /// let instant = clock.to_instant(date, 0, 15).unwrap();
    /// assert_eq!(instant.to_rfc3339(), "2024-12-31T18:45:00+00:00");
    /// ```
    pub fn to_instant(&self, date: CivilDate, hour: u32, minute: u32) -> Result<DateTime<Utc>> {
        if hour >= 24 || minute >= 60 {
            return Err(AvailabilityError::CivilTime(format!(
                "{hour:02}:{minute:02} is not a wall-clock time"
            )));
        }

        let local_minutes = (hour * 60 + minute) as i32;
        let (utc_date, utc_minutes) = shift(date, local_minutes - self.offset.minutes);

        Utc.with_ymd_and_hms(
            utc_date.year,
            utc_date.month,
            utc_date.day,
            (utc_minutes / 60) as u32,
            (utc_minutes % 60) as u32,
            0,
        )
        .single()
        .ok_or_else(|| {
            AvailabilityError::CivilTime(format!("{date} {hour:02}:{minute:02} has no instant"))
        })
    }

    /// Express `instant` as a local wall-clock reading. Seconds are truncated.
    pub fn to_civil(&self, instant: DateTime<Utc>) -> CivilDateTime {
        let utc_date = CivilDate {
            year: instant.year(),
            month: instant.month(),
            day: instant.day(),
        };
        let utc_minutes = (instant.hour() * 60 + instant.minute()) as i32;
        let (date, minutes) = shift(utc_date, utc_minutes + self.offset.minutes);

        CivilDateTime {
            date,
            hour: (minutes / 60) as u32,
            minute: (minutes % 60) as u32,
        }
    }

    /// Instants for local 00:00 and 23:59 on `date`.
    pub fn day_bounds(&self, date: CivilDate) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((self.to_instant(date, 0, 0)?, self.to_instant(date, 23, 59)?))
    }
}

/// Normalize a minute-of-day that may have left `0..1440`, moving `date` by
/// the number of whole days borrowed or carried.
fn shift(mut date: CivilDate, mut minutes: i32) -> (CivilDate, i32) {
    while minutes < 0 {
        minutes += MINUTES_PER_DAY;
        date = date.pred();
    }
    while minutes >= MINUTES_PER_DAY {
        minutes -= MINUTES_PER_DAY;
        date = date.succ();
    }
    (date, minutes)
}
