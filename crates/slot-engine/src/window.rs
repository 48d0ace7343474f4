//! Decoding of stored slot-window strings.
//!
//! Historical reservation records encode the reserved window in one of two
//! ways: a numeric hour range joined by an underscore (`"14_17"`) or a
//! human-readable label (`"2 PM - 5 PM"`, `"2 PM – 5 PM"`). Anything else is
//! reported as [`SlotWindow::Unknown`] rather than guessed at.

use std::fmt;

/// Label windows only ever covered business hours in 1 to 3 hour blocks.
const LABEL_FIRST_HOUR: u32 = 10;
const LABEL_LAST_HOUR: u32 = 19;
const LABEL_MAX_SPAN: u32 = 3;

const EN_DASH: char = '\u{2013}';

/// A decoded slot window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotWindow {
    /// Underscore-joined hour range, e.g. `"14_17"`.
    Numeric { start_hour: u32, end_hour: u32 },
    /// Human-readable label, e.g. `"2 PM – 5 PM"`.
    Label { start_hour: u32, end_hour: u32 },
    /// Neither encoding matched. Carries the raw input.
    Unknown(String),
}

impl SlotWindow {
    /// The `(start_hour, end_hour)` pair, or `None` for an unknown window.
    pub fn hours(&self) -> Option<(u32, u32)> {
        match *self {
            SlotWindow::Numeric {
                start_hour,
                end_hour,
            }
            | SlotWindow::Label {
                start_hour,
                end_hour,
            } => Some((start_hour, end_hour)),
            SlotWindow::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, SlotWindow::Unknown(_))
    }
}

/// Decode a raw stored window.
///
/// # Examples
///
/// ```
/// use slot_engine::window::{decode, SlotWindow};
///
/// assert_eq!(decode("14_17").hours(), Some((14, 17)));
/// assert_eq!(decode("2 PM - 5 PM").hours(), Some((14, 17)));
/// assert_eq!(decode("2 PM \u{2013} 5 PM").hours(), Some((14, 17)));
/// assert!(matches!(decode("garbled"), SlotWindow::Unknown(_)));
/// ```
pub fn decode(raw: &str) -> SlotWindow {
    let trimmed = raw.trim();

    if let Some((start_hour, end_hour)) = decode_numeric(trimmed) {
        return SlotWindow::Numeric {
            start_hour,
            end_hour,
        };
    }
    if let Some((start_hour, end_hour)) = decode_label(trimmed) {
        return SlotWindow::Label {
            start_hour,
            end_hour,
        };
    }

    SlotWindow::Unknown(raw.to_string())
}

fn decode_numeric(raw: &str) -> Option<(u32, u32)> {
    let (start, end) = raw.split_once('_')?;
    let start = parse_digits(start)?;
    let end = parse_digits(end)?;
    (start < end && end < 24).then_some((start, end))
}

fn parse_digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn decode_label(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.split(['-', EN_DASH]);
    let start = parse_clock_hour(parts.next()?)?;
    let end = parse_clock_hour(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }

    let in_hours = LABEL_FIRST_HOUR <= start && end <= LABEL_LAST_HOUR;
    let span_ok = start < end && end - start <= LABEL_MAX_SPAN;
    (in_hours && span_ok).then_some((start, end))
}

/// Parse `"2 PM"` / `"11am"` into a 24-hour value.
fn parse_clock_hour(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if raw.len() < 3 || !raw.is_char_boundary(raw.len() - 2) {
        return None;
    }
    let (digits, meridiem) = raw.split_at(raw.len() - 2);
    let hour = parse_digits(digits.trim_end())?;
    if !(1..=12).contains(&hour) {
        return None;
    }

    match meridiem.to_ascii_uppercase().as_str() {
        "AM" => Some(hour % 12),
        "PM" => Some(hour % 12 + 12),
        _ => None,
    }
}

/// Canonical display label for an hour range, e.g. `(14, 17)` → `"2 PM – 5 PM"`.
pub fn format_label(start_hour: u32, end_hour: u32) -> String {
    format!(
        "{} {} {}",
        ClockHour(start_hour),
        EN_DASH,
        ClockHour(end_hour)
    )
}

struct ClockHour(u32);

impl fmt::Display for ClockHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meridiem = if self.0 < 12 { "AM" } else { "PM" };
        let hour = match self.0 % 12 {
            0 => 12,
            h => h,
        };
        write!(f, "{hour} {meridiem}")
    }
}
