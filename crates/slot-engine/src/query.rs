//! Query and result types for availability resolution.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidates::{PrincipalClass, SlotCandidate};
use crate::civil::CivilDate;
use crate::error::{AvailabilityError, Result};

/// Meeting mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Physical,
    Virtual,
}

impl FromStr for Mode {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physical" => Ok(Mode::Physical),
            "virtual" => Ok(Mode::Virtual),
            _ => Err(AvailabilityError::Validation(format!(
                "mode '{s}' must be 'physical' or 'virtual'"
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Physical => "physical",
            Mode::Virtual => "virtual",
        })
    }
}

/// An onboarding specialist as known to the principal directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier.
    pub id: String,
    /// Address used to query the external calendar.
    pub calendar_identity: String,
}

/// Input to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub principal_id: String,
    pub date: CivilDate,
    pub mode: Mode,
    /// Bypasses the configured class policy when set.
    pub class_override: Option<PrincipalClass>,
}

impl AvailabilityQuery {
    pub fn new(principal_id: impl Into<String>, date: CivilDate, mode: Mode) -> Self {
        Self {
            principal_id: principal_id.into(),
            date,
            mode,
            class_override: None,
        }
    }

    pub fn with_class(mut self, class: PrincipalClass) -> Self {
        self.class_override = Some(class);
        self
    }

    /// Build a query from the raw inbound strings.
    ///
    /// # Errors
    ///
    /// [`AvailabilityError::Validation`] for an empty principal id, a date not
    /// in `YYYY-MM-DD` form, or an unknown mode.
    pub fn parse(principal_id: &str, date: &str, mode: &str) -> Result<Self> {
        let query = Self::new(principal_id.trim(), date.parse()?, mode.parse()?);
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> Result<()> {
        if self.principal_id.trim().is_empty() {
            return Err(AvailabilityError::Validation(
                "principal id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// One free slot, in the shape returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    /// `YYYY-MM-DD_<start>_<end>`; the suffix matches the numeric window encoding.
    pub id: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&SlotCandidate> for AvailableSlot {
    fn from(candidate: &SlotCandidate) -> Self {
        Self {
            id: candidate.id.clone(),
            label: candidate.label.clone(),
            start: candidate.start,
            end: candidate.end,
        }
    }
}
