//! Candidate slot templates and the policy that picks them.
//!
//! Principals fall into two classes. Long-session principals are offered
//! 10–13, 14–17 and 18–19; everyone else is offered 10–12, 12–14, 15–17 and
//! 18–19. Which class applies is decided by a [`ClassPolicy`]; the default
//! [`IdentityClassPolicy`] partitions by principal identity and ignores the
//! requested mode.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::civil::{CivilClock, CivilDate};
use crate::error::{AvailabilityError, Result};
use crate::query::{Mode, Principal};
use crate::window::format_label;

const LONG_SESSION_HOURS: &[(u32, u32)] = &[(10, 13), (14, 17), (18, 19)];
const SHORT_SESSION_HOURS: &[(u32, u32)] = &[(10, 12), (12, 14), (15, 17), (18, 19)];

/// Which family of slot templates a principal is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrincipalClass {
    LongSession,
    ShortSession,
}

impl FromStr for PrincipalClass {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long-session" | "long" => Ok(PrincipalClass::LongSession),
            "short-session" | "short" => Ok(PrincipalClass::ShortSession),
            _ => Err(AvailabilityError::Validation(format!(
                "principal class '{s}' must be 'long-session' or 'short-session'"
            ))),
        }
    }
}

impl fmt::Display for PrincipalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrincipalClass::LongSession => "long-session",
            PrincipalClass::ShortSession => "short-session",
        })
    }
}

/// A window template, not yet tied to a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTemplate {
    pub label: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

/// A template materialized onto a concrete date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotCandidate {
    pub id: String,
    pub label: String,
    pub start_hour: u32,
    pub end_hour: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Decides the template class for a principal.
///
/// This is the seam for the mode-versus-identity question: swapping the policy
/// changes which templates are built without touching the overlap filter.
pub trait ClassPolicy: Send + Sync {
    fn classify(&self, principal: &Principal, mode: Mode) -> PrincipalClass;
}

/// Long-session membership by principal id or calendar identity.
#[derive(Debug, Clone, Default)]
pub struct IdentityClassPolicy {
    long_session: HashSet<String>,
}

impl IdentityClassPolicy {
    /// Identities are matched case-insensitively.
    pub fn new<I, S>(long_session: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            long_session: long_session
                .into_iter()
                .map(|s| s.as_ref().trim().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl ClassPolicy for IdentityClassPolicy {
    fn classify(&self, principal: &Principal, _mode: Mode) -> PrincipalClass {
        let id = principal.id.to_ascii_lowercase();
        let identity = principal.calendar_identity.to_ascii_lowercase();
        if self.long_session.contains(&id) || self.long_session.contains(&identity) {
            PrincipalClass::LongSession
        } else {
            PrincipalClass::ShortSession
        }
    }
}

/// Physical meetings get long sessions, virtual meetings get short ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeClassPolicy;

impl ClassPolicy for ModeClassPolicy {
    fn classify(&self, _principal: &Principal, mode: Mode) -> PrincipalClass {
        match mode {
            Mode::Physical => PrincipalClass::LongSession,
            Mode::Virtual => PrincipalClass::ShortSession,
        }
    }
}

/// Ordered templates for `class`.
///
/// `mode` does not change the result; it is accepted so callers can pass the
/// full query context.
pub fn build_candidates(class: PrincipalClass, _mode: Mode) -> Vec<SlotTemplate> {
    let hours = match class {
        PrincipalClass::LongSession => LONG_SESSION_HOURS,
        PrincipalClass::ShortSession => SHORT_SESSION_HOURS,
    };

    hours
        .iter()
        .map(|&(start_hour, end_hour)| SlotTemplate {
            label: format_label(start_hour, end_hour),
            start_hour,
            end_hour,
        })
        .collect()
}

/// Pin templates to `date`, converting local hours to instants via `clock`.
pub fn materialize(
    templates: &[SlotTemplate],
    date: CivilDate,
    clock: &CivilClock,
) -> Result<Vec<SlotCandidate>> {
    templates
        .iter()
        .map(|t| {
            Ok(SlotCandidate {
                id: format!("{}_{}_{}", date, t.start_hour, t.end_hour),
                label: t.label.clone(),
                start_hour: t.start_hour,
                end_hour: t.end_hour,
                start: clock.to_instant(date, t.start_hour, 0)?,
                end: clock.to_instant(date, t.end_hour, 0)?,
            })
        })
        .collect()
}
