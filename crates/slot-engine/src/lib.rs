//! # slot-engine
//!
//! Availability resolution for onboarding slots.
//!
//! Given a principal (an onboarding specialist), a civil date and a meeting
//! mode, the engine reports which of the principal's templated slots are
//! actually free. Busy time comes from three independent sources: the
//! principal's external calendar and two local reservation collections that
//! encode reservations differently. All of it is normalized into absolute
//! instants over a fixed-offset civil clock and merged before filtering.
//!
//! ## Modules
//!
//! - [`civil`] — Fixed-offset civil date/time ⇄ instant conversion
//! - [`window`] — Decoding of stored slot-window strings (`"14_17"`, `"2 PM – 5 PM"`)
//! - [`candidates`] — Slot templates per principal class, and the class policy seam
//! - [`gateway`] — External calendar port and all-day/out-of-date noise filtering
//! - [`store`] — Reservation store and principal directory ports, record normalization
//! - [`freebusy`] — Busy intervals, interval merging, the overlap filter
//! - [`conflict`] — Which busy intervals block which candidates
//! - [`resolver`] — The orchestrating [`AvailabilityResolver`]
//! - [`memory`] — In-memory collaborators and the JSON snapshot format
//! - [`config`] — [`ResolverConfig`]
//! - [`error`] — Error types

pub mod candidates;
pub mod civil;
pub mod config;
pub mod conflict;
pub mod error;
pub mod freebusy;
pub mod gateway;
pub mod memory;
pub mod query;
pub mod resolver;
pub mod store;
pub mod window;

pub use candidates::{
    build_candidates, materialize, ClassPolicy, IdentityClassPolicy, ModeClassPolicy,
    PrincipalClass, SlotCandidate, SlotTemplate,
};
pub use civil::{CivilClock, CivilDate, CivilDateTime, ZoneOffset};
pub use config::{ClassPolicyKind, ResolverConfig};
pub use conflict::{find_blocking, Blocking};
pub use error::{AvailabilityError, ConfigError, GatewayError, StoreError};
pub use freebusy::{
    filter_available, merge_busy_periods, overlaps, BusyBlock, BusySource, ReservationInterval,
};
pub use gateway::{normalize_calendar, BusyPeriod, CalendarGateway};
pub use query::{AvailabilityQuery, AvailableSlot, Mode, Principal};
pub use resolver::{AvailabilityReport, AvailabilityResolver};
pub use store::{
    normalize_records, DayWindow, PrincipalDirectory, ReservationStore, StoredReservation,
    UnrecognizedWindow,
};
pub use window::{decode, SlotWindow};
