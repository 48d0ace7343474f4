//! The availability resolver.
//!
//! Answers "which slots are free for principal P on date D in mode M" by
//! reconciling the principal's external calendar with both local reservation
//! collections. Each call is an independent, idempotent read; the resolver
//! holds no mutable state and can serve any number of concurrent queries.
//!
//! # Check-then-book race
//!
//! Nothing here reserves anything. Two callers may both see a slot as free and
//! both go on to book it; a booking written between this read and the caller's
//! own write is invisible to the answer already returned. Guarding against
//! that belongs to the booking write path (idempotency keys or locking), not to
//! this resolver.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::candidates::{build_candidates, materialize, ClassPolicy, PrincipalClass};
use crate::civil::{CivilClock, CivilDate};
use crate::config::ResolverConfig;
use crate::conflict::{find_blocking, Blocking};
use crate::error::{AvailabilityError, ConfigError, GatewayError, Result};
use crate::freebusy::{
    filter_available, merge_busy_periods, BusyBlock, BusySource, ReservationInterval,
};
use crate::gateway::{normalize_calendar, CalendarGateway};
use crate::query::{AvailabilityQuery, AvailableSlot};
use crate::store::{
    normalize_records, DayWindow, PrincipalDirectory, ReservationStore, UnrecognizedWindow,
};

/// Everything the resolver learned while answering one query.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityReport {
    pub principal_id: String,
    pub date: CivilDate,
    pub class: PrincipalClass,
    /// Free slots in ascending start order.
    pub slots: Vec<AvailableSlot>,
    /// Every busy interval considered, from all sources.
    pub busy: Vec<ReservationInterval>,
    /// `busy` merged into disjoint blocks.
    pub busy_blocks: Vec<BusyBlock>,
    /// Each excluded candidate paired with every busy interval that overlaps it.
    pub blocking: Vec<Blocking>,
    /// Live reservations that contributed nothing because their window was unreadable.
    pub unrecognized: Vec<UnrecognizedWindow>,
}

pub struct AvailabilityResolver {
    calendar: Arc<dyn CalendarGateway>,
    store: Arc<dyn ReservationStore>,
    directory: Arc<dyn PrincipalDirectory>,
    policy: Arc<dyn ClassPolicy>,
    clock: CivilClock,
    gateway_timeout: Duration,
    request_timeout: Duration,
    max_busy_hours: u32,
}

impl AvailabilityResolver {
    /// Build a resolver from a validated configuration and its collaborators.
    pub fn new(
        config: &ResolverConfig,
        calendar: Arc<dyn CalendarGateway>,
        store: Arc<dyn ReservationStore>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            calendar,
            store,
            directory,
            policy: config.class_policy(),
            clock: config.clock()?,
            gateway_timeout: config.gateway_timeout(),
            request_timeout: config.request_timeout(),
            max_busy_hours: config.max_busy_hours,
        })
    }

    /// Replace the class policy chosen by the configuration.
    pub fn with_policy(mut self, policy: Arc<dyn ClassPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn clock(&self) -> &CivilClock {
        &self.clock
    }

    /// Free slots for `query`, in ascending start order.
    pub async fn resolve(&self, query: &AvailabilityQuery) -> Result<Vec<AvailableSlot>> {
        Ok(self.resolve_detailed(query).await?.slots)
    }

    /// Free slots for raw inbound strings (`"YYYY-MM-DD"`, `"physical"|"virtual"`).
    pub async fn resolve_request(
        &self,
        principal_id: &str,
        date: &str,
        mode: &str,
    ) -> Result<Vec<AvailableSlot>> {
        let query = AvailabilityQuery::parse(principal_id, date, mode)?;
        self.resolve(&query).await
    }

    /// Resolve and return the full report.
    pub async fn resolve_detailed(&self, query: &AvailabilityQuery) -> Result<AvailabilityReport> {
        self.resolve_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Resolve, aborting with [`AvailabilityError::Cancelled`] as soon as
    /// `cancel` fires. The whole call is bounded by the request timeout.
    #[instrument(
        skip_all,
        fields(principal = %query.principal_id, date = %query.date, mode = %query.mode)
    )]
    pub async fn resolve_with_cancel(
        &self,
        query: &AvailabilityQuery,
        cancel: &CancellationToken,
    ) -> Result<AvailabilityReport> {
        query.validate()?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("availability query cancelled");
                Err(AvailabilityError::Cancelled)
            }
            outcome = tokio::time::timeout(self.request_timeout, self.run(query)) => {
                outcome.map_err(|_| AvailabilityError::TimedOut(self.request_timeout))?
            }
        }
    }

    async fn run(&self, query: &AvailabilityQuery) -> Result<AvailabilityReport> {
        let day = DayWindow::new(query.date, &self.clock)?;

        let principal = self
            .directory
            .find_principal(&query.principal_id)
            .await?
            .ok_or_else(|| AvailabilityError::UnknownPrincipal(query.principal_id.clone()))?;

        let class = query
            .class_override
            .unwrap_or_else(|| self.policy.classify(&principal, query.mode));
        let candidates = materialize(&build_candidates(class, query.mode), query.date, &self.clock)?;

        let calendar = async {
            let periods = tokio::time::timeout(
                self.gateway_timeout,
                self.calendar
                    .busy_periods(&principal.calendar_identity, day.start, day.end),
            )
            .await
            .map_err(|_| GatewayError::TimedOut(self.gateway_timeout))??;
            Ok::<_, AvailabilityError>(periods)
        };
        let bookings = async {
            self.store
                .booking_reservations(&principal.id, day)
                .await
                .map_err(AvailabilityError::from)
        };
        let onboardings = async {
            self.store
                .onboarding_reservations(&principal.id, day)
                .await
                .map_err(AvailabilityError::from)
        };

        let (periods, bookings, onboardings) = tokio::try_join!(calendar, bookings, onboardings)?;

        let mut busy = normalize_calendar(&periods, query.date, &self.clock, self.max_busy_hours);
        let booked = normalize_records(&bookings, BusySource::BookingRecord, query.date, &self.clock)?;
        let onboarded = normalize_records(
            &onboardings,
            BusySource::OnboardingRecord,
            query.date,
            &self.clock,
        )?;

        debug!(
            calendar = busy.len(),
            bookings = booked.intervals.len(),
            onboardings = onboarded.intervals.len(),
            "collected busy intervals"
        );

        busy.extend(booked.intervals);
        busy.extend(onboarded.intervals);
        let mut unrecognized = booked.unrecognized;
        unrecognized.extend(onboarded.unrecognized);

        let slots: Vec<AvailableSlot> = filter_available(&candidates, &busy)
            .iter()
            .map(AvailableSlot::from)
            .collect();

        info!(
            %class,
            candidates = candidates.len(),
            available = slots.len(),
            unrecognized = unrecognized.len(),
            "resolved availability"
        );

        Ok(AvailabilityReport {
            principal_id: principal.id,
            date: query.date,
            class,
            slots,
            busy_blocks: merge_busy_periods(&busy),
            blocking: find_blocking(&candidates, &busy),
            busy,
            unrecognized,
        })
    }
}
