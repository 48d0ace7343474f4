//! End-to-end tests for the availability resolver over in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use slot_engine::memory::{InMemoryCalendar, InMemoryReservations, SnapshotRecord, StaticDirectory};
use slot_engine::{
    AvailabilityError, AvailabilityQuery, AvailabilityResolver, CivilDate, ClassPolicyKind,
    GatewayError, Mode, ModeClassPolicy, Principal, PrincipalClass, ResolverConfig, StoreError,
    StoredReservation,
};
use tokio_util::sync::CancellationToken;

// ── Helpers ─────────────────────────────────────────────────────────────────

const LONG: &str = "asha";
const LONG_CAL: &str = "asha@example.com";
const SHORT: &str = "meera";
const SHORT_CAL: &str = "meera@example.com";

struct Fixture {
    calendar: Arc<InMemoryCalendar>,
    store: Arc<InMemoryReservations>,
    resolver: AvailabilityResolver,
}

fn fixture_with(config: ResolverConfig) -> Fixture {
    let calendar = Arc::new(InMemoryCalendar::new());
    let store = Arc::new(InMemoryReservations::new());
    let directory = Arc::new(StaticDirectory::new([
        Principal {
            id: LONG.to_string(),
            calendar_identity: LONG_CAL.to_string(),
        },
        Principal {
            id: SHORT.to_string(),
            calendar_identity: SHORT_CAL.to_string(),
        },
    ]));
    let resolver =
        AvailabilityResolver::new(&config, calendar.clone(), store.clone(), directory).unwrap();
    Fixture {
        calendar,
        store,
        resolver,
    }
}

fn fixture() -> Fixture {
    fixture_with(ResolverConfig {
        long_session_principals: vec![LONG.to_string()],
        ..ResolverConfig::default()
    })
}

fn march_10() -> CivilDate {
    CivilDate::new(2025, 3, 10).unwrap()
}

/// Instant for an IST wall-clock time on 2025-03-10.
fn ist(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap() - chrono::Duration::minutes(330)
}

fn query(principal: &str) -> AvailabilityQuery {
    AvailabilityQuery::new(principal, march_10(), Mode::Physical)
}

fn labels(slots: &[slot_engine::AvailableSlot]) -> Vec<&str> {
    slots.iter().map(|s| s.label.as_str()).collect()
}

fn onboarding(principal: &str, id: &str, status: &str, raw: &str) -> SnapshotRecord {
    SnapshotRecord {
        principal_id: principal.to_string(),
        date: Some(march_10()),
        reservation: StoredReservation {
            id: id.to_string(),
            status: status.to_string(),
            start: None,
            end: None,
            raw_slot_window: Some(raw.to_string()),
        },
    }
}

fn booking(
    principal: &str,
    id: &str,
    status: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> SnapshotRecord {
    SnapshotRecord {
        principal_id: principal.to_string(),
        date: None,
        reservation: StoredReservation {
            id: id.to_string(),
            status: status.to_string(),
            start: Some(start),
            end: Some(end),
            raw_slot_window: None,
        },
    }
}

// ── Concrete scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn long_session_calendar_busy_removes_morning_slot() {
    let f = fixture();
    f.calendar.insert(LONG_CAL, ist(10, 0), ist(11, 0));

    let slots = f.resolver.resolve(&query(LONG)).await.unwrap();

    assert_eq!(labels(&slots), vec!["2 PM \u{2013} 5 PM", "6 PM \u{2013} 7 PM"]);
    assert_eq!(slots[0].start, ist(14, 0));
    assert_eq!(slots[0].end, ist(17, 0));
    assert_eq!(slots[1].start, ist(18, 0));
    assert_eq!(slots[1].end, ist(19, 0));
}

#[tokio::test]
async fn detailed_report_explains_blocked_slots() {
    let f = fixture();
    f.calendar.insert(LONG_CAL, ist(10, 0), ist(11, 0));
    f.store
        .add_booking(booking(LONG, "b-1", "Confirmed", ist(16, 0), ist(18, 30)));

    let report = f.resolver.resolve_detailed(&query(LONG)).await.unwrap();

    assert!(report.slots.is_empty());
    let blocked: Vec<(&str, i64)> = report
        .blocking
        .iter()
        .map(|b| (b.candidate.id.as_str(), b.overlap_minutes))
        .collect();
    assert_eq!(
        blocked,
        vec![
            ("2025-03-10_10_13", 60),
            ("2025-03-10_14_17", 60),
            ("2025-03-10_18_19", 30),
        ]
    );
    assert_eq!(report.blocking[1].busy.record_id, "b-1");
    assert_eq!(report.blocking[2].busy.record_id, "b-1");
}

#[tokio::test]
async fn garbled_window_is_skipped_while_sibling_blocks() {
    let f = fixture();
    f.store.add_onboarding(onboarding(SHORT, "o-bad", "booked", "garbled"));
    f.store.add_onboarding(onboarding(SHORT, "o-good", "booked", "10_12"));

    let report = f.resolver.resolve_detailed(&query(SHORT)).await.unwrap();

    assert_eq!(report.class, PrincipalClass::ShortSession);
    assert_eq!(
        labels(&report.slots),
        vec![
            "12 PM \u{2013} 2 PM",
            "3 PM \u{2013} 5 PM",
            "6 PM \u{2013} 7 PM"
        ]
    );
    assert_eq!(report.busy.len(), 1);
    assert_eq!(report.busy[0].record_id, "o-good");
    assert_eq!(report.unrecognized.len(), 1);
    assert_eq!(report.unrecognized[0].raw.as_deref(), Some("garbled"));
}

// ── Properties ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelling_a_reservation_frees_its_slot() {
    let f = fixture();
    f.calendar.insert(LONG_CAL, ist(10, 0), ist(11, 0));
    f.store
        .add_booking(booking(LONG, "b-1", "Confirmed", ist(14, 0), ist(17, 0)));

    let before = f.resolver.resolve(&query(LONG)).await.unwrap();
    assert_eq!(labels(&before), vec!["6 PM \u{2013} 7 PM"]);

    assert_eq!(f.store.set_status("b-1", "CANCELLED"), 1);
    let after = f.resolver.resolve(&query(LONG)).await.unwrap();

    for slot in &before {
        assert!(after.contains(slot), "{} disappeared", slot.label);
    }
    assert_eq!(labels(&after), vec!["2 PM \u{2013} 5 PM", "6 PM \u{2013} 7 PM"]);
}

#[tokio::test]
async fn all_day_calendar_entries_never_reduce_availability() {
    let f = fixture();
    let baseline = f.resolver.resolve(&query(SHORT)).await.unwrap();

    // Local 00:00-23:59 and a 13-hour block.
    f.calendar.insert(SHORT_CAL, ist(0, 0), ist(23, 59));
    f.calendar.insert(SHORT_CAL, ist(9, 0), ist(22, 0));
    let with_noise = f.resolver.resolve(&query(SHORT)).await.unwrap();

    assert_eq!(baseline, with_noise);
    assert_eq!(with_noise.len(), 4);
}

#[tokio::test]
async fn touching_reservation_does_not_block() {
    let f = fixture();
    f.store
        .add_booking(booking(SHORT, "b-edge", "confirmed", ist(9, 0), ist(10, 0)));
    f.calendar.insert(SHORT_CAL, ist(17, 0), ist(18, 0));

    let slots = f.resolver.resolve(&query(SHORT)).await.unwrap();

    assert_eq!(slots.len(), 4);
}

#[tokio::test]
async fn busy_sources_are_unioned() {
    let f = fixture();
    f.calendar.insert(SHORT_CAL, ist(10, 30), ist(11, 0));
    f.store
        .add_booking(booking(SHORT, "b-1", "confirmed", ist(12, 0), ist(13, 0)));
    f.store
        .add_onboarding(onboarding(SHORT, "o-1", "booked", "3 PM - 5 PM"));

    let report = f.resolver.resolve_detailed(&query(SHORT)).await.unwrap();

    assert_eq!(labels(&report.slots), vec!["6 PM \u{2013} 7 PM"]);
    assert_eq!(report.busy.len(), 3);
    assert_eq!(report.busy_blocks.len(), 3);
}

#[tokio::test]
async fn other_principals_reservations_are_ignored() {
    let f = fixture();
    f.store
        .add_onboarding(onboarding(LONG, "o-1", "booked", "10_12"));

    let slots = f.resolver.resolve(&query(SHORT)).await.unwrap();

    assert_eq!(slots.len(), 4);
}

#[tokio::test]
async fn resolution_is_idempotent() {
    let f = fixture();
    f.calendar.insert(LONG_CAL, ist(18, 30), ist(18, 45));

    let first = f.resolver.resolve(&query(LONG)).await.unwrap();
    let second = f.resolver.resolve(&query(LONG)).await.unwrap();

    assert_eq!(first, second);
}

// ── Class selection ─────────────────────────────────────────────────────────

#[tokio::test]
async fn explicit_class_override_wins() {
    let f = fixture();
    let q = query(SHORT).with_class(PrincipalClass::LongSession);

    let report = f.resolver.resolve_detailed(&q).await.unwrap();

    assert_eq!(report.class, PrincipalClass::LongSession);
    assert_eq!(report.slots.len(), 3);
}

#[tokio::test]
async fn mode_policy_from_config() {
    let f = fixture_with(ResolverConfig {
        class_policy: ClassPolicyKind::Mode,
        ..ResolverConfig::default()
    });

    let physical = f.resolver.resolve(&query(SHORT)).await.unwrap();
    let virtual_q = AvailabilityQuery::new(SHORT, march_10(), Mode::Virtual);
    let virtual_slots = f.resolver.resolve(&virtual_q).await.unwrap();

    assert_eq!(physical.len(), 3);
    assert_eq!(virtual_slots.len(), 4);
}

#[tokio::test]
async fn policy_can_be_swapped_after_construction() {
    let f = fixture();
    let resolver = f.resolver.with_policy(Arc::new(ModeClassPolicy));

    let virtual_q = AvailabilityQuery::new(LONG, march_10(), Mode::Virtual);
    let slots = resolver.resolve(&virtual_q).await.unwrap();

    assert_eq!(slots.len(), 4);
}

// ── Inbound string interface ────────────────────────────────────────────────

#[tokio::test]
async fn resolve_request_returns_ids_and_rfc3339_instants() {
    let f = fixture();

    let slots = f
        .resolver
        .resolve_request(LONG, "2025-03-10", "physical")
        .await
        .unwrap();

    assert_eq!(slots[1].id, "2025-03-10_14_17");
    let json = serde_json::to_value(&slots[1]).unwrap();
    assert_eq!(json["start"], "2025-03-10T08:30:00Z");
    assert_eq!(json["end"], "2025-03-10T11:30:00Z");
    assert_eq!(json["label"], "2 PM \u{2013} 5 PM");
}

#[tokio::test]
async fn malformed_date_fails_without_external_calls() {
    let f = fixture();

    let err = f
        .resolver
        .resolve_request(LONG, "10-03-2025", "physical")
        .await
        .unwrap_err();

    assert!(matches!(err, AvailabilityError::Validation(_)));
    assert_eq!(f.calendar.calls(), 0);
}

#[tokio::test]
async fn unknown_mode_fails_without_external_calls() {
    let f = fixture();

    let err = f
        .resolver
        .resolve_request(LONG, "2025-03-10", "hybrid")
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.calendar.calls(), 0);
}

#[tokio::test]
async fn empty_principal_is_rejected() {
    let f = fixture();

    let err = f
        .resolver
        .resolve_request("  ", "2025-03-10", "virtual")
        .await
        .unwrap_err();

    assert!(matches!(err, AvailabilityError::Validation(_)));
}

#[tokio::test]
async fn unknown_principal_is_rejected_before_calendar() {
    let f = fixture();

    let err = f.resolver.resolve(&query("nobody")).await.unwrap_err();

    assert!(matches!(err, AvailabilityError::UnknownPrincipal(ref id) if id == "nobody"));
    assert_eq!(f.calendar.calls(), 0);
}

// ── Upstream failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn calendar_failure_fails_the_query() {
    let f = fixture();
    f.calendar
        .set_failure(Some(GatewayError::Unauthorized("token expired".to_string())));

    let err = f.resolver.resolve(&query(LONG)).await.unwrap_err();

    assert!(matches!(
        err,
        AvailabilityError::Gateway(GatewayError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn rate_limit_is_not_reported_as_free() {
    let f = fixture();
    f.calendar.set_failure(Some(GatewayError::RateLimited {
        retry_after_secs: Some(30),
    }));

    let result = f.resolver.resolve(&query(LONG)).await;

    assert!(matches!(
        result,
        Err(AvailabilityError::Gateway(GatewayError::RateLimited { .. }))
    ));
}

#[tokio::test]
async fn store_failure_fails_the_query() {
    let f = fixture();
    f.store
        .set_failure(Some(StoreError::Unavailable("connection refused".to_string())));

    let err = f.resolver.resolve(&query(LONG)).await.unwrap_err();

    assert!(matches!(err, AvailabilityError::Store(StoreError::Unavailable(_))));
}

#[tokio::test(start_paused = true)]
async fn slow_calendar_times_out_as_gateway_failure() {
    let f = fixture_with(ResolverConfig {
        gateway_timeout_ms: 1_000,
        request_timeout_ms: 5_000,
        ..ResolverConfig::default()
    });
    f.calendar.set_latency(Some(Duration::from_secs(3)));

    let err = f.resolver.resolve(&query(SHORT)).await.unwrap_err();

    assert!(matches!(
        err,
        AvailabilityError::Gateway(GatewayError::TimedOut(d)) if d == Duration::from_secs(1)
    ));
}

#[tokio::test(start_paused = true)]
async fn cancellation_aborts_in_flight_query() {
    let f = fixture();
    f.calendar.set_latency(Some(Duration::from_secs(3)));
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let err = f
        .resolver
        .resolve_with_cancel(&query(SHORT), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, AvailabilityError::Cancelled));
}

#[tokio::test]
async fn pre_cancelled_token_makes_no_calls() {
    let f = fixture();
    let token = CancellationToken::new();
    token.cancel();

    let err = f
        .resolver
        .resolve_with_cancel(&query(SHORT), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, AvailabilityError::Cancelled));
    assert_eq!(f.calendar.calls(), 0);
}

// ── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_queries_do_not_interfere() {
    let f = fixture();
    f.calendar.insert(LONG_CAL, ist(10, 0), ist(11, 0));

    let q_long = query(LONG);
    let q_short = query(SHORT);
    let (a, b, c) = tokio::join!(
        f.resolver.resolve(&q_long),
        f.resolver.resolve(&q_short),
        f.resolver.resolve(&q_long),
    );

    assert_eq!(a.unwrap().len(), 2);
    assert_eq!(b.unwrap().len(), 4);
    assert_eq!(c.unwrap().len(), 2);
}

/// The resolver takes no lock between checking and booking: two callers can
/// both be told a slot is free, and only a later check sees the booking.
#[tokio::test]
async fn check_then_book_race_is_observable() {
    let f = fixture();
    let q = query(LONG);

    let (first, second) = tokio::join!(f.resolver.resolve(&q), f.resolver.resolve(&q));
    let first = first.unwrap();
    let second = second.unwrap();
    assert!(first.iter().any(|s| s.id == "2025-03-10_14_17"));
    assert!(second.iter().any(|s| s.id == "2025-03-10_14_17"));

    // Both callers now book the same slot; nothing here prevents it.
    f.store.add_onboarding(onboarding(LONG, "o-a", "booked", "14_17"));
    f.store.add_onboarding(onboarding(LONG, "o-b", "booked", "14_17"));

    let later = f.resolver.resolve_detailed(&q).await.unwrap();
    assert!(!later.slots.iter().any(|s| s.id == "2025-03-10_14_17"));
    assert_eq!(later.busy.len(), 2);
}
