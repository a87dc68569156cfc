//! Refresh flow integration tests
//!
//! These tests drive the coordinator and the session through a scripted
//! transport with per-request delays, on a paused tokio clock:
//! - Latest request wins when responses arrive out of order
//! - Identical in-flight requests are not repeated
//! - Returning to the displayed pair overtakes a pending request
//! - A dropped refresh does not block later ones
//! - Full load, locate, save and date rollover flows

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mawaqit::core::{
    ClientConfig, FixedClock, FixedPosition, GeoPosition, HttpResponse, MawaqitError,
    MawaqitSession, MemorySurface, NoPosition, PositionProvider, Prayer, PrayerClient,
    PrayerLabels, Presenter, QueryParams, RefreshCoordinator, RefreshOutcome, Region,
    Resolution, Result, SavedRegion, ScheduleDate, SessionParts, Transport,
};
use tempfile::TempDir;

type Script = dyn Fn(&str, &[(String, String)]) -> (Duration, Result<HttpResponse>) + Send + Sync;

/// Transport answering from a script, after a scripted delay
struct ScriptedTransport {
    script: Box<Script>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl ScriptedTransport {
    fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(&str, &[(String, String)]) -> (Duration, Result<HttpResponse>) + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests_to(&self, fragment: &str) -> Vec<Vec<(String, String)>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.contains(fragment))
            .map(|(_, query)| query.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((url.to_string(), query.to_vec()));
        let (delay, response) = (self.script)(url, query);
        tokio::time::sleep(delay).await;
        response
    }
}

fn param<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn is_next(query: &[(String, String)]) -> bool {
    param(query, "salawat") == Some("next")
}

/// English-labelled schedule whose fajr time encodes the day of month
fn english_schedule(date: &str) -> String {
    let day = &date[8..10];
    format!(
        r#"[{{"date": "{date}", "wilaya": "Algiers", "fajr": "05:{day}", "chorok": "06:30", "dhohr": "12:45", "asr": "15:50", "maghrib": "18:20", "icha": "19:40"}}]"#
    )
}

const ENGLISH_NEXT: &str = r#"[{"date": "2024-03-01", "wilaya": "Algiers", "asr": "15:50"}]"#;

fn coordinator(transport: Arc<ScriptedTransport>) -> (Arc<MemorySurface>, RefreshCoordinator) {
    let surface = Arc::new(MemorySurface::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 13, 35, 0).unwrap()));
    let client = PrayerClient::new(transport, "http://test/api/v1/mawaqit", PrayerLabels::english());
    let presenter = Presenter::new(surface.clone(), clock, 0);
    (surface, RefreshCoordinator::new(client, presenter))
}

fn params(region: &str, date: &str) -> QueryParams {
    QueryParams::new(Region::new(region), ScheduleDate::parse(date).unwrap())
}

/// Schedules for `slow_day` answer slowly, every other day quickly
fn skewed_script(slow_day: &'static str) -> Arc<ScriptedTransport> {
    ScriptedTransport::new(move |_, query| {
        if is_next(query) {
            return (Duration::from_millis(10), Ok(HttpResponse::ok(ENGLISH_NEXT)));
        }
        let date = param(query, "days").unwrap_or_default().to_string();
        let delay = if date.ends_with(slow_day) { 500 } else { 50 };
        (Duration::from_millis(delay), Ok(HttpResponse::ok(english_schedule(&date))))
    })
}

#[tokio::test(start_paused = true)]
async fn test_later_request_wins_when_it_answers_first() {
    let transport = skewed_script("01");
    let (surface, coordinator) = coordinator(transport.clone());

    let (first, second) = tokio::join!(
        coordinator.refresh(params("Algiers", "2024-03-01")),
        coordinator.refresh(params("Algiers", "2024-03-02")),
    );

    assert_eq!(first.unwrap(), RefreshOutcome::Superseded);
    assert_eq!(second.unwrap(), RefreshOutcome::Applied);
    assert_eq!(surface.text("fajr").as_deref(), Some("05:02"));
    assert_eq!(coordinator.last_applied(), Some(params("Algiers", "2024-03-02")));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_never_overwrites_newer_state() {
    let transport = skewed_script("02");
    let (surface, coordinator) = coordinator(transport);

    let (first, second) = tokio::join!(
        coordinator.refresh(params("Algiers", "2024-03-01")),
        coordinator.refresh(params("Algiers", "2024-03-02")),
    );

    // Day 01 arrives first but a newer request has already started
    assert_eq!(first.unwrap(), RefreshOutcome::Superseded);
    assert_eq!(second.unwrap(), RefreshOutcome::Applied);
    assert_eq!(surface.text("fajr").as_deref(), Some("05:02"));
    assert_eq!(surface.write_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_identical_request_in_flight_is_not_repeated() {
    let transport = skewed_script("01");
    let (_, coordinator) = coordinator(transport.clone());
    let p = params("Algiers", "2024-03-01");

    let (first, second) = tokio::join!(coordinator.refresh(p.clone()), coordinator.refresh(p.clone()));

    assert_eq!(first.unwrap(), RefreshOutcome::Applied);
    assert_eq!(second.unwrap(), RefreshOutcome::Pending);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_switching_back_to_displayed_pair_drops_pending_request() {
    let transport = skewed_script("02");
    let (surface, coordinator) = coordinator(transport.clone());
    let shown = params("Algiers", "2024-03-01");

    assert_eq!(coordinator.refresh(shown.clone()).await.unwrap(), RefreshOutcome::Applied);

    let (away, back) = tokio::join!(coordinator.refresh(params("Algiers", "2024-03-02")), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        coordinator.refresh(shown.clone()).await
    });

    assert_eq!(away.unwrap(), RefreshOutcome::Superseded);
    assert_eq!(back.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(surface.text("fajr").as_deref(), Some("05:01"));
    assert_eq!(surface.write_count(), 6);
    assert_eq!(coordinator.last_applied(), Some(shown));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_refresh_does_not_block_the_same_pair() {
    let transport = skewed_script("02");
    let (surface, coordinator) = coordinator(transport.clone());
    let slow = params("Algiers", "2024-03-02");

    let abandoned = tokio::time::timeout(Duration::from_millis(100), coordinator.refresh(slow.clone())).await;
    assert!(abandoned.is_err());

    assert_eq!(coordinator.refresh(slow.clone()).await.unwrap(), RefreshOutcome::Applied);
    assert_eq!(surface.text("fajr").as_deref(), Some("05:02"));
    assert_eq!(coordinator.last_applied(), Some(slow));
    assert_eq!(transport.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_can_be_retried() {
    let failures = Arc::new(AtomicUsize::new(1));
    let remaining = failures.clone();
    let transport = ScriptedTransport::new(move |_, query| {
        if is_next(query) {
            return (Duration::ZERO, Ok(HttpResponse::ok(ENGLISH_NEXT)));
        }
        if remaining.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok() {
            return (Duration::ZERO, Err(MawaqitError::network("connection refused")));
        }
        (Duration::ZERO, Ok(HttpResponse::ok(english_schedule("2024-03-01"))))
    });
    let (surface, coordinator) = coordinator(transport);
    let p = params("Algiers", "2024-03-01");

    assert!(coordinator.refresh(p.clone()).await.is_err());
    assert_eq!(surface.write_count(), 0);
    assert_eq!(coordinator.refresh(p).await.unwrap(), RefreshOutcome::Applied);
    assert_eq!(surface.text("asr").as_deref(), Some("15:50 (2h15m)"));
}

// Session flows, against the default (Arabic) wire labels

const ARABIC_SCHEDULE: &str = r#"[{"التاريخ": "2024-03-01", "الولاية": "الجزائر", "الفجر": "05:12", "الشروق": "06:30", "الظهر": "12:45", "العصر": "15:50", "المغرب": "18:20", "العشاء": "19:40"}]"#;
const ARABIC_SCHEDULE_NEXT_DAY: &str = r#"[{"التاريخ": "2024-03-02", "الولاية": "الجزائر", "الفجر": "05:11", "الشروق": "06:29", "الظهر": "12:45", "العصر": "15:51", "المغرب": "18:21", "العشاء": "19:41"}]"#;
const ARABIC_NEXT: &str = r#"[{"التاريخ": "2024-03-01", "الولاية": "الجزائر", "العصر": "15:50"}]"#;
const GEOCODE: &str = r#"{"address": {"state": "ولاية الجزائر", "country": "الجزائر"}}"#;

fn server() -> Arc<ScriptedTransport> {
    ScriptedTransport::new(|url, query| {
        let body = if url.contains("reverse") {
            GEOCODE
        } else if url.ends_with("/save") {
            ""
        } else if is_next(query) {
            ARABIC_NEXT
        } else if param(query, "days") == Some("2024-03-02") {
            ARABIC_SCHEDULE_NEXT_DAY
        } else {
            ARABIC_SCHEDULE
        };
        (Duration::from_millis(20), Ok(HttpResponse::ok(body)))
    })
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    surface: Arc<MemorySurface>,
    clock: Arc<FixedClock>,
    session: MawaqitSession,
}

fn harness(positions: Arc<dyn PositionProvider>) -> Harness {
    let transport = server();
    let surface = Arc::new(MemorySurface::new());
    // 12:35 UTC is 13:35 in Algiers
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 35, 0).unwrap()));
    let config = ClientConfig::default();
    let parts = SessionParts {
        transport: transport.clone(),
        surface: surface.clone(),
        positions,
        clock: clock.clone(),
    };
    let session = MawaqitSession::new(&config, parts, config.default_region.clone());
    Harness {
        transport,
        surface,
        clock,
        session,
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_load_shows_algiers_schedule() {
    let h = harness(Arc::new(NoPosition));

    assert_eq!(h.session.load().await.unwrap(), RefreshOutcome::Applied);

    let expected = [
        (Prayer::Fajr, "05:12"),
        (Prayer::Chorok, "06:30"),
        (Prayer::Dhohr, "12:45"),
        (Prayer::Asr, "15:50 (2h15m)"),
        (Prayer::Maghrib, "18:20"),
        (Prayer::Icha, "19:40"),
    ];
    for (prayer, text) in expected {
        assert_eq!(h.surface.text(prayer.id()).as_deref(), Some(text), "{prayer}");
    }

    let schedule_requests = h.transport.requests_to("/api/v1/mawaqit");
    assert_eq!(schedule_requests.len(), 2);
    assert!(schedule_requests
        .iter()
        .any(|q| param(q, "days") == Some("2024-03-01") && param(q, "wilayas") == Some("الجزائر")));
}

#[tokio::test(start_paused = true)]
async fn test_reload_with_same_selection_stays_off_the_network() {
    let h = harness(Arc::new(NoPosition));

    h.session.load().await.unwrap();
    assert_eq!(h.session.load().await.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(
        h.session.select_region(Region::new("الجزائر")).await.unwrap(),
        RefreshOutcome::Unchanged
    );
    assert_eq!(h.transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_locate_selects_geocoded_region_once() {
    let h = harness(Arc::new(FixedPosition(GeoPosition::new(36.75, 3.06))));

    let resolution = h.session.locate().await.unwrap();
    assert_eq!(resolution, Resolution::Resolved(Region::new("ولاية الجزائر")));
    assert_eq!(h.session.selection().region, Region::new("ولاية الجزائر"));

    let geocode = h.transport.requests_to("reverse");
    assert_eq!(geocode.len(), 1);
    assert_eq!(param(&geocode[0], "accept-language"), Some("ar"));

    // Same region again: no second geocode and no refetch
    let calls = h.transport.calls();
    assert_eq!(h.session.locate().await.unwrap(), Resolution::Skipped);
    assert_eq!(h.transport.calls(), calls);
}

#[tokio::test(start_paused = true)]
async fn test_locate_after_manual_change_resolves_again() {
    let h = harness(Arc::new(FixedPosition(GeoPosition::new(36.75, 3.06))));

    h.session.locate().await.unwrap();
    h.session.select_region(Region::new("وهران")).await.unwrap();

    let resolution = h.session.locate().await.unwrap();
    assert_eq!(resolution, Resolution::Resolved(Region::new("ولاية الجزائر")));
    assert_eq!(h.transport.requests_to("reverse").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_save_posts_region_and_remembers_it() {
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("state.json");

    let h = harness(Arc::new(NoPosition));
    let session = h.session.with_state_file(state.clone());

    let ack = session.save().await.unwrap();
    assert_eq!(ack.region, Region::new("الجزائر"));
    assert_eq!(h.surface.notifications(), vec!["Saved الجزائر"]);

    let saves = h.transport.requests_to("/save");
    assert_eq!(saves.len(), 1);
    assert_eq!(param(&saves[0], "wilaya"), Some("الجزائر"));

    let remembered = SavedRegion::load_from_file(&state).unwrap();
    assert_eq!(remembered.region, Region::new("الجزائر"));
    assert_eq!(
        MawaqitSession::initial_region(&ClientConfig::default(), Some(&state)),
        Region::new("الجزائر")
    );
}

#[tokio::test(start_paused = true)]
async fn test_tick_redraws_then_follows_date_rollover() {
    let h = harness(Arc::new(NoPosition));
    h.session.load().await.unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2024, 3, 1, 13, 5, 0).unwrap());
    assert_eq!(h.session.tick().await.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(h.surface.text("asr").as_deref(), Some("15:50 (1h45m)"));
    assert_eq!(h.transport.calls(), 2);

    h.clock.set(Utc.with_ymd_and_hms(2024, 3, 2, 0, 5, 0).unwrap());
    assert_eq!(h.session.tick().await.unwrap(), RefreshOutcome::Applied);
    assert_eq!(h.session.selection().date, ScheduleDate::parse("2024-03-02").unwrap());
    assert_eq!(h.surface.text("fajr").as_deref(), Some("05:11"));
}

#[tokio::test(start_paused = true)]
async fn test_tick_leaves_a_chosen_past_date_alone() {
    let h = harness(Arc::new(NoPosition));
    let chosen = ScheduleDate::parse("2024-02-20").unwrap();
    h.session.select_date(chosen).await.unwrap();

    h.clock.set(Utc.with_ymd_and_hms(2024, 3, 2, 0, 5, 0).unwrap());
    assert_eq!(h.session.tick().await.unwrap(), RefreshOutcome::Unchanged);
    assert_eq!(h.session.selection().date, chosen);
}

#[tokio::test(start_paused = true)]
async fn test_locate_without_position_is_reported() {
    let h = harness(Arc::new(NoPosition));
    h.session.load().await.unwrap();

    let err = h.session.locate().await.unwrap_err();
    assert!(matches!(err.root(), MawaqitError::NotAvailable { .. }));
    assert_eq!(h.session.selection().region, Region::new("الجزائر"));
    assert!(h.transport.requests_to("reverse").is_empty());
}
