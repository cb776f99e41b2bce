//! The parking session state machine.
//!
//! `ParkingMachine` is the single owner of the running session. Every method
//! takes the current wall-clock instant explicitly; the periodic tick is
//! driven from outside through [`ParkingMachine::on_tick`].

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Duration, Utc};
use log::{error, info, warn};
use serde::Serialize;

use crate::active::ActiveSessionStore;
use crate::history::HistoryStore;
use crate::models::{ActiveDetails, ActiveSession, LocationSnapshot, ParkingSession, ParkingState, TimeStatus};
use crate::notifications::NotificationScheduler;
use crate::platform::{LiveActivity, LocationProvider};
use crate::settings::{AppSettings, SettingsStore};

/// Collaborators the machine drives. Built once by the host.
#[derive(Clone)]
pub struct ParkingDeps {
    pub settings: Arc<SettingsStore>,
    pub history: HistoryStore,
    pub active: ActiveSessionStore,
    pub scheduler: Arc<NotificationScheduler>,
    pub location: Arc<dyn LocationProvider>,
    pub live_activity: Option<Arc<dyn LiveActivity>>,
}

#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub duration: Option<Duration>,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: Option<LocationSnapshot>,
    pub details: ActiveDetails,
}

impl StartRequest {
    pub fn for_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    fn restore(session: ActiveSession) -> Self {
        Self {
            duration: None,
            started_at: Some(session.started_at),
            ends_at: Some(session.ends_at),
            location: session.location,
            details: session.details,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    Manual,
    Expired,
    /// The stored session had already run out when the process came back.
    Recovered,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Idle,
    Running { remaining_ms: i64 },
    Expired(ParkingSession),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    NothingStored,
    Resumed(ParkingState),
    Finalized(ParkingSession),
}

pub struct ParkingMachine {
    deps: ParkingDeps,
    settings: AppSettings,
    session: Option<ActiveSession>,
}

impl ParkingMachine {
    pub fn new(deps: ParkingDeps) -> Self {
        let settings = deps.settings.current();
        Self {
            deps,
            settings,
            session: None,
        }
    }

    pub fn state(&self) -> ParkingState {
        self.session
            .as_ref()
            .map(ActiveSession::to_state)
            .unwrap_or(ParkingState::Idle)
    }

    pub fn active_session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        self.state().remaining_ms(now)
    }

    pub fn progress(&self, now: DateTime<Utc>) -> f64 {
        self.state().progress(now)
    }

    pub fn time_status(&self, now: DateTime<Utc>) -> TimeStatus {
        self.state().time_status(now)
    }

    /// Picks up settings changed elsewhere. Alerts already armed keep their
    /// old timing until the next start or add-time.
    pub fn refresh_settings(&mut self) -> &AppSettings {
        self.settings = self.deps.settings.load();
        &self.settings
    }

    pub fn start_parking(&mut self, request: StartRequest, now: DateTime<Utc>) -> Result<ParkingState> {
        if self.session.is_some() {
            bail!("parking session already active");
        }
        request.details.validate()?;

        let started_at = request.started_at.unwrap_or(now);
        let ends_at = match request.ends_at {
            Some(ends_at) => ends_at,
            None => {
                let duration = match request.duration {
                    Some(duration) => duration,
                    None => i64::try_from(self.settings.default_duration_secs)
                        .ok()
                        .and_then(Duration::try_seconds)
                        .ok_or_else(|| {
                            anyhow!(
                                "default duration of {}s is out of range",
                                self.settings.default_duration_secs
                            )
                        })?,
                };
                if duration <= Duration::zero() {
                    bail!("parking duration must be greater than zero");
                }
                started_at
                    .checked_add_signed(duration)
                    .ok_or_else(|| anyhow!("parking duration of {duration} is out of range"))?
            }
        };
        if ends_at < started_at {
            return Err(anyhow!(
                "parking end {ends_at} is before its start {started_at}"
            ));
        }

        let location = request.location.or_else(|| {
            let fix = self.deps.location.current_location();
            if fix.is_none() {
                warn!("No location fix available; parking without a location");
            }
            fix
        });

        let session = ActiveSession {
            started_at,
            ends_at,
            location,
            details: request.details,
        };

        if let Err(err) = self.deps.active.save(&session) {
            error!("Failed to persist active session: {err:#}");
        }

        self.deps.location.start_tracking();
        self.deps.scheduler.arm(ends_at, now, &self.settings);

        info!("Parking started at {started_at}, expires at {ends_at}");
        self.session = Some(session);
        Ok(self.state())
    }

    pub fn add_time(&mut self, extra: Duration, now: DateTime<Utc>) -> Result<ParkingState> {
        if extra <= Duration::zero() {
            bail!("added time must be positive");
        }
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("no active parking session"))?;

        let ends_at = session
            .ends_at
            .checked_add_signed(extra)
            .ok_or_else(|| anyhow!("adding {extra} overflows the parking end time"))?;
        session.ends_at = ends_at;

        if let Err(err) = self.deps.active.save_end_time(ends_at) {
            error!("Failed to persist extended end time: {err:#}");
        }
        self.deps.scheduler.arm(ends_at, now, &self.settings);

        info!("Parking extended by {}s, now expires at {ends_at}", extra.num_seconds());
        Ok(self.state())
    }

    pub fn update_details(&mut self, details: ActiveDetails) -> Result<()> {
        details.validate()?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| anyhow!("no active parking session"))?;

        if let Err(err) = self.deps.active.save_details(&details) {
            error!("Failed to persist parking details: {err:#}");
        }
        session.details = details;
        Ok(())
    }

    /// Ends the running session now. Returns `None` when already idle.
    pub fn end_parking(&mut self, now: DateTime<Utc>) -> Option<ParkingSession> {
        self.finalize(now, EndReason::Manual)
    }

    pub fn on_tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let Some(session) = self.session.as_ref() else {
            return TickOutcome::Idle;
        };

        let remaining_ms = (session.ends_at - now).num_milliseconds();
        if remaining_ms <= 0 {
            return match self.finalize(now, EndReason::Expired) {
                Some(record) => TickOutcome::Expired(record),
                None => TickOutcome::Idle,
            };
        }

        if let Some(live) = &self.deps.live_activity {
            live.publish(remaining_ms, session.ends_at);
        }
        TickOutcome::Running { remaining_ms }
    }

    /// Restores the session persisted by a previous process. One that ran out
    /// while the process was gone is written to history with its scheduled
    /// end time.
    pub fn recover(&mut self, now: DateTime<Utc>) -> Result<RecoveryOutcome> {
        if self.session.is_some() {
            bail!("cannot recover while a parking session is active");
        }

        let Some(stored) = self.deps.active.load(now) else {
            return Ok(RecoveryOutcome::NothingStored);
        };

        if stored.is_expired(now) {
            warn!(
                "Stored parking session expired at {} while suspended; finalizing",
                stored.ends_at
            );
            let record = ParkingSession::from_active(&stored, stored.ends_at);
            self.deps.scheduler.cancel_all();
            self.record(&record);
            self.clear_persisted();
            return Ok(RecoveryOutcome::Finalized(record));
        }

        info!("Resuming parking session that expires at {}", stored.ends_at);
        let state = self.start_parking(StartRequest::restore(stored), now)?;
        Ok(RecoveryOutcome::Resumed(state))
    }

    fn finalize(&mut self, ended_at: DateTime<Utc>, reason: EndReason) -> Option<ParkingSession> {
        let session = self.session.take()?;

        self.deps.location.stop_tracking();
        self.deps.scheduler.cancel_all();
        if let Some(live) = &self.deps.live_activity {
            live.end();
        }

        let record = ParkingSession::from_active(&session, ended_at);
        self.record(&record);
        self.clear_persisted();

        info!(
            "Parking ended ({reason:?}) after {}",
            record.formatted_duration()
        );
        Some(record)
    }

    fn record(&self, record: &ParkingSession) {
        if let Err(err) = self.deps.history.append(record.clone()) {
            error!("Failed to append parking session {}: {err:#}", record.id);
        }
    }

    fn clear_persisted(&self) {
        if let Err(err) = self.deps.active.clear() {
            error!("Failed to clear active parking session: {err:#}");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{KvStore, MemoryStore};
    use crate::notifications::{reminder_id, EXPIRED_ID, LEAD_WARNING_ID};
    use crate::platform::fakes::{FakeLiveActivity, FakeLocation, FakeNotifications};
    use chrono::TimeZone;

    pub(crate) fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_767_441_600 + secs, 0).unwrap()
    }

    pub(crate) struct Harness {
        pub kv: Arc<MemoryStore>,
        pub location: Arc<FakeLocation>,
        pub notifications: Arc<FakeNotifications>,
        pub live: Arc<FakeLiveActivity>,
        pub deps: ParkingDeps,
    }

    impl Harness {
        pub fn new() -> Self {
            Self::with_kv(Arc::new(MemoryStore::new()))
        }

        pub fn with_kv(kv: Arc<MemoryStore>) -> Self {
            let location = Arc::new(FakeLocation::with_fix(LocationSnapshot::new(
                37.7749,
                -122.4194,
                "1 Market St, San Francisco",
            )));
            let notifications = Arc::new(FakeNotifications::granted());
            let live = Arc::new(FakeLiveActivity::default());
            let store: Arc<dyn KvStore> = kv.clone();
            let deps = ParkingDeps {
                settings: Arc::new(SettingsStore::new(store.clone())),
                history: HistoryStore::new(store.clone()),
                active: ActiveSessionStore::new(store.clone()),
                scheduler: Arc::new(NotificationScheduler::new(notifications.clone(), store.clone())),
                location: location.clone(),
                live_activity: Some(live.clone()),
            };
            Self {
                kv,
                location,
                notifications,
                live,
                deps,
            }
        }

        pub fn machine(&self) -> ParkingMachine {
            ParkingMachine::new(self.deps.clone())
        }
    }

    fn window(state: &ParkingState) -> (DateTime<Utc>, DateTime<Utc>) {
        match state {
            ParkingState::Active {
                started_at,
                ends_at,
                ..
            } => (*started_at, *ends_at),
            ParkingState::Idle => panic!("expected an active state"),
        }
    }

    #[test]
    fn start_uses_requested_duration() {
        let harness = Harness::new();
        let mut machine = harness.machine();

        for secs in [1, 59, 3600, 86_400] {
            let state = machine
                .start_parking(StartRequest::for_duration(Duration::seconds(secs)), at(0))
                .unwrap();
            let (start, end) = window(&state);
            assert_eq!(start, at(0));
            assert_eq!(end - start, Duration::seconds(secs));
            machine.end_parking(at(1));
        }
    }

    #[test]
    fn start_falls_back_to_default_duration_and_current_location() {
        let harness = Harness::new();
        let mut machine = harness.machine();

        let state = machine.start_parking(StartRequest::default(), at(0)).unwrap();
        assert_eq!(state.ends_at(), Some(at(3600)));
        let ParkingState::Active { location, .. } = &state else {
            panic!("expected active");
        };
        assert_eq!(location.as_ref().map(|l| l.latitude), Some(37.7749));
        assert!(harness.location.is_tracking());
        assert_eq!(
            harness.notifications.pending_ids(),
            vec![LEAD_WARNING_ID.to_string(), EXPIRED_ID.to_string()]
        );
    }

    #[test]
    fn missing_location_is_tolerated() {
        let harness = Harness::new();
        *harness.location.fix.lock().unwrap() = None;
        let mut machine = harness.machine();

        let state = machine.start_parking(StartRequest::default(), at(0)).unwrap();
        assert!(matches!(state, ParkingState::Active { location: None, .. }));
    }

    #[test]
    fn invalid_starts_are_rejected() {
        let harness = Harness::new();
        let mut machine = harness.machine();

        assert!(machine
            .start_parking(StartRequest::for_duration(Duration::zero()), at(0))
            .is_err());
        let backwards = StartRequest {
            started_at: Some(at(100)),
            ends_at: Some(at(50)),
            ..StartRequest::default()
        };
        assert!(machine.start_parking(backwards, at(0)).is_err());
        assert_eq!(machine.state(), ParkingState::Idle);

        machine.start_parking(StartRequest::default(), at(0)).unwrap();
        assert!(machine.start_parking(StartRequest::default(), at(1)).is_err());
    }

    #[test]
    fn add_time_extends_end_and_rearms() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
            .unwrap();

        let state = machine.add_time(Duration::seconds(1800), at(10)).unwrap();
        assert_eq!(window(&state), (at(0), at(5400)));

        let fire_times: Vec<_> = harness
            .notifications
            .pending()
            .iter()
            .map(|alert| alert.fire_at)
            .collect();
        assert_eq!(fire_times, vec![at(5400 - 600), at(5400)]);

        let stored = harness.deps.active.load(at(10)).unwrap();
        assert_eq!(stored.ends_at, at(5400));

        assert!(machine.add_time(Duration::zero(), at(10)).is_err());
        assert!(machine.add_time(Duration::seconds(-5), at(10)).is_err());
        assert_eq!(machine.state().ends_at(), Some(at(5400)));
    }

    #[test]
    fn out_of_range_durations_leave_state_untouched() {
        let harness = Harness::new();
        let mut machine = harness.machine();

        let huge = Duration::days(100_000_000);
        assert!(machine
            .start_parking(StartRequest::for_duration(huge), at(0))
            .is_err());
        assert_eq!(machine.state(), ParkingState::Idle);
        assert_eq!(harness.deps.active.load(at(0)), None);
        assert!(harness.notifications.pending().is_empty());

        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
            .unwrap();
        let armed = harness.notifications.pending_ids();

        assert!(machine.add_time(huge, at(10)).is_err());
        assert_eq!(machine.state().ends_at(), Some(at(3600)));
        assert_eq!(harness.deps.active.load(at(10)).unwrap().ends_at, at(3600));
        assert_eq!(harness.notifications.pending_ids(), armed);
    }

    #[test]
    fn default_duration_beyond_calendar_is_an_error() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine.settings.default_duration_secs = u64::MAX;
        assert!(machine.start_parking(StartRequest::default(), at(0)).is_err());

        machine.settings.default_duration_secs = 20_000_000_000_000;
        assert!(machine.start_parking(StartRequest::default(), at(0)).is_err());
        assert_eq!(machine.state(), ParkingState::Idle);
    }

    #[test]
    fn add_time_while_idle_fails() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        assert!(machine.add_time(Duration::seconds(60), at(0)).is_err());
        assert_eq!(machine.state(), ParkingState::Idle);
    }

    #[test]
    fn end_records_history_and_clears_storage() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
            .unwrap();
        machine.add_time(Duration::seconds(1800), at(100)).unwrap();

        let record = machine.end_parking(at(4000)).unwrap();
        assert_eq!(record.started_at, at(0));
        assert_eq!(record.ended_at, at(4000));
        assert_eq!(record.duration(), Duration::seconds(4000));

        assert_eq!(machine.state(), ParkingState::Idle);
        assert_eq!(harness.deps.history.load_all(), vec![record]);
        assert_eq!(harness.deps.active.load(at(4000)), None);
        assert!(harness.notifications.pending().is_empty());
        assert!(!harness.location.is_tracking());
        assert_eq!(*harness.live.ended.lock().unwrap(), 1);

        assert_eq!(machine.end_parking(at(4100)), None);
        assert_eq!(harness.deps.history.load_all().len(), 1);
    }

    #[test]
    fn end_carries_details_then_resets_them() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine.start_parking(StartRequest::default(), at(0)).unwrap();
        machine
            .update_details(ActiveDetails {
                hourly_rate: Some(2.0),
                floor: Some("3".into()),
                section: Some("F".into()),
                photo: Some("spot.jpg".into()),
            })
            .unwrap();

        let record = machine.end_parking(at(7200)).unwrap();
        assert_eq!(record.total_cost(), Some(4.0));
        assert_eq!(record.parking_spot_info().as_deref(), Some("3 • F"));
        assert_eq!(record.photo.as_deref(), Some("spot.jpg"));

        let state = machine.start_parking(StartRequest::default(), at(8000)).unwrap();
        assert!(state.is_active());
        assert_eq!(machine.active_session().unwrap().details, ActiveDetails::default());
    }

    #[test]
    fn update_details_validates_and_requires_session() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        assert!(machine.update_details(ActiveDetails::default()).is_err());

        machine.start_parking(StartRequest::default(), at(0)).unwrap();
        let negative = ActiveDetails {
            hourly_rate: Some(-3.0),
            ..ActiveDetails::default()
        };
        assert!(machine.update_details(negative).is_err());
    }

    #[test]
    fn tick_counts_down_then_expires_once() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(60)), at(0))
            .unwrap();

        assert_eq!(
            machine.on_tick(at(30)),
            TickOutcome::Running { remaining_ms: 30_000 }
        );
        assert_eq!(harness.live.published.lock().unwrap().as_slice(), &[30_000]);

        let TickOutcome::Expired(record) = machine.on_tick(at(61)) else {
            panic!("expected expiry");
        };
        assert_eq!(record.started_at, at(0));
        assert_eq!(record.ended_at, at(61));
        assert_eq!(machine.state(), ParkingState::Idle);
        assert_eq!(machine.on_tick(at(62)), TickOutcome::Idle);
        assert_eq!(harness.deps.history.load_all().len(), 1);
        assert_eq!(harness.deps.active.load(at(62)), None);
    }

    #[test]
    fn expiry_matches_manual_end_shape() {
        let manual = Harness::new();
        let mut machine = manual.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(60)), at(0))
            .unwrap();
        let ended = machine.end_parking(at(60)).unwrap();

        let expired = Harness::new();
        let mut machine = expired.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(60)), at(0))
            .unwrap();
        let TickOutcome::Expired(timed_out) = machine.on_tick(at(60)) else {
            panic!("expected expiry at the exact end instant");
        };

        assert_eq!(ended.started_at, timed_out.started_at);
        assert_eq!(ended.ended_at, timed_out.ended_at);
        assert_eq!(ended.duration_ms, timed_out.duration_ms);
        assert_eq!(ended.location, timed_out.location);
    }

    #[test]
    fn recovery_resumes_future_session() {
        let harness = Harness::new();
        {
            let mut first = harness.machine();
            first
                .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
                .unwrap();
            first
                .update_details(ActiveDetails {
                    floor: Some("L2".into()),
                    ..ActiveDetails::default()
                })
                .unwrap();
        }
        *harness.location.fix.lock().unwrap() = None;

        let mut second = harness.machine();
        let RecoveryOutcome::Resumed(state) = second.recover(at(600)).unwrap() else {
            panic!("expected resume");
        };
        assert_eq!(window(&state), (at(0), at(3600)));
        let ParkingState::Active { location, .. } = &state else {
            panic!("expected active");
        };
        assert_eq!(location.as_ref().map(|l| l.address.as_str()), Some("1 Market St, San Francisco"));
        assert_eq!(second.active_session().unwrap().details.floor.as_deref(), Some("L2"));
        assert_eq!(harness.notifications.pending_ids().len(), 2);
        assert!(harness.deps.history.load_all().is_empty());
    }

    #[test]
    fn recovery_finalizes_expired_session_once() {
        let harness = Harness::new();
        {
            let mut first = harness.machine();
            first
                .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
                .unwrap();
        }

        let mut second = harness.machine();
        let RecoveryOutcome::Finalized(record) = second.recover(at(9000)).unwrap() else {
            panic!("expected finalize");
        };
        assert_eq!(record.started_at, at(0));
        assert_eq!(record.ended_at, at(3600));
        assert_eq!(second.state(), ParkingState::Idle);
        assert!(harness.notifications.pending().is_empty());

        let mut third = harness.machine();
        assert_eq!(third.recover(at(9001)).unwrap(), RecoveryOutcome::NothingStored);
        assert_eq!(harness.deps.history.load_all(), vec![record]);
    }

    #[test]
    fn restart_withdraws_reminders_armed_by_previous_process() {
        let mut harness = Harness::new();
        harness
            .deps
            .settings
            .update_additional_reminders(vec![45])
            .unwrap();
        {
            let mut first = harness.machine();
            first
                .start_parking(StartRequest::for_duration(Duration::seconds(3600)), at(0))
                .unwrap();
        }
        assert!(harness.notifications.pending_ids().contains(&reminder_id(45)));

        harness
            .deps
            .settings
            .update_additional_reminders(Vec::new())
            .unwrap();
        harness.deps.scheduler = Arc::new(NotificationScheduler::new(
            harness.notifications.clone(),
            harness.kv.clone(),
        ));

        let mut second = harness.machine();
        assert!(matches!(
            second.recover(at(60)).unwrap(),
            RecoveryOutcome::Resumed(_)
        ));
        assert_eq!(
            harness.notifications.pending_ids(),
            vec![LEAD_WARNING_ID.to_string(), EXPIRED_ID.to_string()]
        );

        second.end_parking(at(120)).unwrap();
        assert!(harness.notifications.pending().is_empty());
    }

    #[test]
    fn recovery_with_empty_storage_is_a_no_op() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        assert_eq!(machine.recover(at(0)).unwrap(), RecoveryOutcome::NothingStored);
        assert_eq!(machine.state(), ParkingState::Idle);
    }

    #[test]
    fn denied_notifications_do_not_block_the_session() {
        let mut harness = Harness::new();
        let denied = Arc::new(FakeNotifications::denied());
        harness.deps.scheduler =
            Arc::new(NotificationScheduler::new(denied.clone(), harness.kv.clone()));
        let mut machine = harness.machine();

        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(60)), at(0))
            .unwrap();
        assert!(denied.pending().is_empty());
        assert!(matches!(machine.on_tick(at(60)), TickOutcome::Expired(_)));
        assert_eq!(harness.deps.history.load_all().len(), 1);
    }

    #[test]
    fn refresh_settings_changes_default_duration() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        harness.deps.settings.set_default_duration(900).unwrap();
        assert_eq!(machine.settings().default_duration_secs, 3600);

        machine.refresh_settings();
        let state = machine.start_parking(StartRequest::default(), at(0)).unwrap();
        assert_eq!(state.ends_at(), Some(at(900)));
    }

    #[test]
    fn progress_and_status_follow_the_clock() {
        let harness = Harness::new();
        let mut machine = harness.machine();
        machine
            .start_parking(StartRequest::for_duration(Duration::seconds(1200)), at(0))
            .unwrap();

        assert!((machine.progress(at(300)) - 0.25).abs() < 1e-9);
        assert_eq!(machine.remaining_ms(at(300)), 900_000);
        assert_eq!(machine.time_status(at(300)), TimeStatus::Plenty);
        assert_eq!(machine.time_status(at(700)), TimeStatus::Low);
        assert_eq!(machine.time_status(at(1000)), TimeStatus::Critical);
    }
}
