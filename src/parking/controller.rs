use std::{sync::Arc, time::Duration as StdDuration};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::config::CoreConfig;
use crate::models::{ActiveDetails, ParkingSession, ParkingState, TimeStatus};
use crate::platform::Clock;

use super::machine::{EndReason, ParkingMachine, RecoveryOutcome, StartRequest, TickOutcome};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSnapshot {
    pub state: ParkingState,
    pub remaining_ms: i64,
    pub progress: f64,
    pub time_status: TimeStatus,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HapticStyle {
    Light,
    Medium,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ParkingEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged {
        state: ParkingState,
        remaining_ms: i64,
    },
    #[serde(rename_all = "camelCase")]
    Tick {
        remaining_ms: i64,
        ends_at: DateTime<Utc>,
    },
    SessionCompleted {
        session: ParkingSession,
        reason: EndReason,
    },
    Haptic {
        style: HapticStyle,
    },
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Async front of [`ParkingMachine`]: serializes every mutation behind one
/// mutex and owns the one-second ticker.
#[derive(Clone)]
pub struct ParkingController {
    machine: Arc<Mutex<ParkingMachine>>,
    clock: Arc<dyn Clock>,
    ticker: Arc<Mutex<Option<Ticker>>>,
    events: broadcast::Sender<ParkingEvent>,
    tick_interval: StdDuration,
    heartbeat_every_ticks: u32,
}

impl ParkingController {
    pub fn new(machine: ParkingMachine, clock: Arc<dyn Clock>, config: &CoreConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            machine: Arc::new(Mutex::new(machine)),
            clock,
            ticker: Arc::new(Mutex::new(None)),
            events,
            tick_interval: config.tick_interval,
            heartbeat_every_ticks: config.heartbeat_every_ticks.max(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ParkingEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> ParkingState {
        self.machine.lock().await.state()
    }

    pub async fn get_snapshot(&self) -> ParkingSnapshot {
        let now = self.clock.now();
        let guard = self.machine.lock().await;
        snapshot_of(&guard, now)
    }

    pub async fn start_parking(&self, request: StartRequest) -> Result<ParkingState> {
        let state = {
            let mut machine = self.machine.lock().await;
            machine.start_parking(request, self.clock.now())?
        };

        self.spawn_ticker().await;
        self.emit_state_changed().await;
        Ok(state)
    }

    pub async fn add_time(&self, extra: Duration) -> Result<ParkingState> {
        let (state, haptics) = {
            let mut machine = self.machine.lock().await;
            let state = machine.add_time(extra, self.clock.now())?;
            (state, machine.settings().haptics_enabled)
        };

        if haptics {
            self.emit(ParkingEvent::Haptic {
                style: HapticStyle::Medium,
            });
        }
        self.emit_state_changed().await;
        Ok(state)
    }

    pub async fn update_details(&self, details: ActiveDetails) -> Result<()> {
        self.machine.lock().await.update_details(details)
    }

    /// Ends the running session. Calling it while idle is a no-op.
    pub async fn end_parking(&self) -> Option<ParkingSession> {
        let (record, haptics) = {
            let mut machine = self.machine.lock().await;
            let record = machine.end_parking(self.clock.now());
            (record, machine.settings().haptics_enabled)
        };
        self.cancel_ticker().await;

        let record = record?;
        if haptics {
            self.emit(ParkingEvent::Haptic {
                style: HapticStyle::Light,
            });
        }
        self.emit_state_changed().await;
        self.emit(ParkingEvent::SessionCompleted {
            session: record.clone(),
            reason: EndReason::Manual,
        });
        Some(record)
    }

    /// Runs once at process start, before any user action.
    pub async fn recover(&self) -> Result<RecoveryOutcome> {
        let outcome = {
            let mut machine = self.machine.lock().await;
            machine.recover(self.clock.now())?
        };

        match &outcome {
            RecoveryOutcome::Resumed(_) => {
                self.spawn_ticker().await;
                self.emit_state_changed().await;
            }
            RecoveryOutcome::Finalized(record) => {
                self.emit(ParkingEvent::SessionCompleted {
                    session: record.clone(),
                    reason: EndReason::Recovered,
                });
            }
            RecoveryOutcome::NothingStored => {}
        }
        Ok(outcome)
    }

    /// Applies one tick immediately, e.g. when the host wakes from background.
    pub async fn tick_now(&self) -> TickOutcome {
        let outcome = {
            let mut machine = self.machine.lock().await;
            machine.on_tick(self.clock.now())
        };
        if let TickOutcome::Expired(record) = &outcome {
            self.cancel_ticker().await;
            self.emit_state_changed().await;
            self.emit(ParkingEvent::SessionCompleted {
                session: record.clone(),
                reason: EndReason::Expired,
            });
        }
        outcome
    }

    pub async fn refresh_settings(&self) {
        self.machine.lock().await.refresh_settings();
    }

    /// Stops the ticker without touching the session; the persisted copy
    /// picks up again on the next [`ParkingController::recover`].
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
    }

    pub async fn is_ticking(&self) -> bool {
        self.ticker
            .lock()
            .await
            .as_ref()
            .map(|ticker| !ticker.handle.is_finished())
            .unwrap_or(false)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(previous) = ticker_guard.take() {
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let machine = self.machine.clone();
        let clock = self.clock.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;
        let cancel = CancellationToken::new();
        let cancel_for_task = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = cancel_for_task.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let now = clock.now();
                let (outcome, state, ends_at) = {
                    let mut guard = machine.lock().await;
                    if cancel_for_task.is_cancelled() {
                        break;
                    }
                    let ends_at = guard.state().ends_at();
                    let outcome = guard.on_tick(now);
                    (outcome, guard.state(), ends_at)
                };

                match outcome {
                    TickOutcome::Idle => break,
                    TickOutcome::Running { remaining_ms } => {
                        ticks = ticks.wrapping_add(1);
                        if ticks % heartbeat_every == 0 {
                            info!("Parking heartbeat: {}s remaining", remaining_ms / 1000);
                        }
                        if let Some(ends_at) = ends_at {
                            let _ = events.send(ParkingEvent::Tick {
                                remaining_ms,
                                ends_at,
                            });
                        }
                    }
                    TickOutcome::Expired(record) => {
                        info!("Parking expired; session {} recorded", record.id);
                        let _ = events.send(ParkingEvent::StateChanged {
                            state,
                            remaining_ms: 0,
                        });
                        let _ = events.send(ParkingEvent::SessionCompleted {
                            session: record,
                            reason: EndReason::Expired,
                        });
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(Ticker { handle, cancel });
    }

    async fn cancel_ticker(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.cancel.cancel();
            ticker.handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let now = self.clock.now();
        let (state, remaining_ms) = {
            let guard = self.machine.lock().await;
            (guard.state(), guard.remaining_ms(now))
        };
        self.emit(ParkingEvent::StateChanged {
            state,
            remaining_ms,
        });
    }

    fn emit(&self, event: ParkingEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

fn snapshot_of(machine: &ParkingMachine, now: DateTime<Utc>) -> ParkingSnapshot {
    ParkingSnapshot {
        state: machine.state(),
        remaining_ms: machine.remaining_ms(now),
        progress: machine.progress(now),
        time_status: machine.time_status(now),
    }
}
