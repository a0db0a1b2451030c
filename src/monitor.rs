//! Per-session composition of the focus countdown, the break timer and the
//! presence alert.
//!
//! All transitions go through [`MonitorCore`], whose single async mutex
//! serialises UI commands and background ticks. [`SessionClock`] and
//! [`BreakController`] are cheap handles onto the same core.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::{
    alert::{AlertController, AlertState},
    audio::AudioDevice,
    breaks::BreakController,
    clock::Clock,
    db::{ActivityAction, ActivityLogEntry},
    detection::Detector,
    presence::PresenceTimerState,
    settings::MonitorSettings,
    store::{ActivityLog, AnchorStore},
    timer::{EngineState, Phase, SessionClock},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSnapshot {
    pub remaining_seconds: u64,
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub session_id: String,
    pub phase: Phase,
    pub focus: Option<CountdownSnapshot>,
    #[serde(rename = "break")]
    pub on_break: Option<CountdownSnapshot>,
    pub presence: Option<PresenceTimerState>,
    pub alert: AlertState,
}

impl MonitorSnapshot {
    pub fn focus_remaining(&self) -> Option<u64> {
        self.focus.as_ref().map(|focus| focus.remaining_seconds)
    }

    pub fn break_remaining(&self) -> Option<u64> {
        self.on_break.as_ref().map(|brk| brk.remaining_seconds)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MonitorEvent {
    StateChanged {
        snapshot: MonitorSnapshot,
    },
    Tick {
        snapshot: MonitorSnapshot,
    },
    AlertRaised {
        at: DateTime<Utc>,
    },
    AlertCleared,
    #[serde(rename_all = "camelCase")]
    FocusCompleted {
        duration_minutes: u32,
    },
    #[serde(rename_all = "camelCase")]
    BreakCompleted {
        duration_minutes: u32,
    },
    #[serde(rename_all = "camelCase")]
    Chime {
        elapsed_minutes: u64,
    },
}

/// Collaborators a [`FocusMonitor`] is built from.
pub struct MonitorParts {
    pub session_id: String,
    pub store: Arc<dyn AnchorStore>,
    pub activity: Arc<dyn ActivityLog>,
    pub clock: Arc<dyn Clock>,
    pub detector: Arc<dyn Detector>,
    pub audio: AudioDevice,
    pub settings: MonitorSettings,
}

pub(crate) struct MonitorCore {
    pub(crate) session_id: String,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) store: Arc<dyn AnchorStore>,
    pub(crate) activity: Arc<dyn ActivityLog>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) detector: Arc<dyn Detector>,
    pub(crate) alert: AlertController,
    pub(crate) settings: MonitorSettings,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorCore {
    /// Appends to the activity log. A failed write is logged and otherwise
    /// ignored; the session keeps running without durable history.
    pub(crate) async fn record(&self, action: ActivityAction, details: impl Into<String>) {
        let entry = ActivityLogEntry::new(&self.session_id, self.clock.now(), action, details);
        if let Err(err) = self.activity.append(&entry).await {
            log_error!(
                "failed to record {} for session {}: {err:#}",
                action.as_str(),
                self.session_id
            );
        }
    }

    pub(crate) fn emit(&self, event: MonitorEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_state(&self, state: &EngineState) -> MonitorSnapshot {
        let snapshot = self.snapshot_locked(state);
        self.emit(MonitorEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
        snapshot
    }

    /// Hides the overlay if it is up.
    pub(crate) fn clear_alert(&self) {
        if self.alert.acknowledge() {
            self.emit(MonitorEvent::AlertCleared);
        }
    }

    pub(crate) fn snapshot_locked(&self, state: &EngineState) -> MonitorSnapshot {
        let focus = state.focus.as_ref().map(|run| CountdownSnapshot {
            remaining_seconds: run.remaining_secs,
            duration_minutes: run.anchor.duration_minutes,
            started_at: run.anchor.start_time,
            ends_at: run.anchor.start_time
                + Duration::minutes(i64::from(run.anchor.duration_minutes)),
        });
        let on_break = state.on_break.as_ref().map(|run| CountdownSnapshot {
            remaining_seconds: run.remaining_secs,
            duration_minutes: run.anchor.duration_minutes,
            started_at: run.anchor.start_time,
            ends_at: run.anchor.end_time,
        });

        MonitorSnapshot {
            session_id: self.session_id.clone(),
            phase: state.phase,
            focus,
            on_break,
            presence: state.presence.as_ref().map(|presence| presence.state()),
            alert: self.alert.state(),
        }
    }
}

/// The engine for one work session.
#[derive(Clone)]
pub struct FocusMonitor {
    core: Arc<MonitorCore>,
    clock: SessionClock,
    breaks: BreakController,
}

impl FocusMonitor {
    pub fn new(parts: MonitorParts) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let alert = AlertController::new(parts.audio, parts.settings.alarm.clone());
        if let Err(err) = alert.audio().acquire() {
            log_warn!("audio output unavailable, alerts will be silent: {err:#}");
        }

        let core = Arc::new(MonitorCore {
            session_id: parts.session_id,
            state: Mutex::new(EngineState::new()),
            store: parts.store,
            activity: parts.activity,
            clock: parts.clock,
            detector: parts.detector,
            alert,
            settings: parts.settings,
            events,
        });

        Self {
            clock: SessionClock::new(core.clone()),
            breaks: BreakController::new(core.clone()),
            core,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.core.session_id
    }

    pub fn session_clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn breaks(&self) -> &BreakController {
        &self.breaks
    }

    pub fn alert(&self) -> &AlertController {
        &self.core.alert
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.core.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.core.events.subscribe()
    }

    pub async fn snapshot(&self) -> MonitorSnapshot {
        let state = self.core.state.lock().await;
        self.core.snapshot_locked(&state)
    }

    /// This session's activity log, oldest first.
    pub async fn activity(&self) -> Result<Vec<ActivityLogEntry>> {
        self.core.activity.entries(&self.core.session_id).await
    }

    /// Rebuilds runtime state from stored anchors. A live break takes
    /// precedence; if a focus anchor was stored alongside it, the focus
    /// anchor is discarded. If the break anchor cannot be read, nothing is
    /// resumed.
    pub async fn resume_on_load(&self) -> MonitorSnapshot {
        let core = &self.core;
        let mut state = core.state.lock().await;
        if state.phase != Phase::Idle {
            return core.snapshot_locked(&state);
        }

        match self.breaks.resume_locked(&mut state).await {
            Ok(true) => match core.store.load_focus_anchor(&core.session_id).await {
                Ok(Some(_)) => {
                    log_warn!(
                        "session {} had both a focus and a break anchor; keeping the break",
                        core.session_id
                    );
                    if let Err(err) = core.store.delete_focus_anchor(&core.session_id).await {
                        log_error!("failed to delete conflicting focus anchor: {err:#}");
                    }
                }
                Ok(None) => {}
                Err(err) => log_error!("failed to load focus anchor: {err:#}"),
            },
            Ok(false) => {
                self.clock.resume_locked(&mut state).await;
            }
            Err(err) => log_error!("{err:#}; staying idle"),
        }

        if state.phase != Phase::Idle {
            log_info!("resumed session {} in {:?}", core.session_id, state.phase);
        }
        core.emit_state(&state)
    }

    pub async fn start_focus(&self, duration_minutes: u32) -> Result<MonitorSnapshot> {
        self.clock.start(duration_minutes).await
    }

    pub async fn stop_focus(&self) -> MonitorSnapshot {
        self.clock.stop().await
    }

    pub async fn schedule_break(&self, duration_minutes: u32) -> Result<MonitorSnapshot> {
        self.breaks.start(duration_minutes).await
    }

    pub async fn end_break_early(&self) -> MonitorSnapshot {
        self.breaks.end().await
    }

    pub async fn acknowledge_alert(&self) -> MonitorSnapshot {
        let state = self.core.state.lock().await;
        self.core.clear_alert();
        self.core.snapshot_locked(&state)
    }

    /// Stops whatever is running without touching the work session itself.
    pub async fn shutdown(&self) -> MonitorSnapshot {
        self.clock.stop().await;
        self.breaks.end().await
    }
}
