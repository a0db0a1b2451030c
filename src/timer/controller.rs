use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::{
    audio::{Tone, ToneKind},
    db::{ActivityAction, FocusAnchor},
    detection::DetectionResult,
    monitor::{MonitorCore, MonitorEvent, MonitorSnapshot},
    presence::{worker, CheckTicket, IntervalDecision, PresenceScheduler, Verdict},
};

use super::{EngineState, FocusRun, Phase};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FocusEnd {
    Stopped,
    Expired,
}

/// Focus countdown for one session.
///
/// The stored [`FocusAnchor`] is authoritative: every tick recomputes the
/// remaining time from it, so a late or skipped tick never drifts the
/// countdown.
#[derive(Clone)]
pub struct SessionClock {
    core: Arc<MonitorCore>,
}

impl SessionClock {
    pub(crate) fn new(core: Arc<MonitorCore>) -> Self {
        Self { core }
    }

    pub async fn start(&self, duration_minutes: u32) -> Result<MonitorSnapshot> {
        let core = &self.core;
        let mut state = core.state.lock().await;

        if duration_minutes == 0 {
            bail!("focus duration must be greater than zero");
        }
        match state.phase {
            Phase::Idle => {}
            Phase::Focusing => bail!("a focus session is already running"),
            Phase::OnBreak => bail!("end the break before starting a focus session"),
        }

        let now = core.clock.now();
        let anchor = FocusAnchor::new(&core.session_id, now, duration_minutes);
        if let Err(err) = core.store.save_focus_anchor(&anchor).await {
            log_error!(
                "failed to persist focus anchor for session {}; continuing without it: {err:#}",
                core.session_id
            );
        }

        core.enter_focus(&mut state, anchor, now);
        core.record(
            ActivityAction::FocusStart,
            format!("Started {duration_minutes}-minute focus session"),
        )
        .await;
        log_info!("Started {}-minute focus session", duration_minutes);

        Ok(core.emit_state(&state))
    }

    /// Ends the countdown. Calling it while not focusing changes nothing.
    pub async fn stop(&self) -> MonitorSnapshot {
        let core = &self.core;
        let mut state = core.state.lock().await;
        if core.finish_focus(&mut state, FocusEnd::Stopped).await {
            core.emit_state(&state)
        } else {
            core.snapshot_locked(&state)
        }
    }

    pub async fn resume_on_load(&self) -> MonitorSnapshot {
        let mut state = self.core.state.lock().await;
        if state.phase == Phase::Idle {
            self.resume_locked(&mut state).await;
        }
        self.core.emit_state(&state)
    }

    /// Returns whether a countdown was resumed.
    pub(crate) async fn resume_locked(&self, state: &mut EngineState) -> bool {
        let core = &self.core;
        let anchor = match core.store.load_focus_anchor(&core.session_id).await {
            Ok(Some(anchor)) if anchor.is_active => anchor,
            Ok(_) => return false,
            Err(err) => {
                log_error!("failed to load focus anchor for session {}: {err:#}", core.session_id);
                return false;
            }
        };

        let now = core.clock.now();
        if anchor.remaining_secs(now) == 0 {
            log_debug!("discarding expired focus anchor for session {}", core.session_id);
            if let Err(err) = core.store.delete_focus_anchor(&core.session_id).await {
                log_error!("failed to delete expired focus anchor: {err:#}");
            }
            return false;
        }

        log_info!(
            "resuming focus session with {}s remaining",
            anchor.remaining_secs(now)
        );
        core.enter_focus(state, anchor, now);
        true
    }

    pub async fn remaining_secs(&self) -> Option<u64> {
        let state = self.core.state.lock().await;
        state.focus.as_ref().map(|run| run.remaining_secs)
    }
}

impl MonitorCore {
    pub(crate) fn enter_focus(
        self: &Arc<Self>,
        state: &mut EngineState,
        anchor: FocusAnchor,
        now: DateTime<Utc>,
    ) {
        state.tasks.cancel_all();
        state.epoch += 1;
        let epoch = state.epoch;

        state.phase = Phase::Focusing;
        state.presence = Some(PresenceScheduler::new(&self.settings.presence, epoch));
        state.focus = Some(FocusRun {
            remaining_secs: anchor.remaining_secs(now),
            anchor: anchor.clone(),
        });

        let core = Arc::clone(self);
        let token = state.tasks.token();
        state.tasks.spawn("focus-tick", async move {
            let mut ticker = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !core.on_focus_tick(epoch).await {
                            break;
                        }
                    }
                }
            }
        });

        if self.settings.chime.enabled {
            self.spawn_chime(state, epoch, &anchor, now);
        }
    }

    /// Chimes every interval of focus time, counted from the anchor so a
    /// resumed session keeps its original rhythm.
    fn spawn_chime(
        self: &Arc<Self>,
        state: &mut EngineState,
        epoch: u64,
        anchor: &FocusAnchor,
        now: DateTime<Utc>,
    ) {
        let period_secs = self.settings.chime.interval().as_secs().max(1);
        let period = Duration::from_secs(period_secs);
        let into_period = anchor.elapsed_secs(now) % period_secs;
        let first = Duration::from_secs(period_secs - into_period);

        let core = Arc::clone(self);
        let token = state.tasks.token();
        state.tasks.spawn("focus-chime", async move {
            let mut ticker = time::interval_at(Instant::now() + first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !core.on_chime(epoch).await {
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn on_focus_tick(self: &Arc<Self>, epoch: u64) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_current(epoch, Phase::Focusing) {
            return false;
        }

        let now = self.clock.now();
        let remaining = match state.focus.as_mut() {
            Some(run) => {
                run.remaining_secs = run.anchor.remaining_secs(now);
                run.remaining_secs
            }
            None => return false,
        };

        if remaining == 0 {
            self.finish_focus(&mut state, FocusEnd::Expired).await;
            self.emit_state(&state);
            return false;
        }

        let decision = state.presence.as_mut().and_then(PresenceScheduler::tick);
        if let Some(IntervalDecision::Begin(ticket)) = decision {
            self.spawn_check(&mut state, ticket);
        }

        self.emit(MonitorEvent::Tick {
            snapshot: self.snapshot_locked(&state),
        });
        true
    }

    async fn on_chime(&self, epoch: u64) -> bool {
        let state = self.state.lock().await;
        if !state.is_current(epoch, Phase::Focusing) {
            return false;
        }
        let Some(run) = state.focus.as_ref() else {
            return false;
        };

        let now = self.clock.now();
        // Expiry is the tick's job.
        if run.anchor.remaining_secs(now) == 0 {
            return true;
        }
        if self.alert.audio().active_tone() == Some(ToneKind::Alarm) {
            log_debug!("skipping focus chime while the alarm is sounding");
            return true;
        }

        let chime = Tone::Chime {
            volume: self.settings.chime.volume,
        };
        if let Err(err) = self.alert.audio().play_tone(chime) {
            log_warn!("failed to play focus chime: {err:#}");
        }

        let elapsed_minutes = run.anchor.elapsed_secs(now) / 60;
        self.record(
            ActivityAction::FocusChime,
            format!("{}-minute alert beep", self.settings.chime.interval_mins),
        )
        .await;
        self.emit(MonitorEvent::Chime { elapsed_minutes });
        true
    }

    fn spawn_check(self: &Arc<Self>, state: &mut EngineState, ticket: CheckTicket) {
        let core = Arc::clone(self);
        let detector = Arc::clone(&self.detector);
        let config = self.settings.presence.detection.clone();
        let timeout = self.settings.presence.check_timeout();
        let token = state.tasks.token();

        state.tasks.spawn("presence-check", async move {
            if let Some(result) = worker::run_check(detector, config, timeout, token).await {
                core.on_detect_result(ticket, result).await;
            }
        });
    }

    pub(crate) async fn on_detect_result(&self, ticket: CheckTicket, result: DetectionResult) {
        let mut state = self.state.lock().await;
        if !state.is_current(ticket.epoch, Phase::Focusing) {
            log_debug!("dropping presence result for a finished focus session");
            return;
        }

        let verdict = match state.presence.as_mut() {
            Some(presence) => presence.on_detect_result(ticket, result.detected),
            None => Verdict::Stale,
        };

        match verdict {
            Verdict::Stale => log_debug!("dropping stale presence result {}", ticket.check_id),
            Verdict::Present => {}
            Verdict::Absent => {
                let now = self.clock.now();
                log_info!(
                    "face not detected (confidence {:.2}), raising alert",
                    result.confidence
                );
                self.alert.raise(now);
                self.record(ActivityAction::FaceNotDetected, "Face not detected during check")
                    .await;
                self.emit(MonitorEvent::AlertRaised { at: now });
            }
        }
    }

    /// Leaves `Focusing`. Returns false when there was no focus session.
    pub(crate) async fn finish_focus(&self, state: &mut EngineState, reason: FocusEnd) -> bool {
        if state.phase != Phase::Focusing {
            return false;
        }
        let duration_minutes = state
            .focus
            .as_ref()
            .map(|run| run.anchor.duration_minutes)
            .unwrap_or_default();

        state.leave_phase();
        if let Err(err) = self.store.delete_focus_anchor(&self.session_id).await {
            log_error!(
                "failed to delete focus anchor for session {}: {err:#}",
                self.session_id
            );
        }
        self.clear_alert();
        self.record(ActivityAction::FocusEnd, "Ended focus session").await;

        match reason {
            FocusEnd::Expired => {
                log_info!("{}-minute focus session completed", duration_minutes);
                self.emit(MonitorEvent::FocusCompleted { duration_minutes });
            }
            FocusEnd::Stopped => log_info!("focus session stopped"),
        }
        true
    }
}
