//! Scheduled breaks. A break suspends focusing; when it ends the monitor
//! returns to `Idle` and the user starts the next focus session explicitly.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::{
    db::{ActivityAction, BreakAnchor},
    monitor::{MonitorCore, MonitorEvent, MonitorSnapshot},
    timer::{BreakRun, EngineState, FocusEnd, Phase},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct BreakController {
    core: Arc<MonitorCore>,
}

impl BreakController {
    pub(crate) fn new(core: Arc<MonitorCore>) -> Self {
        Self { core }
    }

    /// Starts a break, stopping a running focus session first.
    pub async fn start(&self, duration_minutes: u32) -> Result<MonitorSnapshot> {
        let core = &self.core;
        let mut state = core.state.lock().await;

        if duration_minutes == 0 {
            bail!("break duration must be greater than zero");
        }
        if state.phase == Phase::OnBreak {
            bail!("a break is already running");
        }

        core.finish_focus(&mut state, FocusEnd::Stopped).await;

        let now = core.clock.now();
        let anchor = BreakAnchor::new(&core.session_id, now, duration_minutes);
        if let Err(err) = core.store.save_break_anchor(&anchor).await {
            log_error!(
                "failed to persist break anchor for session {}; continuing without it: {err:#}",
                core.session_id
            );
        }

        core.enter_break(&mut state, anchor, now);
        core.record(
            ActivityAction::BreakStart,
            format!("Started {duration_minutes}-minute break"),
        )
        .await;
        log_info!("Started {}-minute break", duration_minutes);

        Ok(core.emit_state(&state))
    }

    /// Ends the break early. Calling it while not on break changes nothing.
    pub async fn end(&self) -> MonitorSnapshot {
        let core = &self.core;
        let mut state = core.state.lock().await;
        if core.finish_break(&mut state, false).await {
            core.emit_state(&state)
        } else {
            core.snapshot_locked(&state)
        }
    }

    pub async fn resume_on_load(&self) -> MonitorSnapshot {
        let mut state = self.core.state.lock().await;
        if state.phase == Phase::Idle {
            if let Err(err) = self.resume_locked(&mut state).await {
                log_error!("{err:#}");
            }
        }
        self.core.emit_state(&state)
    }

    /// Returns whether a break was resumed. An elapsed anchor is removed.
    /// Fails only when the stored anchor could not be read.
    pub(crate) async fn resume_locked(&self, state: &mut EngineState) -> Result<bool> {
        let core = &self.core;
        let loaded = core
            .store
            .load_break_anchor(&core.session_id)
            .await
            .with_context(|| {
                format!("failed to load break anchor for session {}", core.session_id)
            })?;
        let Some(anchor) = loaded else {
            return Ok(false);
        };

        let now = core.clock.now();
        if anchor.remaining_secs(now) == 0 {
            log_debug!("discarding elapsed break anchor for session {}", core.session_id);
            if let Err(err) = core.store.delete_break_anchor(&core.session_id).await {
                log_error!("failed to delete elapsed break anchor: {err:#}");
            }
            return Ok(false);
        }

        core.enter_break(state, anchor, now);
        Ok(true)
    }

    pub async fn remaining_secs(&self) -> Option<u64> {
        let state = self.core.state.lock().await;
        state.on_break.as_ref().map(|run| run.remaining_secs)
    }
}

impl MonitorCore {
    fn enter_break(self: &Arc<Self>, state: &mut EngineState, anchor: BreakAnchor, now: DateTime<Utc>) {
        state.tasks.cancel_all();
        state.epoch += 1;
        let epoch = state.epoch;

        state.phase = Phase::OnBreak;
        state.on_break = Some(BreakRun {
            remaining_secs: anchor.remaining_secs(now),
            anchor,
        });

        let core = Arc::clone(self);
        let token = state.tasks.token();
        state.tasks.spawn("break-tick", async move {
            let mut ticker = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !core.on_break_tick(epoch).await {
                            break;
                        }
                    }
                }
            }
        });
    }

    async fn on_break_tick(&self, epoch: u64) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_current(epoch, Phase::OnBreak) {
            return false;
        }

        let now = self.clock.now();
        let remaining = match state.on_break.as_mut() {
            Some(run) => {
                run.remaining_secs = run.anchor.remaining_secs(now);
                run.remaining_secs
            }
            None => return false,
        };

        if remaining == 0 {
            self.finish_break(&mut state, true).await;
            self.emit_state(&state);
            return false;
        }

        self.emit(MonitorEvent::Tick {
            snapshot: self.snapshot_locked(&state),
        });
        true
    }

    async fn finish_break(&self, state: &mut EngineState, completed: bool) -> bool {
        if state.phase != Phase::OnBreak {
            return false;
        }
        let duration_minutes = state
            .on_break
            .as_ref()
            .map(|run| run.anchor.duration_minutes)
            .unwrap_or_default();

        state.leave_phase();
        if let Err(err) = self.store.delete_break_anchor(&self.session_id).await {
            log_error!(
                "failed to delete break anchor for session {}: {err:#}",
                self.session_id
            );
        }
        self.record(ActivityAction::BreakEnd, "Break ended").await;
        log_info!("Break ended");

        if completed {
            self.emit(MonitorEvent::BreakCompleted { duration_minutes });
        }
        true
    }
}
