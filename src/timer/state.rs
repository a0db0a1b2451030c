use serde::{Deserialize, Serialize};

use crate::db::{BreakAnchor, FocusAnchor};
use crate::presence::PresenceScheduler;
use crate::tasks::TaskGroup;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Focusing,
    OnBreak,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

#[derive(Debug, Clone)]
pub struct FocusRun {
    pub anchor: FocusAnchor,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone)]
pub struct BreakRun {
    pub anchor: BreakAnchor,
    pub remaining_secs: u64,
}

/// Everything the monitor mutates, behind one async mutex.
///
/// `epoch` increases on every phase change. Background tasks capture the
/// epoch they were spawned in and go inert once it moves on.
pub struct EngineState {
    pub phase: Phase,
    pub epoch: u64,
    pub focus: Option<FocusRun>,
    pub on_break: Option<BreakRun>,
    pub presence: Option<PresenceScheduler>,
    pub tasks: TaskGroup,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            epoch: 0,
            focus: None,
            on_break: None,
            presence: None,
            tasks: TaskGroup::new("monitor"),
        }
    }

    /// Cancels the current phase's tasks and returns to `Idle`.
    pub fn leave_phase(&mut self) {
        self.tasks.cancel_all();
        self.epoch += 1;
        self.phase = Phase::Idle;
        self.focus = None;
        self.on_break = None;
        self.presence = None;
    }

    pub fn is_current(&self, epoch: u64, phase: Phase) -> bool {
        self.epoch == epoch && self.phase == phase
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}
