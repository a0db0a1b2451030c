//! Presence check scheduling.
//!
//! [`PresenceScheduler`] is the synchronous half: it counts down the check
//! interval on the shared 1 Hz tick and decides when a check may start. The
//! asynchronous half, running one `detect` call, lives in [`worker`].

pub mod worker;

use serde::Serialize;

use crate::settings::PresenceSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Identifies one check. `epoch` is the focus run the check was started
/// for; a result whose epoch no longer matches is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTicket {
    pub epoch: u64,
    pub check_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalDecision {
    /// Start a detector call for this ticket.
    Begin(CheckTicket),
    /// A check was still running; count this interval as present.
    FailOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Present,
    Absent,
    /// The result does not belong to the check currently in flight.
    Stale,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceTimerState {
    pub seconds_until_next_check: u32,
    pub in_flight: bool,
}

#[derive(Debug, Clone)]
pub struct PresenceScheduler {
    interval_secs: u32,
    epoch: u64,
    seconds_until_next_check: u32,
    in_flight: Option<u64>,
    next_check_id: u64,
}

impl PresenceScheduler {
    pub fn new(settings: &PresenceSettings, epoch: u64) -> Self {
        let interval_secs = settings.check_interval_secs.max(1);
        Self {
            interval_secs,
            epoch,
            seconds_until_next_check: interval_secs,
            in_flight: None,
            next_check_id: 1,
        }
    }

    pub fn state(&self) -> PresenceTimerState {
        PresenceTimerState {
            seconds_until_next_check: self.seconds_until_next_check,
            in_flight: self.in_flight.is_some(),
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Advances the countdown by one second and fires the interval when it
    /// reaches zero.
    pub fn tick(&mut self) -> Option<IntervalDecision> {
        self.seconds_until_next_check = self.seconds_until_next_check.saturating_sub(1);
        if self.seconds_until_next_check == 0 {
            Some(self.on_interval_elapsed())
        } else {
            None
        }
    }

    /// Never stacks checks: with one in flight the interval is reported as
    /// present and the countdown restarts.
    pub fn on_interval_elapsed(&mut self) -> IntervalDecision {
        self.seconds_until_next_check = self.interval_secs;

        if let Some(check_id) = self.in_flight {
            log_warn!(
                "presence check {} still running after {}s; treating interval as present",
                check_id,
                self.interval_secs
            );
            return IntervalDecision::FailOpen;
        }

        let check_id = self.next_check_id;
        self.next_check_id += 1;
        self.in_flight = Some(check_id);
        log_debug!("starting presence check {} (epoch {})", check_id, self.epoch);
        IntervalDecision::Begin(CheckTicket {
            epoch: self.epoch,
            check_id,
        })
    }

    /// Completes the in-flight check. Results for any other ticket are
    /// reported as [`Verdict::Stale`] and leave the scheduler untouched.
    pub fn on_detect_result(&mut self, ticket: CheckTicket, detected: bool) -> Verdict {
        if ticket.epoch != self.epoch || self.in_flight != Some(ticket.check_id) {
            return Verdict::Stale;
        }
        self.in_flight = None;
        self.seconds_until_next_check = self.interval_secs;
        if detected {
            Verdict::Present
        } else {
            Verdict::Absent
        }
    }
}
