use serde::{Deserialize, Serialize};

use crate::monitor::{FocusMonitor, MonitorSnapshot};

/// UI commands, e.g. `{"command":"start","durationMinutes":25}`.
///
/// A missing `durationMinutes` falls back to the configured default length.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    Start {
        #[serde(default)]
        duration_minutes: Option<u32>,
    },
    Stop,
    #[serde(rename_all = "camelCase")]
    ScheduleBreak {
        #[serde(default)]
        duration_minutes: Option<u32>,
    },
    EndBreakEarly,
    AcknowledgeAlert,
    GetState,
}

pub async fn dispatch(monitor: &FocusMonitor, command: Command) -> Result<MonitorSnapshot, String> {
    let defaults = monitor.settings();
    match command {
        Command::Start { duration_minutes } => monitor
            .start_focus(duration_minutes.unwrap_or(defaults.default_focus_minutes))
            .await
            .map_err(|e| e.to_string()),
        Command::Stop => Ok(monitor.stop_focus().await),
        Command::ScheduleBreak { duration_minutes } => monitor
            .schedule_break(duration_minutes.unwrap_or(defaults.default_break_minutes))
            .await
            .map_err(|e| e.to_string()),
        Command::EndBreakEarly => Ok(monitor.end_break_early().await),
        Command::AcknowledgeAlert => Ok(monitor.acknowledge_alert().await),
        Command::GetState => Ok(monitor.snapshot().await),
    }
}

/// Parses and runs one JSON-encoded command.
pub async fn dispatch_json(monitor: &FocusMonitor, raw: &str) -> Result<MonitorSnapshot, String> {
    let command: Command =
        serde_json::from_str(raw).map_err(|e| format!("invalid command: {e}"))?;
    dispatch(monitor, command).await
}
