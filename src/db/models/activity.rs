use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    SessionStart,
    SessionEnd,
    TaskCreated,
    TaskCompleted,
    TaskDeleted,
    TaskUpdated,
    BreakStart,
    BreakEnd,
    FocusStart,
    FocusEnd,
    FaceNotDetected,
    FocusChime,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::SessionStart => "session_start",
            ActivityAction::SessionEnd => "session_end",
            ActivityAction::TaskCreated => "task_created",
            ActivityAction::TaskCompleted => "task_completed",
            ActivityAction::TaskDeleted => "task_deleted",
            ActivityAction::TaskUpdated => "task_updated",
            ActivityAction::BreakStart => "break_start",
            ActivityAction::BreakEnd => "break_end",
            ActivityAction::FocusStart => "focus_start",
            ActivityAction::FocusEnd => "focus_end",
            ActivityAction::FaceNotDetected => "face_not_detected",
            ActivityAction::FocusChime => "focus_chime",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Ok(match value {
            "session_start" => ActivityAction::SessionStart,
            "session_end" => ActivityAction::SessionEnd,
            "task_created" => ActivityAction::TaskCreated,
            "task_completed" => ActivityAction::TaskCompleted,
            "task_deleted" => ActivityAction::TaskDeleted,
            "task_updated" => ActivityAction::TaskUpdated,
            "break_start" => ActivityAction::BreakStart,
            "break_end" => ActivityAction::BreakEnd,
            "focus_start" => ActivityAction::FocusStart,
            "focus_end" => ActivityAction::FocusEnd,
            "face_not_detected" => ActivityAction::FaceNotDetected,
            "focus_chime" => ActivityAction::FocusChime,
            other => return Err(anyhow!("unknown activity action {other}")),
        })
    }
}

/// One immutable line of the session's activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    #[serde(skip)]
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ActivityAction,
    pub details: String,
}

impl ActivityLogEntry {
    pub fn new(
        session_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        action: ActivityAction,
        details: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp,
            action,
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_matches_as_str() {
        for action in [
            ActivityAction::SessionStart,
            ActivityAction::FocusEnd,
            ActivityAction::FaceNotDetected,
            ActivityAction::FocusChime,
        ] {
            let json = serde_json::to_value(action).unwrap();
            assert_eq!(json, action.as_str());
            assert_eq!(ActivityAction::parse(action.as_str()).unwrap(), action);
        }
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(ActivityAction::parse("focus_paused").is_err());
    }
}
