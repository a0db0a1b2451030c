//! Durable wall-clock anchors.
//!
//! An anchor is the source of truth for a running countdown: the remaining
//! time is always recomputed from `start_time` and the duration, never from
//! how many ticks happened to fire.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Focus countdown anchor, serialised as
/// `{"startTime": "...", "duration": 25, "isActive": true}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusAnchor {
    #[serde(skip)]
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub is_active: bool,
}

impl FocusAnchor {
    pub fn new(session_id: impl Into<String>, start_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            session_id: session_id.into(),
            start_time,
            duration_minutes,
            is_active: true,
        }
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.duration_minutes) * 60
    }

    /// `max(0, duration*60 - (now - start))`. An anchor dated in the future
    /// (clock adjusted backwards) counts as zero elapsed time.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        let elapsed = (now - self.start_time).num_seconds().max(0) as u64;
        self.total_secs().saturating_sub(elapsed)
    }

    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        (now - self.start_time).num_seconds().max(0) as u64
    }
}

/// Break anchor, serialised as `{"startTime", "duration", "endTime"}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BreakAnchor {
    #[serde(skip)]
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(rename = "duration")]
    pub duration_minutes: u32,
    pub end_time: DateTime<Utc>,
}

impl BreakAnchor {
    pub fn new(session_id: impl Into<String>, start_time: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            session_id: session_id.into(),
            start_time,
            duration_minutes,
            end_time: start_time + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.end_time - now).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_document_shape() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let anchor = FocusAnchor::new("s1", start, 25);
        let json = serde_json::to_value(&anchor).unwrap();

        assert_eq!(json["startTime"], "2024-03-01T09:00:00Z");
        assert_eq!(json["duration"], 25);
        assert_eq!(json["isActive"], true);
        assert!(json.get("sessionId").is_none());
    }

    #[test]
    fn break_document_has_end_time() {
        let start = DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let anchor = BreakAnchor::new("s1", start, 20);
        let json = serde_json::to_value(&anchor).unwrap();
        assert_eq!(json["endTime"], "2024-03-01T09:20:00Z");
        assert_eq!(json["duration"], 20);
    }

    #[test]
    fn remaining_never_negative() {
        let now = Utc::now();
        let anchor = FocusAnchor::new("s1", now - Duration::minutes(90), 60);
        assert_eq!(anchor.remaining_secs(now), 0);
    }

    #[test]
    fn future_anchor_counts_no_elapsed_time() {
        let now = Utc::now();
        let anchor = FocusAnchor::new("s1", now + Duration::seconds(30), 1);
        assert_eq!(anchor.remaining_secs(now), 60);
    }
}
