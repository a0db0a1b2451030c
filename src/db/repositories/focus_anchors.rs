use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, to_u32},
    models::FocusAnchor,
    Database,
};

fn row_to_anchor(row: &Row) -> Result<FocusAnchor> {
    let start_time: String = row.get("start_time")?;
    let duration_minutes: i64 = row.get("duration_minutes")?;
    let is_active: bool = row.get("is_active")?;

    Ok(FocusAnchor {
        session_id: row.get("session_id")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        duration_minutes: to_u32(duration_minutes, "duration_minutes")?,
        is_active,
    })
}

impl Database {
    /// Writes the session's focus anchor, replacing any previous one.
    pub async fn save_focus_anchor(&self, anchor: &FocusAnchor) -> Result<()> {
        let record = anchor.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO focus_anchors (session_id, start_time, duration_minutes, is_active)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO UPDATE SET
                     start_time = excluded.start_time,
                     duration_minutes = excluded.duration_minutes,
                     is_active = excluded.is_active",
                params![
                    record.session_id,
                    record.start_time.to_rfc3339(),
                    i64::from(record.duration_minutes),
                    record.is_active,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_focus_anchor(&self, session_id: &str) -> Result<Option<FocusAnchor>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, start_time, duration_minutes, is_active
                 FROM focus_anchors
                 WHERE session_id = ?1",
            )?;
            let anchor = stmt
                .query_row(params![session_id], |row| Ok(row_to_anchor(row)))
                .optional()?
                .transpose()?;
            Ok(anchor)
        })
        .await
    }

    pub async fn delete_focus_anchor(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM focus_anchors WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(())
        })
        .await
    }
}
