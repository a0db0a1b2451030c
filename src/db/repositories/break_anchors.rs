use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    helpers::{parse_datetime, to_u32},
    models::BreakAnchor,
    Database,
};

fn row_to_anchor(row: &Row) -> Result<BreakAnchor> {
    let start_time: String = row.get("start_time")?;
    let end_time: String = row.get("end_time")?;
    let duration_minutes: i64 = row.get("duration_minutes")?;

    Ok(BreakAnchor {
        session_id: row.get("session_id")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        duration_minutes: to_u32(duration_minutes, "duration_minutes")?,
        end_time: parse_datetime(&end_time, "end_time")?,
    })
}

impl Database {
    pub async fn save_break_anchor(&self, anchor: &BreakAnchor) -> Result<()> {
        let record = anchor.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO break_anchors (session_id, start_time, duration_minutes, end_time)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(session_id) DO UPDATE SET
                     start_time = excluded.start_time,
                     duration_minutes = excluded.duration_minutes,
                     end_time = excluded.end_time",
                params![
                    record.session_id,
                    record.start_time.to_rfc3339(),
                    i64::from(record.duration_minutes),
                    record.end_time.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_break_anchor(&self, session_id: &str) -> Result<Option<BreakAnchor>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, start_time, duration_minutes, end_time
                 FROM break_anchors
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

    pub async fn delete_break_anchor(&self, session_id: &str) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "DELETE FROM break_anchors WHERE session_id = ?1",
                params![session_id],
            )?;
            Ok(())
        })
        .await
    }
}
