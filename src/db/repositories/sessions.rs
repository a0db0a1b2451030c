use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, parse_optional_datetime},
    models::WorkSession,
    Database,
};

fn row_to_session(row: &Row) -> Result<WorkSession> {
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;

    Ok(WorkSession {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_optional_datetime(end_time, "end_time")?,
        is_active: row.get("is_active")?,
    })
}

impl Database {
    pub async fn create_session(&self, user_id: &str, started_at: DateTime<Utc>) -> Result<WorkSession> {
        let session = WorkSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            start_time: started_at,
            end_time: None,
            is_active: true,
        };
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, start_time, end_time, is_active)
                 VALUES (?1, ?2, ?3, NULL, 1)",
                params![record.id, record.user_id, record.start_time.to_rfc3339()],
            )?;
            Ok(())
        })
        .await?;
        Ok(session)
    }

    pub async fn get_active_session(&self, user_id: &str) -> Result<Option<WorkSession>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, start_time, end_time, is_active
                 FROM sessions
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY start_time DESC
                 LIMIT 1",
            )?;
            let session = stmt
                .query_row(params![user_id], |row| Ok(row_to_session(row)))
                .optional()?
                .transpose()?;
            Ok(session)
        })
        .await
    }

    pub async fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE sessions SET end_time = ?1, is_active = 0 WHERE id = ?2",
                params![ended_at.to_rfc3339(), session_id],
            )?;
            tx.execute(
                "DELETE FROM focus_anchors WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.execute(
                "DELETE FROM break_anchors WHERE session_id = ?1",
                params![session_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}
