use anyhow::Result;
use rusqlite::{params, Row};

use crate::db::{
    helpers::parse_datetime,
    models::{ActivityAction, ActivityLogEntry},
    Database,
};

fn row_to_entry(row: &Row) -> Result<ActivityLogEntry> {
    let timestamp: String = row.get("timestamp")?;
    let action: String = row.get("action")?;

    Ok(ActivityLogEntry {
        session_id: row.get("session_id")?,
        timestamp: parse_datetime(&timestamp, "timestamp")?,
        action: ActivityAction::parse(&action)?,
        details: row.get("details")?,
    })
}

impl Database {
    pub async fn append_activity(&self, entry: &ActivityLogEntry) -> Result<()> {
        let record = entry.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO activity_logs (session_id, timestamp, action, details)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.session_id,
                    record.timestamp.to_rfc3339(),
                    record.action.as_str(),
                    record.details,
                ],
            )?;
            Ok(())
        })
        .await
    }

    /// Entries for a session in the order they were written.
    pub async fn list_activity(&self, session_id: &str) -> Result<Vec<ActivityLogEntry>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, timestamp, action, details
                 FROM activity_logs
                 WHERE session_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![session_id])?;
            let mut entries = Vec::new();
            while let Some(row) = rows.next()? {
                entries.push(row_to_entry(row)?);
            }
            Ok(entries)
        })
        .await
    }
}
