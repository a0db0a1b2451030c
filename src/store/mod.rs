//! Persistence seams used by the monitor.
//!
//! [`AnchorStore`] is the durable anchor gateway and [`ActivityLog`] the
//! append-only event log. [`Database`] implements both for real use;
//! [`MemoryStore`] keeps everything in process.

mod memory;

pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::{ActivityLogEntry, BreakAnchor, Database, FocusAnchor};

#[async_trait]
pub trait AnchorStore: Send + Sync {
    async fn save_focus_anchor(&self, anchor: &FocusAnchor) -> Result<()>;
    async fn load_focus_anchor(&self, session_id: &str) -> Result<Option<FocusAnchor>>;
    async fn delete_focus_anchor(&self, session_id: &str) -> Result<()>;

    async fn save_break_anchor(&self, anchor: &BreakAnchor) -> Result<()>;
    async fn load_break_anchor(&self, session_id: &str) -> Result<Option<BreakAnchor>>;
    async fn delete_break_anchor(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<()>;
    async fn entries(&self, session_id: &str) -> Result<Vec<ActivityLogEntry>>;
}

#[async_trait]
impl AnchorStore for Database {
    async fn save_focus_anchor(&self, anchor: &FocusAnchor) -> Result<()> {
        Database::save_focus_anchor(self, anchor).await
    }

    async fn load_focus_anchor(&self, session_id: &str) -> Result<Option<FocusAnchor>> {
        self.get_focus_anchor(session_id).await
    }

    async fn delete_focus_anchor(&self, session_id: &str) -> Result<()> {
        Database::delete_focus_anchor(self, session_id).await
    }

    async fn save_break_anchor(&self, anchor: &BreakAnchor) -> Result<()> {
        Database::save_break_anchor(self, anchor).await
    }

    async fn load_break_anchor(&self, session_id: &str) -> Result<Option<BreakAnchor>> {
        self.get_break_anchor(session_id).await
    }

    async fn delete_break_anchor(&self, session_id: &str) -> Result<()> {
        Database::delete_break_anchor(self, session_id).await
    }
}

#[async_trait]
impl ActivityLog for Database {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<()> {
        self.append_activity(entry).await
    }

    async fn entries(&self, session_id: &str) -> Result<Vec<ActivityLogEntry>> {
        self.list_activity(session_id).await
    }
}
