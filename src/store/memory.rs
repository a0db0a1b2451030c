use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, PoisonError,
};

use super::{ActivityLog, AnchorStore};
use crate::db::{ActivityLogEntry, BreakAnchor, FocusAnchor};

/// In-process anchors and log. Nothing survives the process, which makes it
/// the natural store for tests; `set_failing` simulates an unavailable
/// backend so degraded-mode behaviour can be exercised.
#[derive(Default)]
pub struct MemoryStore {
    focus: Mutex<HashMap<String, FocusAnchor>>,
    breaks: Mutex<HashMap<String, BreakAnchor>>,
    log: Mutex<Vec<ActivityLogEntry>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }

    /// Every entry across sessions, in append order.
    pub fn all_entries(&self) -> Vec<ActivityLogEntry> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn focus_anchor(&self, session_id: &str) -> Option<FocusAnchor> {
        self.focus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    pub fn break_anchor(&self, session_id: &str) -> Option<BreakAnchor> {
        self.breaks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }
}

#[async_trait]
impl AnchorStore for MemoryStore {
    async fn save_focus_anchor(&self, anchor: &FocusAnchor) -> Result<()> {
        self.check()?;
        self.focus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(anchor.session_id.clone(), anchor.clone());
        Ok(())
    }

    async fn load_focus_anchor(&self, session_id: &str) -> Result<Option<FocusAnchor>> {
        self.check()?;
        Ok(self.focus_anchor(session_id))
    }

    async fn delete_focus_anchor(&self, session_id: &str) -> Result<()> {
        self.check()?;
        self.focus
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        Ok(())
    }

    async fn save_break_anchor(&self, anchor: &BreakAnchor) -> Result<()> {
        self.check()?;
        self.breaks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(anchor.session_id.clone(), anchor.clone());
        Ok(())
    }

    async fn load_break_anchor(&self, session_id: &str) -> Result<Option<BreakAnchor>> {
        self.check()?;
        Ok(self.break_anchor(session_id))
    }

    async fn delete_break_anchor(&self, session_id: &str) -> Result<()> {
        self.check()?;
        self.breaks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        Ok(())
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<()> {
        self.check()?;
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }

    async fn entries(&self, session_id: &str) -> Result<Vec<ActivityLogEntry>> {
        self.check()?;
        Ok(self
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.session_id == session_id)
            .cloned()
            .collect())
    }
}
