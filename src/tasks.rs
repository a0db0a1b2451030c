//! Named, cancellable background tasks that belong to one top-level state.
//!
//! Entering a state spawns its tasks into a fresh group; leaving it calls
//! [`TaskGroup::cancel_all`], which cancels every member through one shared
//! token. Cancellation is cooperative: tasks select on their token, so a
//! task may cancel its own group (a tick expiring the session) and still
//! finish the transition it is in the middle of.

use std::collections::HashMap;
use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub struct TaskGroup {
    label: &'static str,
    token: CancellationToken,
    handles: HashMap<&'static str, JoinHandle<()>>,
}

impl TaskGroup {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            token: CancellationToken::new(),
            handles: HashMap::new(),
        }
    }

    /// Token a task passed to [`spawn`](Self::spawn) should select on.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Spawns `fut` under `name`. A still-running task with the same name is
    /// cancelled first; names are unique within a group.
    pub fn spawn<F>(&mut self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.handles.remove(name) {
            if !previous.is_finished() {
                log_debug!("{}: replacing running task {}", self.label, name);
                previous.abort();
            }
        }
        self.handles.insert(name, tokio::spawn(fut));
    }

    pub fn running(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .handles
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    /// Cancels every task in the group and resets it for the next state.
    pub fn cancel_all(&mut self) {
        if !self.handles.is_empty() {
            log_debug!("{}: cancelling {:?}", self.label, self.running());
        }
        self.token.cancel();
        self.handles.clear();
        self.token = CancellationToken::new();
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn cancel_all_stops_every_member() {
        let ticks = Arc::new(AtomicU32::new(0));
        let mut group = TaskGroup::new("test");

        for name in ["a", "b"] {
            let token = group.token();
            let ticks = ticks.clone();
            group.spawn(name, async move {
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                loop {
                    tokio::select! {
                        _ = interval.tick() => { ticks.fetch_add(1, Ordering::SeqCst); }
                        _ = token.cancelled() => break,
                    }
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let before = ticks.load(Ordering::SeqCst);
        assert_eq!(before, 6);
        assert_eq!(group.running(), vec!["a", "b"]);

        group.cancel_all();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), before);
        assert!(group.running().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_issued_after_cancel_are_fresh() {
        let mut group = TaskGroup::new("test");
        let old = group.token();
        group.cancel_all();
        let new = group.token();
        assert!(old.is_cancelled());
        assert!(!new.is_cancelled());
    }
}
