#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use focusguard::{
    ActivityAction, AudioDevice, DetectionConfig, DetectionResult, Detector, FocusMonitor,
    MemoryStore, MonitorParts, MonitorSettings, RecordingSink, RuntimeClock,
};

pub const SESSION: &str = "session-1";

/// What a scripted detector call does.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Present,
    Absent,
    Fail,
}

/// Detector that replays `script` (repeating the last outcome) after
/// `delay`, and tracks how many calls overlap.
pub struct ScriptedDetector {
    script: Mutex<VecDeque<Outcome>>,
    last: Mutex<Outcome>,
    delay: Duration,
    calls: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedDetector {
    pub fn new(script: Vec<Outcome>, delay: Duration) -> Arc<Self> {
        let last = script.last().copied().unwrap_or(Outcome::Present);
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            delay,
            calls: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn always(outcome: Outcome) -> Arc<Self> {
        Self::new(vec![outcome], Duration::ZERO)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next(&self) -> Outcome {
        let mut script = self.script.lock().unwrap();
        match script.pop_front() {
            Some(outcome) => {
                *self.last.lock().unwrap() = outcome;
                outcome
            }
            None => *self.last.lock().unwrap(),
        }
    }
}

#[async_trait]
impl Detector for ScriptedDetector {
    async fn detect(&self, config: &DetectionConfig) -> Result<DetectionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(self.active.clone());

        let outcome = self.next();
        tokio::time::sleep(self.delay).await;
        match outcome {
            Outcome::Present => Ok(DetectionResult::measured(0.9, config.confidence_threshold)),
            Outcome::Absent => Ok(DetectionResult::measured(0.02, config.confidence_threshold)),
            Outcome::Fail => bail!("camera busy"),
        }
    }
}

pub struct Harness {
    pub monitor: FocusMonitor,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub clock: Arc<RuntimeClock>,
}

impl Harness {
    pub fn actions(&self) -> Vec<ActivityAction> {
        self.store
            .all_entries()
            .into_iter()
            .map(|entry| entry.action)
            .collect()
    }

    pub fn count(&self, action: ActivityAction) -> usize {
        self.actions().into_iter().filter(|a| *a == action).count()
    }
}

/// Settings with chimes off so tests only see the tones they ask for.
pub fn quiet_settings() -> MonitorSettings {
    let mut settings = MonitorSettings::default();
    settings.chime.enabled = false;
    settings
}

/// Must be called inside a paused-clock runtime.
pub fn harness(detector: Arc<dyn Detector>, settings: MonitorSettings) -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()), detector, settings)
}

pub fn harness_with_store(
    store: Arc<MemoryStore>,
    detector: Arc<dyn Detector>,
    settings: MonitorSettings,
) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let clock = Arc::new(RuntimeClock::new(Utc::now()));
    let monitor = FocusMonitor::new(MonitorParts {
        session_id: SESSION.to_string(),
        store: store.clone(),
        activity: store.clone(),
        clock: clock.clone(),
        detector,
        audio: AudioDevice::new(sink.clone()),
        settings,
    });
    Harness {
        monitor,
        store,
        sink,
        clock,
    }
}

pub async fn advance_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}
