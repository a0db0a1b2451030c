pub mod alert;
pub mod audio;
pub mod breaks;
pub mod clock;
pub mod db;
pub mod detection;
pub mod monitor;
pub mod presence;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod timer;
mod utils;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio::sync::Mutex;

pub use alert::{AlertController, AlertState};
pub use audio::{AudioDevice, AudioSink, RecordingSink, RodioSink, SinkCall, Tone, ToneKind};
pub use breaks::BreakController;
pub use clock::{Clock, RuntimeClock, SystemClock};
pub use db::{ActivityAction, ActivityLogEntry, BreakAnchor, Database, FocusAnchor, WorkSession};
pub use detection::{CameraDetector, DetectionConfig, DetectionResult, Detector};
pub use monitor::{CountdownSnapshot, FocusMonitor, MonitorEvent, MonitorParts, MonitorSnapshot};
pub use settings::{MonitorSettings, SettingsStore};
pub use store::{ActivityLog, AnchorStore, MemoryStore};
pub use timer::{dispatch, dispatch_json, Command, Phase, SessionClock};

const ENABLE_LOGS: bool = true;

/// Installs the `env_logger` backend. `RUST_LOG` is honoured; otherwise the
/// level is Info, or Debug when `FOCUSGUARD_DEBUG` is set.
pub fn init_logging() {
    let debug_mode = std::env::var("FOCUSGUARD_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Process-level wiring: storage, settings, audio output and the detector,
/// plus the work session the monitor runs under.
pub struct FocusApp {
    db: Database,
    settings: SettingsStore,
    audio: AudioDevice,
    detector: Arc<dyn Detector>,
    clock: Arc<dyn Clock>,
    monitor: Mutex<Option<FocusMonitor>>,
}

impl FocusApp {
    /// Opens (or creates) the database and settings under `data_dir` and
    /// plays tones through the default output device.
    pub fn open(data_dir: &Path, detector: Arc<dyn Detector>) -> Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let db = Database::new(data_dir.join("focusguard.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let audio = AudioDevice::new(Arc::new(RodioSink::new()));

        Ok(Self::with_parts(db, settings, audio, detector, Arc::new(SystemClock)))
    }

    pub fn with_parts(
        db: Database,
        settings: SettingsStore,
        audio: AudioDevice,
        detector: Arc<dyn Detector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            settings,
            audio,
            detector,
            clock,
            monitor: Mutex::new(None),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Attaches to the user's active work session, creating one if needed,
    /// and resumes whatever countdown its anchors describe.
    pub async fn begin_session(&self, user_id: &str) -> Result<FocusMonitor> {
        let mut slot = self.monitor.lock().await;
        if let Some(monitor) = slot.as_ref() {
            return Ok(monitor.clone());
        }

        let session = match self.db.get_active_session(user_id).await? {
            Some(session) => {
                log_info!("Reattaching to work session {}", session.id);
                session
            }
            None => {
                let session = self.db.create_session(user_id, self.clock.now()).await?;
                self.db
                    .append_activity(&ActivityLogEntry::new(
                        &session.id,
                        self.clock.now(),
                        ActivityAction::SessionStart,
                        "Started work session",
                    ))
                    .await?;
                log_info!("Started work session {}", session.id);
                session
            }
        };

        let monitor = FocusMonitor::new(MonitorParts {
            session_id: session.id,
            store: Arc::new(self.db.clone()),
            activity: Arc::new(self.db.clone()),
            clock: self.clock.clone(),
            detector: self.detector.clone(),
            audio: self.audio.clone(),
            settings: self.settings.current(),
        });
        monitor.resume_on_load().await;

        *slot = Some(monitor.clone());
        Ok(monitor)
    }

    /// Stops any focus session or break and closes the work session.
    pub async fn end_session(&self) -> Result<()> {
        let monitor = self
            .monitor
            .lock()
            .await
            .take()
            .ok_or_else(|| anyhow!("no active work session"))?;

        monitor.shutdown().await;

        let session_id = monitor.session_id().to_string();
        self.db
            .append_activity(&ActivityLogEntry::new(
                &session_id,
                self.clock.now(),
                ActivityAction::SessionEnd,
                "Ended work session",
            ))
            .await?;
        self.db.end_session(&session_id, self.clock.now()).await?;
        log_info!("Ended work session {}", session_id);
        Ok(())
    }

    pub async fn monitor(&self) -> Option<FocusMonitor> {
        self.monitor.lock().await.clone()
    }

    /// Records an event raised outside the monitor, such as task edits.
    pub async fn log_activity(&self, action: ActivityAction, details: &str) -> Result<()> {
        let monitor = self
            .monitor()
            .await
            .ok_or_else(|| anyhow!("no active work session"))?;
        self.db
            .append_activity(&ActivityLogEntry::new(
                monitor.session_id(),
                self.clock.now(),
                action,
                details,
            ))
            .await
    }

    pub async fn activity(&self) -> Result<Vec<ActivityLogEntry>> {
        match self.monitor().await {
            Some(monitor) => monitor.activity().await,
            None => Ok(Vec::new()),
        }
    }
}
