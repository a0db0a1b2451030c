use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::detection::{CameraSettings, DetectionConfig};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PresenceSettings {
    pub check_interval_secs: u32,
    /// Upper bound on a single `detect` call before it is treated as present.
    pub check_timeout_secs: u64,
    pub detection: DetectionConfig,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            check_timeout_secs: 20,
            detection: DetectionConfig::default(),
        }
    }
}

impl PresenceSettings {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AlarmSettings {
    pub duration_secs: u64,
    pub fade_ms: u64,
    pub frequency_hz: f32,
    pub volume: f32,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            fade_ms: 100,
            frequency_hz: 200.0,
            volume: 0.5,
        }
    }
}

impl AlarmSettings {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChimeSettings {
    pub enabled: bool,
    pub interval_mins: u32,
    pub volume: f32,
}

impl Default for ChimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_mins: 15,
            volume: 0.3,
        }
    }
}

impl ChimeSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_mins) * 60)
    }
}

/// Everything the monitor needs that a user or operator may tune.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorSettings {
    pub default_focus_minutes: u32,
    pub default_break_minutes: u32,
    pub presence: PresenceSettings,
    pub camera: CameraSettings,
    pub alarm: AlarmSettings,
    pub chime: ChimeSettings,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            default_focus_minutes: 60,
            default_break_minutes: 20,
            presence: PresenceSettings::default(),
            camera: CameraSettings::default(),
            alarm: AlarmSettings::default(),
            chime: ChimeSettings::default(),
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.default_focus_minutes == 0 || self.default_break_minutes == 0 {
            bail!("default focus and break durations must be greater than zero");
        }
        if self.presence.check_interval_secs == 0 {
            bail!("presence check interval must be greater than zero");
        }
        if self.presence.check_timeout_secs == 0 {
            bail!("presence check timeout must be greater than zero");
        }
        if self.presence.detection.sample_count == 0 {
            bail!("detector sample count must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.presence.detection.confidence_threshold) {
            bail!(
                "confidence threshold {} is outside 0.0..=1.0",
                self.presence.detection.confidence_threshold
            );
        }
        if self.alarm.duration_secs == 0 {
            bail!("alarm duration must be greater than zero");
        }
        if self.chime.enabled && self.chime.interval_mins == 0 {
            bail!("chime interval must be greater than zero when chimes are enabled");
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<MonitorSettings>(&contents) {
                Ok(parsed) if parsed.validate().is_ok() => parsed,
                Ok(_) | Err(_) => {
                    log_warn!(
                        "Ignoring invalid settings at {}; using defaults",
                        path.display()
                    );
                    MonitorSettings::default()
                }
            }
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> MonitorSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the settings after validating them. Running sessions keep the
    /// values they started with; the next session picks the update up.
    pub fn update(&self, settings: MonitorSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: MonitorSettings = serde_json::from_str(&contents)?;
        data.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = data;
        Ok(())
    }

    fn persist(&self, data: &MonitorSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.current();
        assert_eq!(settings.presence.check_interval_secs, 60);
        assert_eq!(settings.alarm.duration_secs, 30);
        assert_eq!(settings.chime.interval_mins, 15);
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = store.current();
        settings.presence.check_interval_secs = 300;
        settings.alarm.duration_secs = 10;
        store.update(settings.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.current(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"presence":{"checkIntervalSecs":120}}"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert_eq!(settings.presence.check_interval_secs, 120);
        assert_eq!(settings.presence.check_timeout_secs, 20);
        assert_eq!(settings.default_focus_minutes, 60);
    }

    #[test]
    fn rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let mut settings = store.current();
        settings.presence.check_interval_secs = 0;
        assert!(store.update(settings).is_err());
        assert_eq!(store.current().presence.check_interval_secs, 60);
    }
}
