//! Alarm overlay state machine: `Idle -> Raised -> Idle`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::audio::{AudioDevice, Tone};
use crate::settings::AlarmSettings;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    pub visible: bool,
    pub raised_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct AlertController {
    audio: AudioDevice,
    settings: AlarmSettings,
    state: Arc<Mutex<AlertState>>,
}

impl AlertController {
    pub fn new(audio: AudioDevice, settings: AlarmSettings) -> Self {
        Self {
            audio,
            settings,
            state: Arc::new(Mutex::new(AlertState::default())),
        }
    }

    /// Shows the overlay and starts the alarm. Raising while already raised
    /// restarts the tone rather than layering a second one.
    pub fn raise(&self, at: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.visible {
            self.audio.stop_tone(std::time::Duration::ZERO);
        }
        state.visible = true;
        state.raised_at = Some(at);

        let tone = Tone::Alarm {
            frequency_hz: self.settings.frequency_hz,
            volume: self.settings.volume,
            duration: self.settings.duration(),
        };
        // The overlay stays up even without sound.
        if let Err(err) = self.audio.play_tone(tone) {
            log_error!("failed to start alarm tone: {err:#}");
        }
        log_info!("presence alert raised");
    }

    /// Hides the overlay and fades the alarm out. Returns false when there
    /// was nothing to acknowledge.
    pub fn acknowledge(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.visible {
            return false;
        }
        state.visible = false;
        state.raised_at = None;
        self.audio.stop_tone(self.settings.fade());
        log_info!("presence alert acknowledged");
        true
    }

    pub fn is_visible(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible
    }

    pub fn state(&self) -> AlertState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn audio(&self) -> &AudioDevice {
        &self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingSink, SinkCall, ToneKind};
    use std::time::Duration;

    fn controller() -> (AlertController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let controller = AlertController::new(
            AudioDevice::new(sink.clone()),
            AlarmSettings::default(),
        );
        (controller, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn raise_then_acknowledge() {
        let (alert, sink) = controller();
        alert.raise(Utc::now());
        assert!(alert.is_visible());
        assert!(alert.audio().is_playing());

        assert!(alert.acknowledge());
        assert!(!alert.is_visible());
        assert!(!alert.audio().is_playing());
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Play(ToneKind::Alarm),
                SinkCall::FadeOut(Duration::from_millis(100)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn acknowledge_twice_is_a_no_op() {
        let (alert, sink) = controller();
        alert.raise(Utc::now());
        assert!(alert.acknowledge());
        assert!(!alert.acknowledge());
        assert_eq!(sink.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn raising_twice_does_not_stack_tones() {
        let (alert, sink) = controller();
        alert.raise(Utc::now());
        alert.raise(Utc::now());

        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::Play(ToneKind::Alarm),
                SinkCall::Stop,
                SinkCall::Play(ToneKind::Alarm),
            ]
        );
        assert_eq!(alert.audio().active_tone(), Some(ToneKind::Alarm));
    }

    #[tokio::test(start_paused = true)]
    async fn overlay_outlives_the_tone() {
        let (alert, _) = controller();
        alert.raise(Utc::now());
        tokio::time::advance(Duration::from_secs(31)).await;

        assert!(alert.is_visible());
        assert!(!alert.audio().is_playing());
        assert!(alert.acknowledge());
    }
}
