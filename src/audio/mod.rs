pub mod engine;
pub mod tones;

pub use engine::RodioSink;

use anyhow::Result;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, Clone, PartialEq)]
pub enum Tone {
    Alarm {
        frequency_hz: f32,
        volume: f32,
        duration: Duration,
    },
    Chime {
        volume: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ToneKind {
    Alarm,
    Chime,
}

impl Tone {
    pub fn kind(&self) -> ToneKind {
        match self {
            Tone::Alarm { .. } => ToneKind::Alarm,
            Tone::Chime { .. } => ToneKind::Chime,
        }
    }

    fn duration(&self) -> Duration {
        match self {
            Tone::Alarm { duration, .. } => *duration,
            Tone::Chime { .. } => Duration::from_millis(500),
        }
    }
}

/// Where tones actually go. [`RodioSink`] in production.
pub trait AudioSink: Send + Sync {
    /// Spins up the output so the first tone plays without setup latency.
    fn prepare(&self) -> Result<()>;
    /// Starts `tone`, replacing whatever the sink was playing.
    fn play(&self, tone: &Tone) -> Result<()>;
    fn fade_out(&self, fade: Duration) -> Result<()>;
    fn stop(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct ActiveTone {
    kind: ToneKind,
    ends_at: Instant,
}

/// The single tone slot shared by the alarm and the chime.
///
/// At most one tone is active; playing a new one stops the previous one
/// first. A tone stops counting as active once its bounded duration has
/// elapsed, even if nobody called `stop_tone`.
#[derive(Clone)]
pub struct AudioDevice {
    output: Arc<dyn AudioSink>,
    active: Arc<Mutex<Option<ActiveTone>>>,
}

impl AudioDevice {
    pub fn new(output: Arc<dyn AudioSink>) -> Self {
        Self {
            output,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn acquire(&self) -> Result<()> {
        self.output.prepare()
    }

    pub fn play_tone(&self, tone: Tone) -> Result<()> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            if previous.ends_at > Instant::now() {
                log_debug!("stopping {:?} tone before playing {:?}", previous.kind, tone.kind());
                if let Err(err) = self.output.stop() {
                    log_warn!("failed to stop {:?} tone: {err:#}", previous.kind);
                }
            }
        }

        self.output.play(&tone)?;
        *active = Some(ActiveTone {
            kind: tone.kind(),
            ends_at: Instant::now() + tone.duration(),
        });
        Ok(())
    }

    /// Fades out the active tone. Returns whether anything was playing.
    pub fn stop_tone(&self, fade: Duration) -> bool {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tone) = active.take() else {
            return false;
        };
        if tone.ends_at <= Instant::now() {
            return false;
        }

        let result = if fade.is_zero() {
            self.output.stop()
        } else {
            self.output.fade_out(fade)
        };
        if let Err(err) = result {
            log_warn!("failed to stop {:?} tone: {err:#}", tone.kind);
        }
        true
    }

    pub fn active_tone(&self) -> Option<ToneKind> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active
            .as_ref()
            .filter(|tone| tone.ends_at > Instant::now())
            .map(|tone| tone.kind)
    }

    pub fn is_playing(&self) -> bool {
        self.active_tone().is_some()
    }
}

/// Sink that records what it was asked to do. Used by unit and integration
/// tests in place of a sound card.
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Prepare,
    Play(ToneKind),
    FadeOut(Duration),
    Stop,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, call: SinkCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl AudioSink for RecordingSink {
    fn prepare(&self) -> Result<()> {
        self.push(SinkCall::Prepare);
        Ok(())
    }

    fn play(&self, tone: &Tone) -> Result<()> {
        self.push(SinkCall::Play(tone.kind()));
        Ok(())
    }

    fn fade_out(&self, fade: Duration) -> Result<()> {
        self.push(SinkCall::FadeOut(fade));
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.push(SinkCall::Stop);
        Ok(())
    }
}
