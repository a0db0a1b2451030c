//! Presence detection boundary.
//!
//! The monitor only ever talks to [`Detector`]. [`CameraDetector`] is the
//! production implementation that drives a camera and a face model; tests
//! substitute scripted detectors.

pub mod camera;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use camera::{CameraDetector, CameraStream, FaceModel, Frame, FrameSource};

/// Sensitivity knobs forwarded to the detector on every check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    pub sample_count: u32,
    pub sample_interval_ms: u64,
    pub confidence_threshold: f32,
    /// Square input size the face model resizes frames to.
    pub input_resolution: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_count: 3,
            sample_interval_ms: 500,
            confidence_threshold: 0.1,
            input_resolution: 416,
        }
    }
}

impl DetectionConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub ready_poll_limit: u32,
    pub ready_poll_interval_ms: u64,
    /// Exposure settle time between the stream becoming ready and sampling.
    pub warmup_ms: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            ready_poll_limit: 50,
            ready_poll_interval_ms: 100,
            warmup_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DetectionStatus {
    /// The model ran and produced `confidence`.
    Measured,
    /// Infrastructure failed; `detected` was forced to true.
    FailOpen { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub detected: bool,
    pub confidence: f32,
    #[serde(skip)]
    pub status: DetectionStatus,
}

impl Default for DetectionStatus {
    fn default() -> Self {
        DetectionStatus::Measured
    }
}

impl DetectionResult {
    pub fn measured(confidence: f32, threshold: f32) -> Self {
        Self {
            detected: confidence > threshold,
            confidence,
            status: DetectionStatus::Measured,
        }
    }

    pub fn fail_open(reason: impl Into<String>) -> Self {
        Self {
            detected: true,
            confidence: 0.0,
            status: DetectionStatus::FailOpen {
                reason: reason.into(),
            },
        }
    }

    pub fn is_fail_open(&self) -> bool {
        matches!(self.status, DetectionStatus::FailOpen { .. })
    }
}

/// A presence check. Implementations own whatever device they use for the
/// duration of one call and must release it before returning or when the
/// returned future is dropped.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, config: &DetectionConfig) -> Result<DetectionResult>;
}
