use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{self, Duration, Instant};

use super::{CameraSettings, DetectionConfig, DetectionResult, Detector};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Opens exclusive camera streams.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn open(&self, width: u32, height: u32) -> Result<Box<dyn CameraStream>>;
}

/// One acquired camera stream. `release` stops the underlying tracks; the
/// detector guarantees it is called exactly once per opened stream.
#[async_trait]
pub trait CameraStream: Send {
    fn is_ready(&self) -> bool;
    async fn capture(&mut self) -> Result<Frame>;
    fn release(&mut self);
}

/// Black-box face model: confidence scores for every face found in `frame`.
#[async_trait]
pub trait FaceModel: Send + Sync {
    async fn detect_faces(&self, frame: &Frame, input_size: u32) -> Result<Vec<f32>>;
}

/// Owns a stream and releases it on the first of `release()` or drop.
///
/// Dropping covers the paths the detector cannot see: the caller's timeout
/// dropping the future mid-sample, or a panic while sampling.
struct StreamGuard {
    stream: Option<Box<dyn CameraStream>>,
}

impl StreamGuard {
    fn new(stream: Box<dyn CameraStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    fn stream(&mut self) -> Result<&mut Box<dyn CameraStream>> {
        self.stream
            .as_mut()
            .ok_or_else(|| anyhow!("camera stream already released"))
    }

    fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            log_debug!("camera stream released");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct CameraDetector {
    source: Arc<dyn FrameSource>,
    model: Arc<dyn FaceModel>,
    camera: CameraSettings,
}

impl CameraDetector {
    pub fn new(
        source: Arc<dyn FrameSource>,
        model: Arc<dyn FaceModel>,
        camera: CameraSettings,
    ) -> Self {
        Self {
            source,
            model,
            camera,
        }
    }

    async fn wait_until_ready(&self, guard: &mut StreamGuard) -> Result<()> {
        let poll_interval = Duration::from_millis(self.camera.ready_poll_interval_ms);
        let mut polls = 0;
        while !guard.stream()?.is_ready() {
            if polls >= self.camera.ready_poll_limit {
                bail!("camera stream not ready after {polls} polls");
            }
            time::sleep(poll_interval).await;
            polls += 1;
        }
        log_debug!("camera stream ready after {} polls", polls);
        Ok(())
    }

    /// Samples the stream `sample_count` times and keeps the best score.
    /// Individual failures are skipped; only a run where every attempt
    /// failed is an error.
    async fn sample(&self, guard: &mut StreamGuard, config: &DetectionConfig) -> Result<f32> {
        let mut best: Option<f32> = None;
        let mut last_error = None;

        for attempt in 1..=config.sample_count {
            match self.sample_once(guard, config).await {
                Ok(scores) => {
                    let top = scores.into_iter().fold(0.0_f32, f32::max);
                    log_debug!("attempt {}: best confidence {:.3}", attempt, top);
                    best = Some(best.map_or(top, |current| current.max(top)));
                }
                Err(err) => {
                    log_warn!("detection attempt {} failed: {err:#}", attempt);
                    last_error = Some(err);
                }
            }

            if attempt < config.sample_count {
                time::sleep(config.sample_interval()).await;
            }
        }

        match (best, last_error) {
            (Some(best), _) => Ok(best),
            (None, Some(err)) => Err(err.context("every detection attempt failed")),
            (None, None) => bail!("no detection attempts were made"),
        }
    }

    async fn sample_once(
        &self,
        guard: &mut StreamGuard,
        config: &DetectionConfig,
    ) -> Result<Vec<f32>> {
        let frame = guard.stream()?.capture().await?;
        self.model
            .detect_faces(&frame, config.input_resolution)
            .await
    }
}

#[async_trait]
impl Detector for CameraDetector {
    async fn detect(&self, config: &DetectionConfig) -> Result<DetectionResult> {
        let started = Instant::now();

        let stream = match self.source.open(self.camera.width, self.camera.height).await {
            Ok(stream) => stream,
            Err(err) => {
                log_warn!("camera unavailable, assuming present: {err:#}");
                return Ok(DetectionResult::fail_open(format!("camera unavailable: {err}")));
            }
        };
        let mut guard = StreamGuard::new(stream);

        let outcome = async {
            self.wait_until_ready(&mut guard).await?;
            time::sleep(Duration::from_millis(self.camera.warmup_ms)).await;
            self.sample(&mut guard, config).await
        }
        .await;

        guard.release();

        let result = match outcome {
            Ok(confidence) => DetectionResult::measured(confidence, config.confidence_threshold),
            Err(err) => {
                log_warn!("camera check failed, assuming present: {err:#}");
                DetectionResult::fail_open(format!("{err:#}"))
            }
        };

        log_info!(
            "presence detection finished in {}ms: detected={} confidence={:.3}",
            started.elapsed().as_millis(),
            result.detected,
            result.confidence
        );
        Ok(result)
    }
}
