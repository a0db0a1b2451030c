use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use proptest::prelude::*;
use tokio::time::Instant;

use focusguard::detection::{CameraSettings, CameraStream, FaceModel, Frame, FrameSource};
use focusguard::{CameraDetector, DetectionConfig, Detector};

#[derive(Debug, Clone)]
struct Faults {
    open_fails: bool,
    /// 100ms polls before the stream reports ready; `None` never does.
    ready_after: Option<u32>,
    /// Per capture attempt: `Some(score)` or `None` for a failed capture.
    samples: Vec<Option<u8>>,
    capture_delay_ms: u64,
}

#[derive(Default)]
struct Counts {
    opened: AtomicUsize,
    released: AtomicUsize,
}

struct FaultyCamera {
    faults: Faults,
    counts: Arc<Counts>,
}

struct FaultyStream {
    faults: Faults,
    counts: Arc<Counts>,
    ready_at: Option<Instant>,
    captured: usize,
}

#[async_trait]
impl FrameSource for FaultyCamera {
    async fn open(&self, width: u32, height: u32) -> Result<Box<dyn CameraStream>> {
        if self.faults.open_fails {
            bail!("permission denied");
        }
        assert_eq!((width, height), (640, 480));
        self.counts.opened.fetch_add(1, Ordering::SeqCst);
        let ready_at = self
            .faults
            .ready_after
            .map(|polls| Instant::now() + Duration::from_millis(100 * u64::from(polls)));
        Ok(Box::new(FaultyStream {
            faults: self.faults.clone(),
            counts: self.counts.clone(),
            ready_at,
            captured: 0,
        }))
    }
}

#[async_trait]
impl CameraStream for FaultyStream {
    fn is_ready(&self) -> bool {
        self.ready_at.map_or(false, |at| Instant::now() >= at)
    }

    async fn capture(&mut self) -> Result<Frame> {
        tokio::time::sleep(Duration::from_millis(self.faults.capture_delay_ms)).await;
        let sample = self.faults.samples.get(self.captured).copied().flatten();
        self.captured += 1;
        match sample {
            Some(score) => Ok(Frame {
                width: 1,
                height: 1,
                pixels: vec![score],
            }),
            None => bail!("frame dropped"),
        }
    }

    fn release(&mut self) {
        self.counts.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Scores a frame by its single pixel: 0..=255 mapped to 0.0..=1.0.
struct PixelModel;

#[async_trait]
impl FaceModel for PixelModel {
    async fn detect_faces(&self, frame: &Frame, _input_size: u32) -> Result<Vec<f32>> {
        Ok(frame.pixels.iter().map(|p| f32::from(*p) / 255.0).collect())
    }
}

fn camera_settings() -> CameraSettings {
    CameraSettings {
        ready_poll_limit: 5,
        ..CameraSettings::default()
    }
}

fn fault_plan() -> impl Strategy<Value = Faults> {
    (
        proptest::bool::weighted(0.15),
        proptest::option::weighted(0.8, 0u32..4),
        proptest::collection::vec(proptest::option::of(any::<u8>()), 3),
        0u64..800,
    )
        .prop_map(|(open_fails, ready_after, samples, capture_delay_ms)| Faults {
            open_fails,
            ready_after,
            samples,
            capture_delay_ms,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn camera_is_released_exactly_once(faults in fault_plan(), timeout_ms in 500u64..8_000) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let counts = Arc::new(Counts::default());
        let detector = CameraDetector::new(
            Arc::new(FaultyCamera { faults: faults.clone(), counts: counts.clone() }),
            Arc::new(PixelModel),
            camera_settings(),
        );

        let outcome = rt.block_on(async {
            tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                detector.detect(&DetectionConfig::default()),
            )
            .await
        });

        let opened = counts.opened.load(Ordering::SeqCst);
        let released = counts.released.load(Ordering::SeqCst);
        prop_assert_eq!(opened, released);
        prop_assert_eq!(opened, usize::from(!faults.open_fails));

        if let Ok(result) = outcome {
            let result = result.unwrap();
            let any_sample = faults.samples.iter().any(Option::is_some);
            if faults.open_fails || faults.ready_after.is_none() || !any_sample {
                prop_assert!(result.detected);
                prop_assert!(result.is_fail_open());
            } else {
                prop_assert!(!result.is_fail_open());
                let best = faults.samples.iter().flatten().copied().max().unwrap_or(0);
                prop_assert_eq!(result.detected, f32::from(best) / 255.0 > 0.1);
            }
        }
    }
}

#[tokio::test(start_paused = true)]
async fn threshold_is_exclusive() {
    let counts = Arc::new(Counts::default());
    let faults = Faults {
        open_fails: false,
        ready_after: Some(0),
        samples: vec![Some(0), Some(10), Some(5)],
        capture_delay_ms: 0,
    };
    let detector = CameraDetector::new(
        Arc::new(FaultyCamera { faults, counts: counts.clone() }),
        Arc::new(PixelModel),
        camera_settings(),
    );

    let config = DetectionConfig {
        confidence_threshold: 10.0 / 255.0,
        ..DetectionConfig::default()
    };
    let result = detector.detect(&config).await.unwrap();
    assert!(!result.detected);
    assert!((result.confidence - 10.0 / 255.0).abs() < f32::EPSILON);
    assert_eq!(counts.released.load(Ordering::SeqCst), 1);
}
