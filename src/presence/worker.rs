use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::detection::{DetectionConfig, DetectionResult, Detector};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Runs one presence check.
///
/// Returns `None` when `cancel` fires first; the detector future is dropped
/// at that point, which releases the camera. Errors and timeouts come back
/// as fail-open results so the caller never raises an alert for them.
pub async fn run_check(
    detector: Arc<dyn Detector>,
    config: DetectionConfig,
    timeout: Duration,
    cancel: CancellationToken,
) -> Option<DetectionResult> {
    let detection = tokio::time::timeout(timeout, detector.detect(&config));

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            log_debug!("presence check cancelled");
            return None;
        }
        outcome = detection => outcome,
    };

    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            log_warn!("presence detection failed, assuming present: {err:#}");
            DetectionResult::fail_open(format!("detector error: {err}"))
        }
        Err(_) => {
            log_warn!(
                "presence detection exceeded {}s, assuming present",
                timeout.as_secs()
            );
            DetectionResult::fail_open("detector timed out")
        }
    };

    if result.is_fail_open() {
        log_info!("presence check failed open: {:?}", result.status);
    } else {
        log_debug!(
            "presence check measured confidence {:.2} (detected: {})",
            result.confidence,
            result.detected
        );
    }
    Some(result)
}
