mod common;

use std::time::Duration;

use focusguard::{ActivityAction, Phase};

use common::{harness, quiet_settings, Outcome, ScriptedDetector};

#[tokio::test(start_paused = true)]
async fn slow_checks_never_overlap() {
    let mut settings = quiet_settings();
    settings.presence.check_timeout_secs = 600;
    let detector = ScriptedDetector::new(vec![Outcome::Present], Duration::from_secs(150));
    let h = harness(detector.clone(), settings);

    h.monitor.start_focus(30).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600_500)).await;

    assert!(detector.calls() >= 2);
    assert_eq!(detector.max_active(), 1);
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 0);
}

#[tokio::test(start_paused = true)]
async fn busy_interval_reports_in_flight_check() {
    let mut settings = quiet_settings();
    settings.presence.check_timeout_secs = 600;
    let detector = ScriptedDetector::new(vec![Outcome::Present], Duration::from_secs(90));
    let h = harness(detector.clone(), settings);

    h.monitor.start_focus(30).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60_500)).await;

    let snapshot = h.monitor.snapshot().await;
    let presence = snapshot.presence.expect("presence runs while focusing");
    assert!(presence.in_flight);
    assert_eq!(presence.seconds_until_next_check, 60);
    assert_eq!(detector.active(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_check_fails_open() {
    let mut settings = quiet_settings();
    settings.presence.check_timeout_secs = 20;
    let detector = ScriptedDetector::new(vec![Outcome::Absent], Duration::from_secs(45));
    let h = harness(detector.clone(), settings);

    h.monitor.start_focus(30).await.unwrap();
    tokio::time::sleep(Duration::from_millis(85_500)).await;

    assert_eq!(detector.calls(), 1);
    assert_eq!(detector.active(), 0);
    assert!(!h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 0);

    // The countdown restarted when the timed-out check resolved at 80s; the
    // tick due at that same instant may land on either side of the reset.
    let presence = h.monitor.snapshot().await.presence.unwrap();
    assert!(!presence.in_flight);
    assert!((54..=55).contains(&presence.seconds_until_next_check));
}

#[tokio::test(start_paused = true)]
async fn detector_errors_fail_open() {
    let h = harness(ScriptedDetector::always(Outcome::Fail), quiet_settings());
    h.monitor.start_focus(10).await.unwrap();

    tokio::time::sleep(Duration::from_millis(180_500)).await;
    assert!(!h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 0);
}

#[tokio::test(start_paused = true)]
async fn result_after_stop_is_discarded() {
    let detector = ScriptedDetector::new(vec![Outcome::Absent], Duration::from_secs(10));
    let h = harness(detector.clone(), quiet_settings());

    h.monitor.start_focus(10).await.unwrap();
    tokio::time::sleep(Duration::from_millis(65_500)).await;
    assert_eq!(detector.active(), 1);

    h.monitor.stop_focus().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(detector.active(), 0);
    assert!(!h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 0);
    assert_eq!(h.monitor.snapshot().await.phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn result_after_break_start_is_discarded() {
    let detector = ScriptedDetector::new(vec![Outcome::Absent], Duration::from_secs(10));
    let h = harness(detector.clone(), quiet_settings());

    h.monitor.start_focus(10).await.unwrap();
    tokio::time::sleep(Duration::from_millis(62_500)).await;
    h.monitor.schedule_break(5).await.unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(!h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 0);
    assert!(h.monitor.snapshot().await.presence.is_none());
}

#[tokio::test(start_paused = true)]
async fn only_negative_checks_raise() {
    let detector = ScriptedDetector::new(
        vec![Outcome::Present, Outcome::Fail, Outcome::Absent, Outcome::Present],
        Duration::from_millis(1_500),
    );
    let h = harness(detector.clone(), quiet_settings());
    h.monitor.start_focus(20).await.unwrap();

    // Each check takes 1.5s and the next one starts 60 ticks after it
    // resolves: 60s, 121s, 182s, 243s.
    tokio::time::sleep(Duration::from_millis(181_500)).await;
    assert_eq!(detector.calls(), 2);
    assert!(!h.monitor.alert().is_visible());

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(detector.calls(), 3);
    assert!(h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 1);

    h.monitor.acknowledge_alert().await;
    tokio::time::sleep(Duration::from_secs(62)).await;
    assert_eq!(detector.calls(), 4);
    assert!(!h.monitor.alert().is_visible());
    assert_eq!(h.count(ActivityAction::FaceNotDetected), 1);
}
