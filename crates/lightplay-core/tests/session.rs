//! Session-level tests against the mock transport.
//!
//! All tests run on a paused tokio clock so pacing and rate limiting are
//! deterministic.

use std::time::Duration;

use lightplay_core::{
    CommandOutcome, DeviceNotFoundReason, DeviceSession, DisconnectReason, DiscoveredLight,
    DropReason, Error, MockTransport, SessionConfig, SessionEvent, SessionState,
};
use lightplay_core::types::{Color, ColorChoice, CommandFrame, LightStatus, Port};
use lightplay_core::uuids::TX_CHARACTERISTIC;
use tokio::time::Instant;

const RESET: [u8; 9] = [64, 0, 0, 0, 0, 0, 0, 0, 0];
const FADE_TWO_SECONDS: [u8; 9] = [0x01, 0x07, 0xD0, 0, 0, 0, 0, 0, 0];

async fn connected_session() -> DeviceSession<MockTransport> {
    connected_with(SessionConfig::default()).await
}

async fn connected_with(config: SessionConfig) -> DeviceSession<MockTransport> {
    let session = DeviceSession::new(MockTransport::with_light("toy"), config);
    session.scan().await.unwrap();
    session.transport().clear_writes().await;
    session
}

fn drain(rx: &mut lightplay_core::EventReceiver) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_paced(start: Instant, delay: Duration) {
    let elapsed = start.elapsed();
    assert!(elapsed >= delay, "released after {:?}", elapsed);
    assert!(elapsed < delay + Duration::from_millis(5), "held for {:?}", elapsed);
}

// --- Lifecycle ---

#[tokio::test(start_paused = true)]
async fn test_scan_connects_and_bootstraps() {
    let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
    assert_eq!(session.state().await, SessionState::Disconnected);

    let light = session.scan().await.unwrap();
    assert_eq!(light.id, "toy");
    assert_eq!(session.state().await, SessionState::Connected);
    assert!(session.is_connected().await);
    assert_eq!(session.linked_id().await.as_deref(), Some("toy"));

    let frames = session.transport().frames().await;
    assert_eq!(frames, vec![RESET.to_vec(), FADE_TWO_SECONDS.to_vec()]);

    // Bootstrap frames do not consume rate-limiter tokens.
    assert_eq!(session.metrics().written, 2);
    assert_eq!(session.metrics().dropped(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_subscribes_to_notifications() {
    let session = connected_session().await;
    let mut rx = session.subscribe();

    let subscriptions = session.transport().subscriptions().await;
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].1, TX_CHARACTERISTIC);

    session.transport().notify(TX_CHARACTERISTIC, &[0xAB, 0x01]).await;
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Notification { data } if data == &vec![0xAB, 0x01]
    )));
}

#[tokio::test(start_paused = true)]
async fn test_scan_publishes_lifecycle_events() {
    let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
    let mut rx = session.subscribe();
    session.scan().await.unwrap();

    let events = drain(&mut rx);
    assert!(matches!(
        events[0],
        SessionEvent::StateChanged {
            from: SessionState::Disconnected,
            to: SessionState::Scanning
        }
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Discovered { id, .. } if id == "toy")));
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::Connected { id } if id == "toy")));
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StateChanged {
            to: SessionState::Connected,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_scan_picks_configured_device() {
    let transport = MockTransport::with_peripherals(vec![
        DiscoveredLight::new("AA:AA", Some("LightPlay kitchen".to_string())),
        DiscoveredLight::new("BB:BB", Some("LightPlay desk".to_string())),
    ]);
    let session = DeviceSession::new(transport, SessionConfig::new().device("desk"));

    let light = session.scan().await.unwrap();
    assert_eq!(light.id, "BB:BB");
    assert_eq!(session.transport().linked_id().await.as_deref(), Some("BB:BB"));
}

#[tokio::test(start_paused = true)]
async fn test_scan_without_devices_fails() {
    let session = DeviceSession::new(MockTransport::new(), SessionConfig::default());

    let err = session.scan().await.unwrap_err();
    assert!(matches!(
        err,
        Error::DeviceNotFound(DeviceNotFoundReason::NoDevicesInRange)
    ));
    assert_eq!(session.state().await, SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_scan_configured_device_missing() {
    let session = DeviceSession::new(
        MockTransport::with_light("toy"),
        SessionConfig::new().device("other"),
    );

    let err = session.scan().await.unwrap_err();
    assert!(matches!(
        err,
        Error::DeviceNotFound(DeviceNotFoundReason::NotFound { .. })
    ));
    assert_eq!(session.transport().connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_returns_to_disconnected() {
    let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
    session.transport().set_should_fail_connect(true);
    let mut rx = session.subscribe();

    let err = session.scan().await.unwrap_err();
    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(!session.is_connected().await);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Disconnected {
            reason: DisconnectReason::ConnectFailed(_)
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_write_failure_fails_connect() {
    let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
    session.transport().set_transient_write_failures(1);

    assert!(matches!(
        session.scan().await,
        Err(Error::WriteFailed { .. })
    ));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(session.linked_id().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_rescan_releases_previous_link() {
    let session = connected_session().await;
    let mut rx = session.subscribe();

    session.scan().await.unwrap();
    assert_eq!(session.transport().disconnect_count(), 1);
    assert_eq!(session.transport().connect_count(), 2);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Disconnected {
            reason: DisconnectReason::Rescan
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_resets_cache() {
    let session = connected_session().await;
    session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::On));

    session.disconnect().await.unwrap();
    session.connect("toy").await.unwrap();

    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));
    assert_eq!(session.color_of(Port::Light1).await, Some(Color::White));

    // The same command is no longer redundant.
    session.transport().clear_writes().await;
    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(session.transport().frames().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_makes_commands_no_ops() {
    let session = connected_session().await;
    session.disconnect().await.unwrap();
    assert_eq!(session.state().await, SessionState::Disconnected);

    let outcome = session
        .set_color(Port::Light2, Color::Blue.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Dropped(DropReason::NotConnected));
    assert!(session.transport().writes().await.is_empty());
    assert_eq!(session.metrics().dropped_not_connected, 1);

    // Nothing was sent, so nothing was recorded.
    assert_eq!(session.status_of(Port::Light2).await, Some(LightStatus::Off));
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_detected_on_next_command() {
    let session = connected_session().await;
    let mut rx = session.subscribe();

    session.transport().drop_link().await;
    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Dropped(DropReason::NotConnected));

    assert!(!session.is_connected().await);
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Disconnected {
            reason: DisconnectReason::LinkLost
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_on_link_lost_drops_link() {
    let session = connected_session().await;
    session.on_link_lost().await;

    assert_eq!(session.state().await, SessionState::Disconnected);
    assert_eq!(session.linked_id().await, None);

    let frame = CommandFrame::set(Port::Light1, Color::Red);
    let outcome = session.send(&frame, false).await.unwrap();
    assert_eq!(outcome, CommandOutcome::Dropped(DropReason::NotConnected));

    // A second report is harmless.
    session.on_link_lost().await;
}

// --- Send path ---

#[tokio::test(start_paused = true)]
async fn test_send_when_not_connected_is_ok() {
    let session = DeviceSession::new(MockTransport::with_light("toy"), SessionConfig::default());
    let mut rx = session.subscribe();

    let outcome = session
        .send(&CommandFrame::set(Port::Light1, Color::Red), true)
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Dropped(DropReason::NotConnected));
    assert!(session.transport().writes().await.is_empty());

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::SendDropped {
            reason: DropReason::NotConnected,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_forwards_first_twenty() {
    let session = connected_session().await;

    let mut outcomes = Vec::new();
    for i in 0..25u8 {
        let color = Color::ALL[usize::from(i) % Color::ALL.len()];
        let frame = CommandFrame::set(Port::Light1, color);
        outcomes.push(session.send(&frame, true).await.unwrap());
    }

    assert!(outcomes[..20].iter().all(|o| *o == CommandOutcome::Sent));
    assert!(outcomes[20..]
        .iter()
        .all(|o| *o == CommandOutcome::Dropped(DropReason::RateLimited)));
    assert_eq!(session.transport().frames().await.len(), 20);

    let metrics = session.metrics();
    assert_eq!(metrics.dropped_rate_limited, 5);
}

#[tokio::test(start_paused = true)]
async fn test_unlimited_send_ignores_limiter() {
    let session = connected_with(SessionConfig::new().max_sends_per_second(1)).await;
    let frame = CommandFrame::reset();

    for _ in 0..5 {
        assert_eq!(
            session.send(&frame, false).await.unwrap(),
            CommandOutcome::Sent
        );
    }
    assert_eq!(session.transport().frames().await.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limiter_refills_over_time() {
    let session = connected_with(SessionConfig::new().max_sends_per_second(2)).await;
    let frame = CommandFrame::off(Port::Light1);

    assert!(session.send(&frame, true).await.unwrap().was_sent());
    assert!(session.send(&frame, true).await.unwrap().was_sent());
    assert!(!session.send(&frame, true).await.unwrap().was_sent());

    tokio::time::advance(Duration::from_millis(500)).await;
    assert!(session.send(&frame, true).await.unwrap().was_sent());
}

// --- Light commands ---

#[tokio::test(start_paused = true)]
async fn test_set_color_light2_red() {
    let session = connected_session().await;

    let outcome = session
        .set_color(Port::Light2, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(
        session.transport().frames().await,
        vec![vec![80, 15, 255, 0, 0, 0, 0, 0, 0]]
    );

    let state = session.light_state(Port::Light2).await.unwrap();
    assert_eq!(state.status, LightStatus::On);
    assert_eq!(state.color, Color::Red);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_set_color_writes_once() {
    let session = connected_session().await;

    let first = session
        .set_color(Port::Light1, Color::Green.into())
        .await
        .unwrap();
    let second = session
        .set_color(Port::Light1, Color::Green.into())
        .await
        .unwrap();

    assert_eq!(first, CommandOutcome::Sent);
    assert_eq!(second, CommandOutcome::Suppressed);
    assert_eq!(session.transport().frames().await.len(), 1);
    assert_eq!(session.metrics().suppressed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_fade_off_all_lights() {
    let session = connected_session().await;
    session
        .set_color(Port::AllLights, Color::Yellow.into())
        .await
        .unwrap();
    assert_eq!(session.status_of(Port::AllLights).await, Some(LightStatus::On));

    session.fade_off(Port::AllLights).await.unwrap();

    let frames = session.transport().frames().await;
    assert_eq!(frames.last().unwrap(), &vec![67, 0, 0, 0, 0, 0, 0, 0, 0]);
    for port in Port::LIGHTS {
        assert_eq!(session.status_of(port).await, Some(LightStatus::Off));
    }
    // Colors survive going dark.
    assert_eq!(session.color_of(Port::AllLights).await, Some(Color::Yellow));
}

#[tokio::test(start_paused = true)]
async fn test_fade_to_color_marks_fading() {
    let session = connected_session().await;

    session
        .fade_to_color(Port::Light3, Color::Blue.into())
        .await
        .unwrap();
    assert_eq!(
        session.transport().frames().await,
        vec![vec![90, 0, 0, 0, 0, 15, 255, 0, 0]]
    );
    assert_eq!(
        session.status_of(Port::Light3).await,
        Some(LightStatus::Fading)
    );

    // Repeating the fade while it runs changes nothing.
    let outcome = session
        .fade_to_color(Port::Light3, Color::Blue.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Suppressed);
}

#[tokio::test(start_paused = true)]
async fn test_set_color_during_fade_is_sent() {
    let session = connected_session().await;
    session
        .fade_to_color(Port::Light1, Color::Green.into())
        .await
        .unwrap();

    let outcome = session
        .set_color(Port::Light1, Color::Green.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::On));
    assert_eq!(session.transport().frames().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fade_completes_after_fade_duration() {
    let session = connected_session().await;
    session
        .fade_to_color(Port::AllLights, Color::Magenta.into())
        .await
        .unwrap();
    assert_eq!(
        session.status_of(Port::AllLights).await,
        Some(LightStatus::Fading)
    );

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(session.status_of(Port::AllLights).await, Some(LightStatus::On));

    let outcome = session
        .set_color(Port::Light2, Color::Magenta.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Suppressed);
}

#[tokio::test(start_paused = true)]
async fn test_off_when_already_off_is_suppressed() {
    let session = connected_session().await;

    assert_eq!(
        session.set_off(Port::Light1).await.unwrap(),
        CommandOutcome::Suppressed
    );
    assert_eq!(
        session.fade_off(Port::AllLights).await.unwrap(),
        CommandOutcome::Suppressed
    );
    assert!(session.transport().frames().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_mixed_all_lights_is_never_suppressed() {
    let session = connected_session().await;
    session
        .set_color(Port::Light1, Color::Blue.into())
        .await
        .unwrap();
    assert_eq!(session.color_of(Port::AllLights).await, None);

    let outcome = session
        .set_color(Port::AllLights, Color::Blue.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Sent);
    assert_eq!(
        session.transport().frames().await.last().unwrap(),
        &vec![64, 0, 0, 0, 0, 15, 255, 0, 0]
    );
    assert_eq!(session.color_of(Port::AllLights).await, Some(Color::Blue));
}

#[tokio::test(start_paused = true)]
async fn test_surprise_picks_a_different_color() {
    let session = connected_session().await;

    for _ in 0..20 {
        let before = session.color_of(Port::Light1).await.unwrap();
        let outcome = session
            .set_color(Port::Light1, ColorChoice::Surprise)
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Sent);

        let after = session.color_of(Port::Light1).await.unwrap();
        assert_ne!(after, before);
    }
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_propagates_and_keeps_cache() {
    let session = connected_session().await;
    session.transport().set_transient_write_failures(1);

    let err = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WriteFailed { .. }));
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));
    assert_eq!(session.color_of(Port::Light1).await, Some(Color::White));
    assert_eq!(session.metrics().failed, 1);

    // Not retried; the next attempt goes through.
    session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::On));
}

// --- Pacing ---

#[tokio::test(start_paused = true)]
async fn test_command_is_paced_from_issue() {
    let session = connected_session().await;

    let start = Instant::now();
    session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_paced(start, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_pacing_includes_write_latency() {
    let session = connected_session().await;
    session
        .transport()
        .set_write_latency(Duration::from_millis(120));

    let start = Instant::now();
    session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_paced(start, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_slow_write_released_at_pacing_deadline() {
    let session = connected_session().await;
    session
        .transport()
        .set_write_latency(Duration::from_millis(1500));

    let start = Instant::now();
    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_paced(start, Duration::from_millis(300));
    assert_eq!(outcome, CommandOutcome::InFlight);

    // Not recorded until the write lands.
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));
    assert!(session.transport().frames().await.is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(
        session.transport().frames().await,
        vec![vec![72, 15, 255, 0, 0, 0, 0, 0, 0]]
    );
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::On));
    assert_eq!(session.color_of(Port::Light1).await, Some(Color::Red));
    assert_eq!(session.metrics().written, 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_write_failure_keeps_cache() {
    let session = connected_session().await;
    session
        .transport()
        .set_write_latency(Duration::from_millis(1500));
    session.transport().set_transient_write_failures(1);

    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::InFlight);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));
    assert_eq!(session.metrics().failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_write_discarded_after_reconnect() {
    let session = connected_session().await;
    session
        .transport()
        .set_write_latency(Duration::from_millis(1500));

    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::InFlight);

    session.transport().set_write_latency(Duration::ZERO);
    session.disconnect().await.unwrap();
    session.connect("toy").await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(session.status_of(Port::Light1).await, Some(LightStatus::Off));
    assert_eq!(session.color_of(Port::Light1).await, Some(Color::White));
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_is_still_paced() {
    let session = connected_session().await;
    session.transport().set_transient_write_failures(1);

    let start = Instant::now();
    let result = session.set_color(Port::Light1, Color::Red.into()).await;
    assert!(matches!(result, Err(Error::WriteFailed { .. })));
    assert_paced(start, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_command_is_still_paced() {
    let session = connected_session().await;
    session.disconnect().await.unwrap();

    let start = Instant::now();
    let outcome = session
        .set_color(Port::Light1, Color::Red.into())
        .await
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Dropped(DropReason::NotConnected));
    assert_paced(start, Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_suppressed_command_returns_immediately() {
    let session = connected_session().await;

    let start = Instant::now();
    session.set_off(Port::Light2).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn test_custom_pacing_delay() {
    let session =
        connected_with(SessionConfig::new().pacing_delay(Duration::from_millis(50))).await;

    let start = Instant::now();
    session
        .fade_to_color(Port::Light2, Color::Orange.into())
        .await
        .unwrap();
    assert_paced(start, Duration::from_millis(50));
}

#[tokio::test(start_paused = true)]
async fn test_custom_fade_duration_frame() {
    let config = SessionConfig::new().fade_duration(Duration::from_millis(500));
    let session = DeviceSession::new(MockTransport::with_light("toy"), config);
    session.scan().await.unwrap();

    let frames = session.transport().frames().await;
    assert_eq!(frames[1], vec![0x01, 0x01, 0xF4, 0, 0, 0, 0, 0, 0]);
}
