mod common;

use std::time::Duration;

use common::Harness;
use nightride::controller::RECONNECT_DELAY;
use nightride::domain::events::ControllerEvent;
use nightride::domain::models::PlaybackState;
use nightride::integrations::playback::{BackendEvent, BackendHandle};

#[test]
fn stream_error_schedules_reconnect_for_same_station() {
    let mut h = Harness::new();
    h.controller.select_station("datawave").expect("known");
    h.controller.play();
    h.drain_events();

    h.fail_stream("connection reset");

    assert_eq!(h.states(), vec![PlaybackState::ErrorRecovering]);
    assert!(!h.controller.has_backend());
    assert!(h.controller.reconnect_pending());
    assert_eq!(h.controller.next_timer_delay(), Some(RECONNECT_DELAY));
    assert_eq!(h.live_backends(), 0);

    h.advance(Duration::from_millis(4_999));
    assert_eq!(h.calls.count("create:"), 1);

    h.advance(Duration::from_millis(1));
    assert_eq!(h.calls.count("create:"), 2);
    assert!(h
        .calls
        .calls()
        .contains(&"uri:2:https://stream.nightride.fm/datawave.mp3".to_string()));
    assert_eq!(
        h.states(),
        vec![PlaybackState::Connecting, PlaybackState::Playing]
    );
    assert!(!h.controller.reconnect_pending());
}

#[test]
fn stop_during_recovery_cancels_the_retry() {
    let mut h = Harness::new();
    h.controller.play();
    h.fail_stream("gone");
    h.drain_events();

    h.controller.stop();
    h.advance(RECONNECT_DELAY * 2);

    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert_eq!(h.calls.count("create:"), 1);
    assert!(!h.controller.reconnect_pending());
    assert_eq!(h.controller.next_timer_delay(), None);
    assert_eq!(
        h.drain_events(),
        vec![
            ControllerEvent::StateChanged(PlaybackState::Idle),
            ControllerEvent::TrackChanged(None),
        ]
    );
}

#[test]
fn play_during_recovery_reconnects_immediately() {
    let mut h = Harness::new();
    h.controller.play();
    h.fail_stream("gone");

    h.controller.play();

    assert_eq!(h.calls.count("create:"), 2);
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(!h.controller.reconnect_pending());

    h.advance(RECONNECT_DELAY);
    assert_eq!(h.calls.count("create:"), 2);
}

#[test]
fn selecting_during_recovery_switches_and_connects() {
    let mut h = Harness::new();
    h.controller.play();
    h.fail_stream("gone");
    h.drain_events();

    h.controller
        .select_station("horrorsynth")
        .expect("known station");

    assert!(!h.controller.reconnect_pending());
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(h
        .calls
        .calls()
        .contains(&"uri:2:https://stream.nightride.fm/horrorsynth.mp3".to_string()));

    h.advance(RECONNECT_DELAY);
    assert_eq!(h.calls.count("create:"), 2);
    assert_eq!(h.live_backends(), 1);
}

#[test]
fn retries_continue_while_the_stream_keeps_failing() {
    let mut h = Harness::new();
    h.controller.play();

    for attempt in 2..=5 {
        h.fail_stream("still down");
        assert_eq!(h.controller.state(), PlaybackState::ErrorRecovering);
        h.advance(RECONNECT_DELAY);
        assert_eq!(h.calls.count("create:"), attempt);
    }
    assert_eq!(h.live_backends(), 1);
}

#[test]
fn create_failure_stays_idle_without_retry() {
    let mut h = Harness::new();
    h.set_create_fails(true);

    h.controller.play();

    assert_eq!(h.controller.state(), PlaybackState::Idle);
    assert!(h.drain_events().is_empty());
    assert!(!h.controller.reconnect_pending());
    assert_eq!(h.controller.next_timer_delay(), None);
}

#[test]
fn create_failure_during_reconnect_returns_to_idle() {
    let mut h = Harness::new();
    h.controller.play();
    h.fail_stream("gone");
    h.drain_events();
    h.set_create_fails(true);

    h.advance(RECONNECT_DELAY);

    assert_eq!(h.states(), vec![PlaybackState::Idle]);
    assert!(!h.controller.reconnect_pending());

    h.advance(RECONNECT_DELAY);
    assert_eq!(h.calls.count("create-failed"), 1);
}

#[test]
fn events_from_disposed_backends_are_ignored() {
    let mut h = Harness::new();
    h.controller.play();
    let first = h.last_handle();
    h.controller.select_station("spacesynth").expect("known");
    h.drain_events();

    h.controller
        .handle_backend_event(BackendEvent::error(first, "late failure"));
    h.controller
        .handle_backend_event(BackendEvent::tag(first, "title", "Old Song"));
    h.controller
        .handle_backend_event(BackendEvent::tag(BackendHandle(99), "title", "Nobody"));

    assert!(h.drain_events().is_empty());
    assert_eq!(h.controller.state(), PlaybackState::Playing);
    assert!(!h.controller.reconnect_pending());
}

#[test]
fn errors_after_stop_are_ignored() {
    let mut h = Harness::new();
    h.controller.play();
    let handle = h.last_handle();
    h.controller.stop();
    h.drain_events();

    h.controller
        .handle_backend_event(BackendEvent::error(handle, "eos"));

    assert!(h.drain_events().is_empty());
    assert!(!h.controller.reconnect_pending());
}

#[test]
fn title_is_cleared_when_the_station_changes() {
    let mut h = Harness::new();
    h.controller.play();
    h.send_tag("title", "Gunship - Tech Noir");
    h.drain_events();

    h.controller.select_station("ebsm").expect("known");

    assert!(h
        .drain_events()
        .contains(&ControllerEvent::TrackChanged(None)));
    assert_eq!(h.controller.last_track_title(), None);
}

#[test]
fn start_failure_enters_recovery_and_retries() {
    let mut h = Harness::new();
    h.set_start_fails(true);

    h.controller.play();

    assert_eq!(
        h.states(),
        vec![PlaybackState::Connecting, PlaybackState::ErrorRecovering]
    );
    assert_eq!(h.calls.count("start-failed:1"), 1);
    assert_eq!(h.calls.count("stop:1"), 1);
    assert_eq!(h.live_backends(), 0);
    assert!(!h.controller.has_backend());
    assert!(h.controller.reconnect_pending());
    assert_eq!(h.controller.next_timer_delay(), Some(RECONNECT_DELAY));

    h.set_start_fails(false);
    h.advance(RECONNECT_DELAY);

    assert_eq!(h.calls.count("create:"), 2);
    assert_eq!(h.calls.count("start:2"), 1);
    assert_eq!(
        h.states(),
        vec![PlaybackState::Connecting, PlaybackState::Playing]
    );
    assert!(!h.controller.reconnect_pending());
}
