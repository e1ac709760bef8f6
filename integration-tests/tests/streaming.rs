use integration_tests::harness::{EngineHarness, error_record, line_json};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tailway_core::engine::ProcessedEvent;
use tailway_core::filter::LevelFilter;
use tailway_core::record::LogLevel;
use tailway_core::session::SessionState;

#[tokio::test]
async fn filtered_stream_drops_nonmatching_live_records() {
    let mut h = EngineHarness::new();
    h.snapshots.push(Vec::new());
    h.snapshots
        .push(vec![error_record("s1"), error_record("s2"), error_record("s3")]);

    h.engine.init().await;
    tokio::task::yield_now().await;
    h.engine.set_level(LevelFilter::Level(LogLevel::Error));
    h.engine.tick().await.unwrap();
    h.engine.tick().await.unwrap();
    assert_eq!(h.messages(), ["s1", "s2", "s3"]);

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    assert_eq!(h.engine.session_state(), SessionState::Connecting);
    assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamOpened));
    assert!(h.engine.is_live());

    handle.send_log_line(line_json("error", "r1"));
    handle.send_log_line(line_json("info", "filtered-out"));
    handle.send_log_line(line_json("error", "r2"));
    for _ in 0..3 {
        assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamFrame));
    }

    assert_eq!(h.messages(), ["s1", "s2", "s3", "r1", "r2"]);
    assert!(h.engine.view().all(|r| r.level == Some(LogLevel::Error)));
}

#[tokio::test]
async fn toggling_the_stream_does_not_clear_the_window() {
    let mut h = EngineHarness::new();
    h.snapshots.push(vec![error_record("s1")]);
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let first = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();
    let first_id = h.engine.session_id().unwrap();

    h.engine.disable_streaming();
    h.engine.disable_streaming();
    assert_eq!(h.engine.session_state(), SessionState::Idle);
    assert!(!h.engine.is_live());
    assert_eq!(h.messages(), ["s1"]);

    let _second = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();
    let second_id = h.engine.session_id().unwrap();

    assert_ne!(first_id, second_id);
    assert_eq!(h.messages(), ["s1"]);
    drop(first);
}

#[tokio::test]
async fn late_records_from_a_torn_down_session_are_dropped() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    // Put a record in flight, let the forwarder queue it, then tear the
    // session down before the engine processes it.
    handle.send_log_line(line_json("error", "in-flight"));
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    h.engine.disable_streaming();

    let _ = tokio::time::timeout(Duration::from_millis(100), h.engine.tick()).await;
    assert_eq!(h.messages(), Vec::<String>::new());
}

#[tokio::test]
async fn transport_error_goes_not_live_and_keeps_the_window() {
    let mut h = EngineHarness::new();
    h.snapshots.push(vec![error_record("s1")]);
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();
    assert!(h.engine.is_live());

    handle.fail("proxy restarted");
    assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamClosed));
    assert!(!h.engine.is_live());
    assert_eq!(h.engine.session_state(), SessionState::Idle);
    assert_eq!(h.messages(), ["s1"]);

    // No automatic reconnect: one connect attempt, ever.
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.transport.connect_count(), 1);

    // Re-enabling works after the failure.
    let _again = h.transport.expect_connection();
    h.engine.enable_streaming();
    assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamOpened));
    assert!(h.engine.is_live());
}

#[tokio::test]
async fn refused_connection_surfaces_as_not_live() {
    let mut h = EngineHarness::new();
    h.transport.expect_failure("credential expired");

    h.engine.enable_streaming();
    assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamClosed));
    assert!(!h.engine.is_live());
    assert_eq!(h.engine.session_state(), SessionState::Idle);
}

#[tokio::test]
async fn orderly_transport_close_ends_the_session() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    handle.close();
    assert_eq!(h.engine.tick().await, Some(ProcessedEvent::StreamClosed));
    assert!(!h.engine.is_live());
}

#[tokio::test]
async fn malformed_frames_are_counted_not_surfaced() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    handle.send_raw("not json at all");
    handle.send_raw(r#"{"event":"pong"}"#);
    handle.send_log_line(line_json("info", "ok"));
    for _ in 0..3 {
        h.engine.tick().await.unwrap();
    }

    assert_eq!(h.engine.parse_failures(), 1);
    assert_eq!(h.messages(), ["ok"]);
}

#[tokio::test]
async fn filter_change_replaces_the_session() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let old_handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();
    let old_id = h.engine.session_id().unwrap();

    let _new_handle = h.transport.expect_connection();
    h.engine.set_level(LevelFilter::Level(LogLevel::Error));

    // Teardown completed within the trigger; the replacement is
    // already connecting under a fresh id.
    assert_ne!(h.engine.session_id(), Some(old_id));
    assert_eq!(h.engine.session_state(), SessionState::Connecting);

    // Drain the pending snapshot + open events.
    h.engine.tick().await.unwrap();
    h.engine.tick().await.unwrap();
    assert!(h.engine.is_live());
    assert_eq!(h.transport.connects(), ["backend", "backend"]);

    // Anything the old connection still emits never lands.
    old_handle.send_log_line(line_json("error", "zombie"));
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    h.engine.drain_pending();
    assert_eq!(h.messages(), Vec::<String>::new());
}
