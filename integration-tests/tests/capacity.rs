use integration_tests::harness::{EngineHarness, line_json};
use pretty_assertions::assert_eq;
use tailway_core::config::EngineConfig;

#[tokio::test]
async fn live_appends_respect_the_capacity_bound() {
    let cfg = EngineConfig {
        cap_max: 6,
        cap_floor: 3,
        ..Default::default()
    };
    let mut h = EngineHarness::with_config(cfg);
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    for i in 0..7 {
        handle.send_log_line(line_json("info", &format!("m{i}")));
    }
    for _ in 0..7 {
        h.engine.tick().await.unwrap();
        assert!(h.engine.window_len() <= 6);
    }

    // The seventh append evicted one batch down to the floor first.
    assert_eq!(h.messages(), ["m3", "m4", "m5", "m6"]);
}

#[tokio::test]
async fn snapshot_seed_and_live_appends_share_the_bound() {
    let cfg = EngineConfig {
        cap_max: 4,
        cap_floor: 2,
        ..Default::default()
    };
    let mut h = EngineHarness::with_config(cfg);
    h.snapshots.push(vec![
        integration_tests::harness::error_record("s1"),
        integration_tests::harness::error_record("s2"),
        integration_tests::harness::error_record("s3"),
        integration_tests::harness::error_record("s4"),
    ]);
    h.engine.init().await;
    h.engine.tick().await.unwrap();
    assert_eq!(h.engine.window_len(), 4);

    let handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    handle.send_log_line(line_json("error", "r1"));
    h.engine.tick().await.unwrap();

    assert_eq!(h.messages(), ["s3", "s4", "r1"]);
}
