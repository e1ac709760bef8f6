use integration_tests::harness::EngineHarness;
use pretty_assertions::assert_eq;
use std::time::Duration;

// The paused clock auto-advances whenever every task is idle, so the
// keepalive interval fires deterministically.

#[tokio::test(start_paused = true)]
async fn probes_follow_the_interval_and_die_with_the_session() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let _handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    // Nothing is probed at open; the first probe comes one interval in.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.transport.probes().len(), 0);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.probes(), ["ping"]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.probes().len(), 2);

    // Teardown cancels the timer with the session; a leaked timer
    // across this boundary would keep probing.
    h.engine.disable_streaming();
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.transport.probes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn replacement_sessions_never_double_probe() {
    let mut h = EngineHarness::new();
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    // Rapid channel-switch style churn: each enable replaces the last
    // session before its first probe is due.
    for _ in 0..3 {
        let _handle = h.transport.expect_connection();
        h.engine.enable_streaming();
        h.engine.tick().await.unwrap();
        h.engine.disable_streaming();
    }

    let _handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    // Only the surviving session's timer is alive: one probe per
    // interval, not one per ever-created session.
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.transport.probes().len(), 1);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.transport.probes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn keepalive_interval_is_configurable() {
    let cfg = tailway_core::config::EngineConfig {
        keepalive_interval: Duration::from_secs(5),
        ..Default::default()
    };
    let mut h = EngineHarness::with_config(cfg);
    h.engine.init().await;
    h.engine.tick().await.unwrap();

    let _handle = h.transport.expect_connection();
    h.engine.enable_streaming();
    h.engine.tick().await.unwrap();

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(h.transport.probes().len(), 3);
}
