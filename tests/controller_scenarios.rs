// tests/controller_scenarios.rs

mod common;

use std::time::Duration;

use common::{Harness, TestResult};
use devloop::engine::RuntimeEvent;
use devloop::errors::DevloopError;
use devloop_test_utils::fakes::{FakeBuilder, FakeServer, ScriptedBuild, ServerCall};
use devloop_test_utils::{init_tracing, wait_until};

#[tokio::test]
async fn initial_launch_leaves_exactly_one_server_running() -> TestResult {
    init_tracing();

    let h = Harness::spawn(FakeBuilder::new(), FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    assert_eq!(h.builder.builds_started(), 1);
    assert_eq!(h.builder.docs_runs(), 1);
    assert_eq!(h.builder.installs().len(), 1);
    assert_eq!(h.server.calls(), vec![ServerCall::Start(1)]);

    let server = h.server.clone();
    h.interrupt().await;
    h.finish().await?;
    assert_eq!(server.running_pid(), None);
    Ok(())
}

#[tokio::test]
async fn source_change_rebuilds_and_replaces_server() -> TestResult {
    init_tracing();

    let h = Harness::spawn(FakeBuilder::new(), FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.change("/proj/main.go").await;
    wait_until("replacement server", || server.running_pid() == Some(2)).await;

    assert_eq!(h.builder.builds_started(), 2);
    assert_eq!(
        h.server.calls(),
        vec![
            ServerCall::Start(1),
            ServerCall::Stop(1),
            ServerCall::Start(2)
        ]
    );

    let builder = h.builder.clone();
    h.interrupt().await;
    h.finish().await?;
    assert_eq!(builder.builds_started(), 2);
    assert_eq!(server.running_pid(), None);
    Ok(())
}

#[tokio::test]
async fn failed_build_keeps_previous_server_running() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::scripted([ScriptedBuild::ok(), ScriptedBuild::fail()]);
    let h = Harness::spawn(builder, FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.change("/proj/main.go").await;
    let builder = h.builder.clone();
    wait_until("failed build", || builder.builds_finished() == 2).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(server.running_pid(), Some(1));
    assert_eq!(server.calls(), vec![ServerCall::Start(1)]);
    assert_eq!(builder.installs().len(), 1);

    h.interrupt().await;
    h.finish().await?;
    assert_eq!(
        server.calls(),
        vec![ServerCall::Start(1), ServerCall::Stop(1)]
    );
    Ok(())
}

#[tokio::test]
async fn interrupt_during_build_stops_server_and_exits_cleanly() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::scripted([
        ScriptedBuild::ok(),
        ScriptedBuild::ok().taking(Duration::from_secs(30)),
    ]);
    let h = Harness::spawn(builder, FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.change("/proj/main.go").await;
    let builder = h.builder.clone();
    wait_until("second build to start", || builder.builds_started() == 2).await;

    h.interrupt().await;
    h.finish().await?;

    assert_eq!(builder.builds_finished(), 1);
    assert_eq!(server.running_pid(), None);
    assert_eq!(
        server.calls(),
        vec![ServerCall::Start(1), ServerCall::Stop(1)]
    );
    Ok(())
}

#[tokio::test]
async fn burst_during_build_causes_exactly_one_more_cycle() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::scripted([
        ScriptedBuild::ok(),
        ScriptedBuild::ok().taking(Duration::from_millis(200)),
    ]);
    let h = Harness::spawn(builder, FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    let builder = h.builder.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.change("/proj/main.go").await;
    wait_until("second build to start", || builder.builds_started() == 2).await;
    for _ in 0..10 {
        h.change("/proj/routes/user.go").await;
    }

    wait_until("third server", || server.running_pid() == Some(3)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(builder.builds_started(), 3);
    assert_eq!(server.starts(), 3);

    h.interrupt().await;
    h.finish().await?;
    Ok(())
}

#[tokio::test]
async fn changes_during_restart_coalesce_without_debounce() -> TestResult {
    init_tracing();

    let server = FakeServer::new().with_stop_delay(Duration::from_millis(300));
    let h = Harness::spawn(FakeBuilder::new(), server, Duration::ZERO);
    let server = h.server.clone();
    let builder = h.builder.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.change("/proj/main.go").await;
    wait_until("restart to begin stopping", || server.stopping()).await;
    for _ in 0..10 {
        h.change("/proj/routes/user.go").await;
    }

    wait_until("third server", || server.running_pid() == Some(3)).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(builder.builds_started(), 3);
    assert_eq!(server.starts(), 3);
    assert_eq!(server.running_pid(), Some(3));

    h.interrupt().await;
    h.finish().await?;
    Ok(())
}

#[tokio::test]
async fn changes_inside_debounce_window_share_one_build() -> TestResult {
    init_tracing();

    let h = Harness::spawn(
        FakeBuilder::new(),
        FakeServer::new(),
        Duration::from_millis(200),
    );
    let server = h.server.clone();
    let builder = h.builder.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    for _ in 0..5 {
        h.change("/proj/main.go").await;
    }
    wait_until("replacement server", || server.running_pid() == Some(2)).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(builder.builds_started(), 2);
    assert_eq!(server.running_pid(), Some(2));

    h.interrupt().await;
    h.finish().await?;
    Ok(())
}

#[tokio::test]
async fn failed_initial_build_waits_for_next_change() -> TestResult {
    init_tracing();

    let builder = FakeBuilder::scripted([ScriptedBuild::fail()]);
    let h = Harness::spawn(builder, FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    let builder = h.builder.clone();
    wait_until("initial build", || builder.builds_finished() == 1).await;

    assert_eq!(server.running_pid(), None);
    assert!(server.calls().is_empty());

    h.change("/proj/main.go").await;
    wait_until("first server", || server.running_pid() == Some(1)).await;

    h.interrupt().await;
    h.finish().await?;
    Ok(())
}

#[tokio::test]
async fn launch_failure_leaves_no_server_and_keeps_watching() -> TestResult {
    init_tracing();

    let h = Harness::spawn(FakeBuilder::new(), FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    let builder = h.builder.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    server.fail_starts(true);
    h.change("/proj/main.go").await;
    wait_until("old server stopped", || server.running_pid().is_none()).await;
    wait_until("second build", || builder.builds_finished() == 2).await;

    server.fail_starts(false);
    h.change("/proj/main.go").await;
    wait_until("recovered server", || server.running_pid() == Some(2)).await;

    h.interrupt().await;
    h.finish().await?;
    Ok(())
}

#[tokio::test]
async fn watch_failure_stops_server_and_surfaces_error() -> TestResult {
    init_tracing();

    let h = Harness::spawn(FakeBuilder::new(), FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    h.tx
        .send(RuntimeEvent::WatchFailed("inotify watch limit reached".into()))
        .await?;
    let result = h.finish().await;

    match result {
        Err(DevloopError::WatchError(msg)) => assert!(msg.contains("inotify")),
        other => panic!("expected WatchError, got {:?}", other),
    }
    assert_eq!(server.running_pid(), None);
    Ok(())
}

#[tokio::test]
async fn closed_event_channel_still_stops_server() -> TestResult {
    init_tracing();

    let h = Harness::spawn(FakeBuilder::new(), FakeServer::new(), Duration::ZERO);
    let server = h.server.clone();
    wait_until("initial server", || server.running_pid() == Some(1)).await;

    let Harness { tx, handle, .. } = h;
    drop(tx);
    devloop_test_utils::with_timeout(handle).await??;

    assert_eq!(server.running_pid(), None);
    Ok(())
}
