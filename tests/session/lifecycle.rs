use super::support::Harness;
use relink_session::{ConnectionState, ControllerEvent, PendingTimer};
use std::time::Duration;
use tokio::time::Instant;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test(start_paused = true)]
async fn kicked_then_end_counts_once() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let session = harness.next_session().await;
    harness.establish(&session).await;
    session.sink.terminated("kicked: You have been idle for too long");
    session.sink.terminated("socketClosed");
    harness.settle().await;

    let status = harness.status();
    assert_eq!(status.attempts, 1);
    assert_eq!(status.pending, Some(PendingTimer::Retry));
    assert_eq!(
        status.last_error.as_deref(),
        Some("kicked: You have been idle for too long")
    );
    assert_eq!(harness.retry_delays(), vec![Duration::from_secs(5)]);
    assert_eq!(harness.stale_drops(), 1);
    assert_eq!(session.close_reason(), None);
}

#[tokio::test(start_paused = true)]
async fn late_event_from_superseded_handle_is_ignored() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let old = harness.next_session().await;
    harness.establish(&old).await;
    old.sink.faulted("read ECONNRESET");

    let current = harness.next_session().await;
    harness.establish(&current).await;
    let before = harness.status();

    old.sink.terminated("kicked");
    old.sink.established();
    harness.settle().await;

    assert_eq!(harness.status(), before);
    assert_eq!(harness.stale_drops(), 2);
    assert_eq!(harness.retry_delays().len(), 1);

    let dropped = harness
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ControllerEvent::StaleEventDropped {
                generation,
                current: live,
                ..
            } => Some((generation, live)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert!(dropped
        .iter()
        .all(|(generation, live)| *generation == old.sink.generation()
            && *live == Some(current.sink.generation())));
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_retry() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let session = harness.next_session().await;
    session.sink.faulted("connect ETIMEDOUT");
    harness
        .wait_for(|s| s.pending == Some(PendingTimer::Retry))
        .await;

    harness.controller.stop().await;
    let status = harness.status();
    assert!(status.dormant);
    assert_eq!(status.pending, None);
    assert_eq!(status.attempts, 1);
    assert!(harness.quiet_for(HOUR).await);
    assert_eq!(harness.connect_attempts(), 1);

    let restarted_at = Instant::now();
    harness.controller.start().await;
    let session = harness.next_session().await;
    assert_eq!(session.opened_at, restarted_at);
}

#[tokio::test(start_paused = true)]
async fn stop_suppresses_in_flight_events() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let session = harness.next_session().await;
    harness.establish(&session).await;
    harness.controller.stop().await;
    assert_eq!(session.close_reason().as_deref(), Some("stopped"));

    session.sink.terminated("socketClosed");
    harness.settle().await;

    let status = harness.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.attempts, 0);
    assert_eq!(status.pending, None);
    assert!(harness.quiet_for(HOUR).await);
}

#[tokio::test(start_paused = true)]
async fn start_is_a_no_op_while_retry_pending() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let session = harness.next_session().await;
    let dropped_at = Instant::now();
    session.sink.faulted("connect ECONNREFUSED");
    harness
        .wait_for(|s| s.pending == Some(PendingTimer::Retry))
        .await;

    harness.controller.start().await;
    harness.controller.start().await;

    let session = harness.next_session().await;
    assert_eq!(session.opened_at - dropped_at, Duration::from_secs(5));
    assert_eq!(harness.connect_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn construction_failure_follows_the_failure_path() {
    let mut harness = Harness::new();
    harness.refuse_next(1);

    let started_at = Instant::now();
    harness.controller.start().await;

    let status = harness.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.attempts, 1);
    assert_eq!(status.pending, Some(PendingTimer::Retry));
    assert_eq!(status.generation, None);
    assert_eq!(
        status.last_error.as_deref(),
        Some("connection setup failed: connect ECONNREFUSED")
    );

    let session = harness.next_session().await;
    assert_eq!(session.opened_at - started_at, Duration::from_secs(5));
    assert_eq!(harness.status().generation, Some(2));
}

#[tokio::test(start_paused = true)]
async fn status_never_reports_a_torn_down_handle_as_connected() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let session = harness.next_session().await;
    harness.establish(&session).await;

    let mut status = harness.controller.subscribe_status();
    session.sink.faulted("read ECONNRESET");
    let snapshot = status
        .wait_for(|s| s.state != ConnectionState::Connected)
        .await
        .unwrap();
    assert_eq!(snapshot.generation, None);
    assert_eq!(snapshot.state, ConnectionState::Disconnected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn acknowledged_commands_are_visible_from_other_threads() {
    let mut harness = Harness::new();

    for round in 0..200 {
        harness.controller.start().await;
        let status = harness.status();
        assert!(!status.dormant, "round {round}: start not visible");
        assert_eq!(status.state, ConnectionState::Connecting);

        let session = harness.next_session().await;
        harness.establish(&session).await;

        harness.controller.stop().await;
        let status = harness.status();
        assert!(!status.is_connected(), "round {round}: connected after stop");
        assert!(status.dormant);
        assert_eq!(status.generation, None);
        assert_eq!(session.close_reason().as_deref(), Some("stopped"));

        let host = format!("node{round}.example.net");
        harness
            .controller
            .change_endpoint(&host, 25565, None)
            .await
            .unwrap();
        let status = harness.status();
        assert_eq!(status.endpoint.host(), host);
        assert_eq!(status.pending, Some(PendingTimer::Switch));

        harness.controller.stop().await;
        assert_eq!(harness.status().pending, None);
    }
}
