use super::support::Harness;
use relink_session::{ConnectionState, PendingTimer, ResetCause};
use std::time::Duration;
use tokio::time::Instant;

const SECOND: Duration = Duration::from_secs(1);

#[tokio::test(start_paused = true)]
async fn linear_delays_then_cooldown() {
    let mut harness = Harness::new();
    harness.controller.start().await;

    let mut session = harness.next_session().await;
    for expected in [5u64, 10, 15, 20, 25] {
        harness.establish(&session).await;
        tokio::time::sleep(SECOND).await;

        let dropped_at = Instant::now();
        session.sink.faulted("read ECONNRESET");
        session = harness.next_session().await;
        assert_eq!(
            session.opened_at - dropped_at,
            Duration::from_secs(expected)
        );
    }

    harness.establish(&session).await;
    tokio::time::sleep(SECOND).await;
    let dropped_at = Instant::now();
    session.sink.faulted("read ECONNRESET");

    let status = harness
        .wait_for(|s| s.pending == Some(PendingTimer::Cooldown))
        .await;
    assert_eq!(status.attempts, 6);
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert!(status.is_cooling_down());
    assert_eq!(harness.cooldowns(), 1);

    let session = harness.next_session().await;
    assert_eq!(session.opened_at - dropped_at, Duration::from_secs(300));
    assert_eq!(harness.status().attempts, 0);
    assert_eq!(harness.resets(), vec![ResetCause::Cooldown]);
    assert_eq!(
        harness.retry_delays(),
        [5, 10, 15, 20, 25].map(Duration::from_secs).to_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn delays_are_capped_at_the_ceiling() {
    let mut harness = Harness::with_config(|b| {
        b.max_attempts(10)
            .base_delay(Duration::from_secs(10))
            .delay_ceiling(Duration::from_secs(30))
    });
    harness.refuse_next(5);
    harness.controller.start().await;

    harness.next_session().await;
    assert_eq!(
        harness.retry_delays(),
        [10, 20, 30, 30, 30].map(Duration::from_secs).to_vec()
    );
    assert_eq!(harness.connect_attempts(), 6);
}

#[tokio::test(start_paused = true)]
async fn stability_window_resets_attempts() {
    let mut harness = Harness::new();
    harness.refuse_next(2);
    harness.controller.start().await;

    let session = harness.next_session().await;
    let status = harness.establish(&session).await;
    assert_eq!(status.attempts, 2);

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(harness.status().attempts, 2);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(harness.status().attempts, 0);
    assert_eq!(harness.resets(), vec![ResetCause::StabilityWindow]);

    let dropped_at = Instant::now();
    session.sink.terminated("kicked: server restarting");
    let session = harness.next_session().await;
    assert_eq!(session.opened_at - dropped_at, Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn early_drop_keeps_attempts() {
    let mut harness = Harness::new();
    harness.refuse_next(2);
    harness.controller.start().await;

    let session = harness.next_session().await;
    harness.establish(&session).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let dropped_at = Instant::now();
    session.sink.terminated("kicked");
    let session = harness.next_session().await;

    assert_eq!(session.opened_at - dropped_at, Duration::from_secs(15));
    assert_eq!(harness.status().attempts, 3);
    assert!(harness.resets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unbounded_stability_window_never_resets() {
    let mut harness = Harness::with_config(|b| b.stability_window(Duration::MAX));
    harness.refuse_next(1);
    harness.controller.start().await;

    let session = harness.next_session().await;
    harness.establish(&session).await;
    tokio::time::sleep(Duration::from_secs(24 * 3600)).await;

    let status = harness.status();
    assert!(status.is_connected());
    assert_eq!(status.attempts, 1);
    assert!(harness.resets().is_empty());

    harness.controller.restart().await.unwrap();
    assert!(!harness.controller.is_closed());
    harness.next_session().await;
}

#[tokio::test(start_paused = true)]
async fn unbounded_cooldown_keeps_controller_alive() {
    let mut harness = Harness::with_config(|b| b.max_attempts(0).cooldown(Duration::MAX));
    harness.controller.start().await;

    let session = harness.next_session().await;
    session.sink.faulted("read ECONNRESET");
    let status = harness
        .wait_for(|s| s.pending == Some(PendingTimer::Cooldown))
        .await;
    assert_eq!(status.attempts, 1);
    assert!(harness.quiet_for(Duration::from_secs(24 * 3600)).await);

    let restarted_at = Instant::now();
    harness.controller.restart().await.unwrap();
    let session = harness.next_session().await;
    assert_eq!(session.opened_at - restarted_at, Duration::from_secs(1));
}
