use super::support::Harness;
use relink_session::observers::AutoRespawn;
use relink_session::{Action, ControllerError, DomainEvent, FnListener, SessionEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::{Service, ServiceExt};

#[tokio::test(start_paused = true)]
async fn actions_require_a_connected_session() {
    let mut harness = Harness::new();
    assert_eq!(
        harness.controller.chat("hello").await,
        Err(ControllerError::NotConnected)
    );

    harness.controller.start().await;
    let session = harness.next_session().await;
    assert_eq!(
        harness.controller.send(Action::Respawn).await,
        Err(ControllerError::NotConnected)
    );

    harness.establish(&session).await;
    harness.controller.chat("hello").await.unwrap();
    harness
        .controller
        .dispatch("WebInterface", "goto 10 64 -3")
        .await
        .unwrap();
    harness
        .controller
        .dispatch("alex", ".follow alex")
        .await
        .unwrap();

    assert_eq!(
        session.sent(),
        vec![
            Action::Chat("hello".into()),
            Action::Command {
                source: "WebInterface".into(),
                line: ".goto 10 64 -3".into(),
            },
            Action::Command {
                source: "alex".into(),
                line: ".follow alex".into(),
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn custom_prefix_is_applied() {
    let mut harness = Harness::with_config(|b| b.command_prefix("!"));
    harness.controller.start().await;
    let session = harness.next_session().await;
    harness.establish(&session).await;

    harness.controller.dispatch("console", "home").await.unwrap();
    assert_eq!(
        session.sent(),
        vec![Action::Command {
            source: "console".into(),
            line: "!home".into(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn handle_rejection_is_surfaced() {
    let mut harness = Harness::new();
    harness.controller.start().await;
    let session = harness.next_session().await;
    harness.establish(&session).await;

    *session.closed.lock().unwrap() = Some("socket gone".into());
    let result = harness.controller.chat("anyone there?").await;
    assert!(matches!(result, Err(ControllerError::Handle(_))));
}

#[tokio::test(start_paused = true)]
async fn observers_see_only_live_domain_events() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut harness = {
        let seen = Arc::clone(&seen);
        Harness::with_config(move |b| {
            b.observer(move |event: &SessionEvent| {
                seen.lock().unwrap().push((event.generation, event.kind.clone()));
            })
        })
    };
    harness.controller.start().await;

    let old = harness.next_session().await;
    harness.establish(&old).await;
    old.sink.domain(DomainEvent::Spawned);
    old.sink.faulted("read ECONNRESET");

    let current = harness.next_session().await;
    harness.establish(&current).await;
    old.sink.domain(DomainEvent::Chat {
        sender: "ghost".into(),
        text: "boo".into(),
    });
    current.sink.domain(DomainEvent::Whisper {
        sender: "alex".into(),
        text: "come here".into(),
    });
    harness.settle().await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (old.sink.generation(), DomainEvent::Spawned),
            (
                current.sink.generation(),
                DomainEvent::Whisper {
                    sender: "alex".into(),
                    text: "come here".into(),
                }
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn auto_respawn_follows_reconnects() {
    let mut harness = Harness::new();
    let controller = harness.controller.clone();
    controller
        .observe(AutoRespawn::new(controller.action_sender()))
        .unwrap();
    let chats = Arc::new(Mutex::new(0usize));
    {
        let chats = Arc::clone(&chats);
        controller
            .observe(FnListener::new(move |event: &SessionEvent| {
                if matches!(event.kind, DomainEvent::Chat { .. }) {
                    *chats.lock().unwrap() += 1;
                }
            }))
            .unwrap();
    }
    controller.start().await;

    let first = harness.next_session().await;
    harness.establish(&first).await;
    first.sink.faulted("read ECONNRESET");

    let second = harness.next_session().await;
    harness.establish(&second).await;
    second.sink.domain(DomainEvent::Health {
        health: 0.0,
        food: 20.0,
    });
    second.sink.domain(DomainEvent::Chat {
        sender: "alex".into(),
        text: "rip".into(),
    });
    harness.settle().await;

    assert!(first.sent().is_empty());
    assert_eq!(second.sent(), vec![Action::Respawn]);
    assert_eq!(*chats.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn action_service_composes_with_tower() {
    let mut harness = Harness::new();
    harness.controller.start().await;
    let session = harness.next_session().await;

    let mut service = harness.controller.service();
    let early = service
        .ready()
        .await
        .unwrap()
        .call(Action::Chat("too soon".into()))
        .await;
    assert_eq!(early, Err(ControllerError::NotConnected));

    harness.establish(&session).await;
    let actions = vec![Action::Chat("one".into()), Action::Chat("two".into())];
    for action in actions.clone() {
        service.ready().await.unwrap().call(action).await.unwrap();
    }
    assert_eq!(session.sent(), actions);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_controller_closes_the_session() {
    let mut harness = Harness::new();
    harness.controller.start().await;
    let session = harness.next_session().await;
    harness.establish(&session).await;

    let status = harness.controller.subscribe_status();
    let sender = harness.controller.action_sender();
    drop(harness);
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(
        session.close_reason().as_deref(),
        Some("controller shut down")
    );
    assert!(!status.snapshot().is_connected());
    assert_eq!(sender.submit(Action::Respawn), Err(ControllerError::Closed));
}
