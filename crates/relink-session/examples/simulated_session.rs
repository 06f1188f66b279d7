//! Runs a controller against a simulated server that kicks the player every
//! few seconds.
//!
//! ```text
//! cargo run -p relink-session --example simulated_session
//! ```
//!
//! Press Ctrl-C to stop the controller and exit.

use relink_session::observers::{AutoRespawn, LogObserver};
use relink_session::shutdown::stop_on_shutdown;
use relink_session::{
    Action, ConnectError, ConnectionHandle, Connector, Controller, ControllerConfig,
    DomainEvent, EventSink, HandleError, SessionSettings,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct SimulatedHandle {
    task: JoinHandle<()>,
    events: EventSink,
}

impl ConnectionHandle for SimulatedHandle {
    fn send_action(&self, action: Action) -> Result<(), HandleError> {
        tracing::info!(generation = %self.events.generation(), ?action, "server received action");
        Ok(())
    }

    fn close(&self, reason: &str) {
        tracing::info!(generation = %self.events.generation(), reason, "closing simulated session");
        self.task.abort();
    }
}

impl Drop for SimulatedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Accepts every other connection; accepted sessions are kicked after a
/// few seconds.
#[derive(Default)]
struct SimulatedServer {
    connects: Arc<AtomicU32>,
}

impl Connector for SimulatedServer {
    type Handle = SimulatedHandle;

    fn connect(
        &self,
        settings: &SessionSettings,
        events: EventSink,
    ) -> Result<SimulatedHandle, ConnectError> {
        let n = self.connects.fetch_add(1, Ordering::SeqCst);
        if n % 2 == 1 {
            return Err(ConnectError::new(format!(
                "connect ECONNREFUSED {}",
                settings.endpoint
            )));
        }

        let sink = events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            sink.established();
            sink.domain(DomainEvent::Spawned);
            sink.domain(DomainEvent::Chat {
                sender: "alex".into(),
                text: "welcome back".into(),
            });
            tokio::time::sleep(Duration::from_secs(2)).await;
            sink.domain(DomainEvent::Health {
                health: 0.0,
                food: 18.0,
            });
            tokio::time::sleep(Duration::from_secs(2)).await;
            sink.terminated("kicked: flying is not enabled on this server");
        });

        Ok(SimulatedHandle { task, events })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = ControllerConfig::builder()
        .name("simulated")
        .base_delay(Duration::from_secs(1))
        .delay_ceiling(Duration::from_secs(4))
        .on_state_change(|from, to| println!("state: {from} -> {to}"))
        .apply_env_overrides()?
        .build();

    let controller = Controller::spawn(
        SimulatedServer::default(),
        SessionSettings::from_env()?,
        config,
    );
    controller.observe(LogObserver)?;
    controller.observe(AutoRespawn::new(controller.action_sender()))?;
    controller.start().await;

    let status = controller.subscribe_status();
    let reporter = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(3));
        loop {
            ticker.tick().await;
            let snapshot = status.snapshot();
            println!(
                "status: {} attempts={} pending={:?} last_error={:?}",
                snapshot.state, snapshot.attempts, snapshot.pending, snapshot.last_error
            );
        }
    });

    stop_on_shutdown(controller).await?;
    reporter.abort();
    Ok(())
}
