//! The reconnection controller.
//!
//! A [`Controller`] is a cheap, cloneable front for a driver task that owns
//! the connection handle. Every transition (connect, established, teardown,
//! retry scheduling, timer expiry) runs inside that one task, so transitions
//! never race each other. Control surfaces talk to the driver over a command
//! channel and read its state through an immutable [`StatusSnapshot`].
//!
//! Invariants held by the driver:
//! - at most one live handle, and the router is registered to exactly that
//!   handle's generation;
//! - a handle is detached and dropped before any retry is scheduled;
//! - at most one timer (retry, cooldown or switch) is armed, and only while
//!   no handle exists.

use crate::config::{ControllerConfig, Endpoint, SessionSettings};
use crate::error::ControllerError;
use crate::events::{ControllerEvent, ResetCause};
use crate::handle::{Action, ConnectionHandle, Connector, Envelope, EventSink, SessionEvent};
use crate::router::{EventRouter, Lifecycle, Routed};
use crate::state::{ConnectionState, PendingTimer, StatusHandle, StatusSnapshot};
#[cfg(feature = "metrics")]
use metrics::{counter, gauge};
use relink_core::events::{BoxedEventListener, EventListener};
use relink_core::generation::{Generation, GenerationCounter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
    Restart(oneshot::Sender<()>),
    ChangeEndpoint(Endpoint, oneshot::Sender<()>),
    Send(Action, oneshot::Sender<Result<(), ControllerError>>),
    Submit(Action),
    Observe(BoxedEventListener<SessionEvent>),
}

/// Handle to a running reconnection controller.
///
/// Cloning yields another handle to the same controller. The driver task
/// stops once every `Controller` clone has been dropped, closing the live
/// connection on its way out.
#[derive(Clone)]
pub struct Controller {
    commands: mpsc::UnboundedSender<Command>,
    status: StatusHandle,
    command_prefix: Arc<str>,
}

impl Controller {
    /// Spawns the driver task on the current tokio runtime.
    ///
    /// The controller starts dormant; call [`start`](Self::start) to begin
    /// connecting.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<C: Connector>(
        connector: C,
        settings: SessionSettings,
        config: ControllerConfig,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::initial(
            settings.endpoint.clone(),
            settings.credentials.username.clone(),
        ));

        let command_prefix: Arc<str> = Arc::from(config.command_prefix.as_str());
        let driver = Driver {
            connector,
            settings: Arc::new(settings),
            router: EventRouter::new(config.name.clone(), config.session_observers.clone()),
            config,
            generations: GenerationCounter::new(),
            live: None,
            state: ConnectionState::Disconnected,
            attempts: 0,
            last_error: None,
            timer: None,
            stability: None,
            dormant: true,
            events_tx,
            status_tx,
        };
        tokio::spawn(driver.run(commands_rx, events_rx));

        Self {
            commands: commands_tx,
            status: StatusHandle::new(status_rx),
            command_prefix,
        }
    }

    /// Begins connecting if the controller is idle.
    ///
    /// Wakes a stopped controller. A no-op while a handle exists or a retry
    /// is already pending.
    pub async fn start(&self) {
        if self.request(Command::Start).await.is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!("start ignored: controller is no longer running");
        }
    }

    /// Tears down the live handle, cancels any pending timer and goes
    /// dormant until the next [`start`](Self::start).
    pub async fn stop(&self) {
        if self.request(Command::Stop).await.is_err() {
            #[cfg(feature = "tracing")]
            tracing::debug!("stop ignored: controller is no longer running");
        }
    }

    /// Drops the live handle and reconnects to the same endpoint after the
    /// switch delay, with a fresh attempt budget.
    pub async fn restart(&self) -> Result<(), ControllerError> {
        self.request(Command::Restart).await
    }

    /// Points the controller at a new server.
    ///
    /// The endpoint is validated first; an invalid one is rejected without
    /// touching any state. Otherwise the attempt counter is reset, any live
    /// handle is closed and exactly one fresh connection attempt follows
    /// after the switch delay.
    pub async fn change_endpoint(
        &self,
        host: &str,
        port: u32,
        version: Option<&str>,
    ) -> Result<(), ControllerError> {
        let endpoint = Endpoint::new(host, port, version)?;
        self.request(|ack| Command::ChangeEndpoint(endpoint, ack))
            .await
    }

    /// Sends an outbound action through the live connection.
    pub async fn send(&self, action: Action) -> Result<(), ControllerError> {
        self.request(|reply| Command::Send(action, reply)).await?
    }

    /// Sends a public chat line.
    pub async fn chat(&self, text: impl Into<String>) -> Result<(), ControllerError> {
        self.send(Action::Chat(text.into())).await
    }

    /// Forwards a command line on behalf of `source`.
    ///
    /// The configured command prefix is prepended when missing.
    pub async fn dispatch(
        &self,
        source: impl Into<String>,
        command: &str,
    ) -> Result<(), ControllerError> {
        let line = normalize_command(&self.command_prefix, command);
        self.send(Action::Command {
            source: source.into(),
            line,
        })
        .await
    }

    /// Registers another observer of domain events.
    pub fn observe<L>(&self, observer: L) -> Result<(), ControllerError>
    where
        L: EventListener<SessionEvent> + 'static,
    {
        self.commands
            .send(Command::Observe(Arc::new(observer)))
            .map_err(|_| ControllerError::Closed)
    }

    /// Returns the latest status snapshot without waiting.
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Returns a read-only status handle for another task.
    pub fn subscribe_status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Returns a sender for fire-and-forget actions that does not keep the
    /// controller alive.
    pub fn action_sender(&self) -> ActionSender {
        ActionSender {
            commands: self.commands.downgrade(),
        }
    }

    /// Returns true once the driver task has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn request<T, F>(&self, make: F) -> Result<T, ControllerError>
    where
        F: FnOnce(oneshot::Sender<T>) -> Command,
    {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("status", &self.status.snapshot())
            .finish()
    }
}

/// Fire-and-forget access to the live connection.
///
/// Holds only a weak reference to the controller, so observers owned by the
/// controller can keep one without creating a cycle.
#[derive(Clone)]
pub struct ActionSender {
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl ActionSender {
    /// Queues `action` for the live connection.
    ///
    /// Delivery is best effort: the action is dropped (and logged) if the
    /// controller is not connected when it gets there.
    pub fn submit(&self, action: Action) -> Result<(), ControllerError> {
        let commands = self.commands.upgrade().ok_or(ControllerError::Closed)?;
        commands
            .send(Command::Submit(action))
            .map_err(|_| ControllerError::Closed)
    }
}

impl std::fmt::Debug for ActionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSender").finish_non_exhaustive()
    }
}

pub(crate) fn normalize_command(prefix: &str, command: &str) -> String {
    let command = command.trim();
    if command.starts_with(prefix) {
        command.to_owned()
    } else {
        format!("{prefix}{command}")
    }
}

struct Live<H> {
    generation: Generation,
    handle: H,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    kind: PendingTimer,
    deadline: Instant,
}

struct Driver<C: Connector> {
    connector: C,
    settings: Arc<SessionSettings>,
    config: ControllerConfig,
    generations: GenerationCounter,
    router: EventRouter,
    live: Option<Live<C::Handle>>,
    state: ConnectionState,
    attempts: u32,
    last_error: Option<String>,
    timer: Option<Timer>,
    stability: Option<Instant>,
    dormant: bool,
    events_tx: mpsc::UnboundedSender<Envelope>,
    status_tx: watch::Sender<StatusSnapshot>,
}

/// Acknowledgement owed to a caller, sent once the turn's snapshot is out.
enum Reply {
    None,
    Done(oneshot::Sender<()>),
    Sent(
        oneshot::Sender<Result<(), ControllerError>>,
        Result<(), ControllerError>,
    ),
}

impl Reply {
    fn send(self) {
        match self {
            Reply::None => {}
            Reply::Done(ack) => {
                let _ = ack.send(());
            }
            Reply::Sent(reply, result) => {
                let _ = reply.send(result);
            }
        }
    }
}

/// Deadlines past what `Instant` can represent are pushed out to roughly
/// thirty years, the same horizon tokio uses for an unbounded sleep.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(delay).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<C: Connector> Driver<C> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<Envelope>,
    ) {
        loop {
            let timer = self.timer.map(|timer| timer.deadline);
            let stability = self.stability;

            let reply = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.on_command(command),
                    None => break,
                },
                Some(envelope) = events.recv() => {
                    self.on_envelope(envelope);
                    Reply::None
                }
                _ = sleep_until(timer) => {
                    self.on_timer();
                    Reply::None
                }
                _ = sleep_until(stability) => {
                    self.on_stability_elapsed();
                    Reply::None
                }
            };
            // Callers must observe the snapshot of the transition they asked for.
            self.publish();
            reply.send();
        }

        if let Some(live) = self.teardown() {
            live.handle.close("controller shut down");
        }
        self.publish();
        #[cfg(feature = "tracing")]
        tracing::debug!(controller = %self.config.name, "controller task exited");
    }

    fn on_command(&mut self, command: Command) -> Reply {
        match command {
            Command::Start(ack) => {
                self.start();
                Reply::Done(ack)
            }
            Command::Stop(ack) => {
                self.stop();
                Reply::Done(ack)
            }
            Command::Restart(ack) => {
                self.switch(ResetCause::Restart, "restart requested");
                Reply::Done(ack)
            }
            Command::ChangeEndpoint(endpoint, ack) => {
                self.change_endpoint(endpoint);
                Reply::Done(ack)
            }
            Command::Send(action, reply) => Reply::Sent(reply, self.send_action(action)),
            Command::Submit(action) => {
                if let Err(_error) = self.send_action(action) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %_error, "dropped submitted action");
                }
                Reply::None
            }
            Command::Observe(observer) => {
                self.router.add_observer(observer);
                Reply::None
            }
        }
    }

    fn on_envelope(&mut self, envelope: Envelope) {
        match self.router.route(envelope) {
            Routed::Lifecycle(generation, Lifecycle::Established) => {
                self.on_established(generation)
            }
            Routed::Lifecycle(generation, Lifecycle::Terminated(reason)) => {
                self.on_failure(generation, reason)
            }
            Routed::Lifecycle(generation, Lifecycle::Faulted(error)) => {
                self.on_failure(generation, error)
            }
            Routed::Delivered => {}
            Routed::Stale(generation) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    generation = generation.get(),
                    current = ?self.router.current().map(Generation::get),
                    "dropped event from superseded handle"
                );
                self.emit(ControllerEvent::StaleEventDropped {
                    name: self.config.name.clone(),
                    timestamp: std::time::Instant::now(),
                    generation,
                    current: self.router.current(),
                });
            }
        }
    }

    fn start(&mut self) {
        self.dormant = false;
        if self.state != ConnectionState::Disconnected
            || self.live.is_some()
            || self.timer.is_some()
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                state = %self.state,
                pending = ?self.timer.map(|t| t.kind),
                "start ignored: connection already in progress"
            );
            return;
        }
        self.connect();
    }

    fn stop(&mut self) {
        self.dormant = true;
        self.timer = None;
        if let Some(live) = self.teardown() {
            live.handle.close("stopped");
        }

        #[cfg(feature = "tracing")]
        tracing::info!(controller = %self.config.name, "controller stopped");

        self.emit(ControllerEvent::Stopped {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
        });
    }

    fn change_endpoint(&mut self, endpoint: Endpoint) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            from = %self.settings.endpoint,
            to = %endpoint,
            "changing endpoint"
        );

        self.emit(ControllerEvent::EndpointChanged {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            endpoint: endpoint.to_string(),
        });
        self.settings = Arc::new(self.settings.with_endpoint(endpoint));
        self.switch(ResetCause::EndpointChange, "endpoint changed");
    }

    /// Closes any live handle outside the failure path and arms the one
    /// switch timer that leads to the next connect.
    fn switch(&mut self, cause: ResetCause, reason: &str) {
        self.dormant = false;
        self.timer = None;
        if let Some(live) = self.teardown() {
            live.handle.close(reason);
        }
        self.reset_attempts(cause);
        self.arm(PendingTimer::Switch, self.config.switch_delay);
    }

    fn connect(&mut self) {
        debug_assert!(self.live.is_none(), "connect with a live handle");
        debug_assert!(self.timer.is_none(), "connect with a pending timer");

        let generation = self.generations.next();
        let settings = Arc::clone(&self.settings);

        #[cfg(feature = "tracing")]
        tracing::info!(
            endpoint = %settings.endpoint,
            username = %settings.credentials.username,
            generation = generation.get(),
            attempts = self.attempts,
            "connecting"
        );
        #[cfg(feature = "metrics")]
        counter!("relink_connect_attempts_total", "controller" => self.config.name.clone())
            .increment(1);

        self.emit(ControllerEvent::ConnectAttempt {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            generation,
            endpoint: settings.endpoint.to_string(),
            attempts: self.attempts,
        });

        self.router.attach(generation);
        self.transition(ConnectionState::Connecting);

        let sink = EventSink::new(generation, self.events_tx.clone());
        match self.connector.connect(&settings, sink) {
            Ok(handle) => self.live = Some(Live { generation, handle }),
            Err(error) => self.on_failure(generation, error.to_string()),
        }
    }

    fn on_established(&mut self, generation: Generation) {
        if self.state != ConnectionState::Connecting {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            endpoint = %self.settings.endpoint,
            generation = generation.get(),
            "connection established"
        );

        self.transition(ConnectionState::Connected);
        self.stability = Some(deadline_after(self.config.stability_window));
        self.emit(ControllerEvent::Established {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            generation,
        });
    }

    /// The single failure path: terminated, faulted and construction errors
    /// all end here.
    fn on_failure(&mut self, generation: Generation, reason: String) {
        drop(self.teardown());
        self.attempts = self.attempts.saturating_add(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            generation = generation.get(),
            attempts = self.attempts,
            reason = %reason,
            "connection lost"
        );
        #[cfg(feature = "metrics")]
        counter!("relink_disconnects_total", "controller" => self.config.name.clone())
            .increment(1);

        self.emit(ControllerEvent::Disconnected {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            generation,
            reason: reason.clone(),
            attempts: self.attempts,
        });
        self.last_error = Some(reason);
        self.schedule_retry();
    }

    /// Detaches the router and releases the live handle, if any.
    ///
    /// The caller decides whether the released handle gets closed.
    fn teardown(&mut self) -> Option<Live<C::Handle>> {
        self.router.detach();
        self.stability = None;
        let live = self.live.take();
        self.transition(ConnectionState::Disconnected);
        live
    }

    fn schedule_retry(&mut self) {
        if self.dormant {
            return;
        }

        if self.attempts > self.config.max_attempts {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                attempts = self.attempts,
                max_attempts = self.config.max_attempts,
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "reconnect budget exhausted, cooling down"
            );
            #[cfg(feature = "metrics")]
            counter!("relink_cooldowns_total", "controller" => self.config.name.clone())
                .increment(1);

            self.arm(PendingTimer::Cooldown, self.config.cooldown);
            self.emit(ControllerEvent::CooldownEntered {
                name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                attempts: self.attempts,
                duration: self.config.cooldown,
            });
        } else {
            let delay = self.config.backoff.delay(self.attempts);

            #[cfg(feature = "tracing")]
            tracing::info!(
                attempt = self.attempts,
                max_attempts = self.config.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "reconnect scheduled"
            );

            self.arm(PendingTimer::Retry, delay);
            self.emit(ControllerEvent::RetryScheduled {
                name: self.config.name.clone(),
                timestamp: std::time::Instant::now(),
                attempt: self.attempts,
                delay,
            });
        }
    }

    fn arm(&mut self, kind: PendingTimer, delay: Duration) {
        debug_assert!(self.timer.is_none(), "{kind:?} armed over a pending timer");
        if self.timer.is_some() {
            return;
        }
        self.timer = Some(Timer {
            kind,
            deadline: deadline_after(delay),
        });
    }

    fn on_timer(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        if self.dormant || self.live.is_some() {
            return;
        }
        if timer.kind == PendingTimer::Cooldown {
            self.reset_attempts(ResetCause::Cooldown);
        }
        self.connect();
    }

    fn on_stability_elapsed(&mut self) {
        self.stability = None;
        if self.state == ConnectionState::Connected {
            self.reset_attempts(ResetCause::StabilityWindow);
        }
    }

    fn reset_attempts(&mut self, cause: ResetCause) {
        if self.attempts == 0 {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(attempts = self.attempts, cause = ?cause, "attempt counter reset");

        self.attempts = 0;
        self.emit(ControllerEvent::AttemptsReset {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            cause,
        });
    }

    fn send_action(&self, action: Action) -> Result<(), ControllerError> {
        match (&self.live, self.state) {
            (Some(live), ConnectionState::Connected) => Ok(live.handle.send_action(action)?),
            _ => Err(ControllerError::NotConnected),
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;

        #[cfg(feature = "tracing")]
        tracing::debug!(from = %from, to = %to, "connection state transition");
        #[cfg(feature = "metrics")]
        gauge!("relink_connection_state", "controller" => self.config.name.clone())
            .set(to.as_gauge());

        self.emit(ControllerEvent::StateTransition {
            name: self.config.name.clone(),
            timestamp: std::time::Instant::now(),
            from,
            to,
        });
    }

    fn emit(&self, event: ControllerEvent) {
        self.config.event_listeners.emit(&event);
    }

    fn publish(&self) {
        let snapshot = StatusSnapshot {
            state: self.state,
            attempts: self.attempts,
            last_error: self.last_error.clone(),
            endpoint: self.settings.endpoint.clone(),
            username: self.settings.credentials.username.clone(),
            generation: self.live.as_ref().map(|live| live.generation.get()),
            pending: self.timer.map(|timer| timer.kind),
            dormant: self.dormant,
        };
        self.status_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
