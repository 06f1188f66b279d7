//! Connection lifecycle and reconnection control for long-lived game sessions.
//!
//! A [`Controller`] keeps one session connected to a game server. It builds
//! a connection handle through a [`Connector`], listens to that handle's
//! events, and when the connection drops it tears the handle down and
//! reconnects with a bounded, linearly growing delay. When the attempt
//! budget is spent it backs off into a long cooldown and then starts over.
//!
//! # Features
//!
//! - **Single-owner driver**: every transition runs in one task, so a retry
//!   can never race a teardown
//! - **Generation-tagged events**: events from a superseded handle are
//!   dropped, never acted on
//! - **One timer at a time**: retry, cooldown and endpoint switch timers
//!   are mutually exclusive and cancelled by `stop`
//! - **Status snapshots**: immutable [`StatusSnapshot`]s for web or CLI
//!   front ends
//! - **Event system**: [`ControllerEvent`]s for lifecycle observability
//!
//! # Example
//!
//! ```rust,no_run
//! use relink_session::{
//!     Action, ConnectError, ConnectionHandle, Connector, Controller, ControllerConfig,
//!     EventSink, HandleError, SessionSettings,
//! };
//! use std::time::Duration;
//!
//! struct Offline;
//!
//! impl ConnectionHandle for Offline {
//!     fn send_action(&self, _action: Action) -> Result<(), HandleError> {
//!         Ok(())
//!     }
//!
//!     fn close(&self, _reason: &str) {}
//! }
//!
//! struct OfflineConnector;
//!
//! impl Connector for OfflineConnector {
//!     type Handle = Offline;
//!
//!     fn connect(
//!         &self,
//!         _settings: &SessionSettings,
//!         events: EventSink,
//!     ) -> Result<Offline, ConnectError> {
//!         events.established();
//!         Ok(Offline)
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::builder()
//!     .max_attempts(5)
//!     .base_delay(Duration::from_secs(5))
//!     .on_retry(|attempt, delay| println!("retry #{attempt} in {delay:?}"))
//!     .build();
//!
//! let controller = Controller::spawn(OfflineConnector, SessionSettings::from_env()?, config);
//! controller.start().await;
//! controller
//!     .subscribe_status()
//!     .wait_for(|status| status.is_connected())
//!     .await;
//! controller.chat("hello").await?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod controller;
mod error;
mod events;
mod handle;
pub mod observers;
mod router;
mod service;
pub mod shutdown;
mod state;

pub use backoff::BackoffPolicy;
pub use config::{
    AuthMode, ControllerConfig, ControllerConfigBuilder, Credentials, Endpoint, SessionSettings,
    DEFAULT_PORT,
};
pub use controller::{ActionSender, Controller};
pub use error::{ConfigError, ConnectError, ControllerError, EndpointError, HandleError};
pub use events::{ControllerEvent, ResetCause};
pub use handle::{
    Action, ConnectionHandle, Connector, DomainEvent, EventSink, HandleEvent, SessionEvent,
};
pub use service::ActionService;
pub use state::{ConnectionState, PendingTimer, StatusHandle, StatusSnapshot};

pub use relink_core::{EventListener, FnListener, Generation, LinkEvent};
