use crate::backoff::BackoffPolicy;
use crate::error::{ConfigError, EndpointError};
use crate::events::ControllerEvent;
use crate::handle::SessionEvent;
use relink_core::events::{EventListeners, FnListener};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Port used when the caller supplies none.
pub const DEFAULT_PORT: u16 = 25565;

/// Address and protocol version of the remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Endpoint {
    host: String,
    port: u16,
    version: Option<String>,
}

impl Endpoint {
    /// Validates and builds an endpoint.
    ///
    /// The host is trimmed and must not be empty; the port must lie in
    /// `1..=65535`. An empty or blank version means "auto-detect".
    pub fn new(
        host: impl AsRef<str>,
        port: u32,
        version: Option<&str>,
    ) -> Result<Self, EndpointError> {
        let host = host.as_ref().trim();
        if host.is_empty() {
            return Err(EndpointError::MissingHost);
        }
        let port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or(EndpointError::InvalidPort(port))?;
        let version = version
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        Ok(Self {
            host: host.to_owned(),
            port,
            version,
        })
    }

    /// Like [`Endpoint::new`], but a missing or zero port falls back to
    /// [`DEFAULT_PORT`], the way form and environment input is read.
    pub fn with_default_port(
        host: impl AsRef<str>,
        port: Option<u32>,
        version: Option<&str>,
    ) -> Result<Self, EndpointError> {
        let port = port
            .filter(|p| *p != 0)
            .unwrap_or(u32::from(DEFAULT_PORT));
        Self::new(host, port, version)
    }

    /// Returns the host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the pinned protocol version, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: DEFAULT_PORT,
            version: None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// How the client authenticates with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum AuthMode {
    /// No account verification.
    #[default]
    Offline,
    /// Legacy account service.
    Mojang,
    /// Microsoft account sign-in.
    Microsoft,
}

impl FromStr for AuthMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "offline" => Ok(AuthMode::Offline),
            "mojang" => Ok(AuthMode::Mojang),
            "microsoft" => Ok(AuthMode::Microsoft),
            _ => Err(()),
        }
    }
}

/// Account used to join the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Player name.
    pub username: String,
    /// Password; empty for offline accounts.
    pub password: String,
    /// Authentication scheme.
    pub auth: AuthMode,
}

impl Credentials {
    /// Offline credentials for `username`.
    pub fn offline(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: String::new(),
            auth: AuthMode::Offline,
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::offline("relink")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("auth", &self.auth)
            .finish()
    }
}

/// Everything a connector needs to build one connection handle.
///
/// The controller never edits settings in place; a new endpoint produces a
/// new value that replaces the old one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    /// Where to connect.
    pub endpoint: Endpoint,
    /// Who to connect as.
    pub credentials: Credentials,
}

impl SessionSettings {
    /// Creates settings for `endpoint` and `credentials`.
    pub fn new(endpoint: Endpoint, credentials: Credentials) -> Self {
        Self {
            endpoint,
            credentials,
        }
    }

    /// Returns a copy targeting `endpoint`, keeping the credentials.
    pub fn with_endpoint(&self, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            credentials: self.credentials.clone(),
        }
    }

    /// Builds settings from defaults overridden by process environment
    /// variables (`MC_SERVER_HOST`, `MC_SERVER_PORT`, `MC_VERSION`,
    /// `MC_USERNAME`, `MC_PASSWORD`, `MC_AUTH`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("MC_SERVER_HOST").unwrap_or_else(|| self.endpoint.host.clone());
        let port = match lookup("MC_SERVER_PORT") {
            Some(raw) => parse_var("MC_SERVER_PORT", &raw)?,
            None => u32::from(self.endpoint.port),
        };
        let version = lookup("MC_VERSION").or_else(|| self.endpoint.version.clone());
        self.endpoint = Endpoint::with_default_port(host, Some(port), version.as_deref())?;

        if let Some(username) = lookup("MC_USERNAME") {
            self.credentials.username = username;
        }
        if let Some(password) = lookup("MC_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(raw) = lookup("MC_AUTH") {
            self.credentials.auth = raw.parse::<AuthMode>().map_err(|_| ConfigError::InvalidValue {
                key: "MC_AUTH",
                value: raw.clone(),
            })?;
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
    })
}

/// Tuning of the reconnection controller.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Consecutive failures tolerated before switching to the cooldown cadence.
    pub(crate) max_attempts: u32,

    /// Delay growth between attempts.
    pub(crate) backoff: BackoffPolicy,

    /// Fixed pause once the attempt budget is exhausted.
    pub(crate) cooldown: Duration,

    /// How long a connection must stay up before its failures are forgiven.
    pub(crate) stability_window: Duration,

    /// Pause between tearing down a handle and reconnecting on an explicit
    /// endpoint change or restart.
    pub(crate) switch_delay: Duration,

    /// Prefix prepended to dispatched commands that lack it.
    pub(crate) command_prefix: String,

    /// Name reported in events and logs.
    pub(crate) name: String,

    /// Listeners for controller lifecycle events.
    pub(crate) event_listeners: EventListeners<ControllerEvent>,

    /// Observers of domain events from the live connection.
    pub(crate) session_observers: EventListeners<SessionEvent>,
}

impl ControllerConfig {
    /// Creates a new builder for configuring the controller.
    pub fn builder() -> ControllerConfigBuilder {
        ControllerConfigBuilder::default()
    }

    /// Returns the attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the backoff policy.
    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    /// Returns the cooldown duration.
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns the stability window.
    pub fn stability_window(&self) -> Duration {
        self.stability_window
    }

    /// Returns the endpoint switch delay.
    pub fn switch_delay(&self) -> Duration {
        self.switch_delay
    }

    /// Returns the command prefix.
    pub fn command_prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Returns the instance name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfigBuilder::default().build()
    }
}

impl fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("cooldown", &self.cooldown)
            .field("stability_window", &self.stability_window)
            .field("switch_delay", &self.switch_delay)
            .field("command_prefix", &self.command_prefix)
            .field("event_listeners", &self.event_listeners.len())
            .field("session_observers", &self.session_observers.len())
            .finish()
    }
}

/// Builder for constructing a [`ControllerConfig`].
pub struct ControllerConfigBuilder {
    max_attempts: u32,
    base_delay: Duration,
    delay_ceiling: Duration,
    cooldown: Duration,
    stability_window: Duration,
    switch_delay: Duration,
    command_prefix: String,
    name: String,
    event_listeners: EventListeners<ControllerEvent>,
    session_observers: EventListeners<SessionEvent>,
}

impl Default for ControllerConfigBuilder {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(5),
            delay_ceiling: Duration::from_secs(30),
            cooldown: Duration::from_secs(300),
            stability_window: Duration::from_secs(60),
            switch_delay: Duration::from_secs(1),
            command_prefix: ".".to_owned(),
            name: "<unnamed>".to_owned(),
            event_listeners: EventListeners::new(),
            session_observers: EventListeners::new(),
        }
    }
}

impl ControllerConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many consecutive failures are retried on the backoff cadence.
    ///
    /// Default: 5
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the per-attempt backoff increment.
    ///
    /// Default: 5 seconds
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum backoff delay.
    ///
    /// Default: 30 seconds
    pub fn delay_ceiling(mut self, ceiling: Duration) -> Self {
        self.delay_ceiling = ceiling;
        self
    }

    /// Sets the pause entered once the attempt budget is exhausted.
    ///
    /// Default: 5 minutes
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets how long a connection must stay up before the attempt counter
    /// resets.
    ///
    /// Default: 60 seconds
    pub fn stability_window(mut self, window: Duration) -> Self {
        self.stability_window = window;
        self
    }

    /// Sets the pause before reconnecting after an endpoint change or restart.
    ///
    /// Default: 1 second
    pub fn switch_delay(mut self, delay: Duration) -> Self {
        self.switch_delay = delay;
        self
    }

    /// Sets the prefix prepended to dispatched commands.
    ///
    /// Default: `.`
    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    /// Gives this controller a name for events and logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback for every controller lifecycle event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ControllerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Registers a callback for a retry being scheduled.
    ///
    /// The callback receives the attempt number and the delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ControllerEvent| {
                if let ControllerEvent::RetryScheduled { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback for connection state changes.
    ///
    /// The callback receives the old and new connection states.
    pub fn on_state_change<F>(mut self, f: F) -> Self
    where
        F: Fn(crate::state::ConnectionState, crate::state::ConnectionState)
            + Send
            + Sync
            + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ControllerEvent| {
                if let ControllerEvent::StateTransition { from, to, .. } = event {
                    f(*from, *to);
                }
            }));
        self
    }

    /// Registers an observer of domain events from the live connection.
    pub fn observer<F>(mut self, f: F) -> Self
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.session_observers.add(FnListener::new(f));
        self
    }

    /// Overrides the attempt budget, base delay and command prefix from
    /// `MAX_RECONNECT_ATTEMPTS`, `RECONNECT_DELAY` (milliseconds) and
    /// `COMMAND_PREFIX`.
    ///
    /// A zero attempt budget or delay counts as unset and keeps the current
    /// value.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MAX_RECONNECT_ATTEMPTS") {
            match parse_var::<u32>("MAX_RECONNECT_ATTEMPTS", &raw)? {
                0 => {}
                attempts => self.max_attempts = attempts,
            }
        }
        if let Some(raw) = lookup("RECONNECT_DELAY") {
            match parse_var::<u64>("RECONNECT_DELAY", &raw)? {
                0 => {}
                millis => self.base_delay = Duration::from_millis(millis),
            }
        }
        if let Some(prefix) = lookup("COMMAND_PREFIX") {
            self.command_prefix = prefix;
        }
        Ok(self)
    }

    /// Builds the configuration.
    pub fn build(self) -> ControllerConfig {
        ControllerConfig {
            max_attempts: self.max_attempts,
            backoff: BackoffPolicy::new(self.base_delay, self.delay_ceiling),
            cooldown: self.cooldown,
            stability_window: self.stability_window,
            switch_delay: self.switch_delay,
            command_prefix: self.command_prefix,
            name: self.name,
            event_listeners: self.event_listeners,
            session_observers: self.session_observers,
        }
    }
}
