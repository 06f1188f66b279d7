use thiserror::Error;

/// Reasons a requested endpoint is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// The host was empty or whitespace.
    #[error("server host is required")]
    MissingHost,

    /// The port was outside `1..=65535`.
    #[error("invalid port number {0} (1-65535)")]
    InvalidPort(u32),
}

/// Synchronous failure while constructing a connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection setup failed: {message}")]
pub struct ConnectError {
    message: String,
}

impl ConnectError {
    /// Creates a connect error carrying a human readable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure reported by a live connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The handle was already closed.
    #[error("connection handle is closed")]
    Closed,

    /// The remote side rejected the action.
    #[error("action rejected: {0}")]
    Rejected(String),
}

/// Errors returned by [`Controller`](crate::Controller) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    /// The controller task is gone; nothing can be driven any more.
    #[error("controller is no longer running")]
    Closed,

    /// The requested endpoint is invalid; nothing was changed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    /// No established connection to deliver an action to.
    #[error("not connected")]
    NotConnected,

    /// The live handle refused the action.
    #[error(transparent)]
    Handle(#[from] HandleError),
}

/// Errors raised while reading configuration overrides.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// The variable name.
        key: &'static str,
        /// The raw value.
        value: String,
    },

    /// The resulting endpoint was invalid.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}
