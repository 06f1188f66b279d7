//! Tower service front for outbound actions.

use crate::controller::Controller;
use crate::error::ControllerError;
use crate::handle::Action;
use futures::future::BoxFuture;
use std::task::{Context, Poll};
use tower::Service;

/// A [`tower::Service`] that forwards each [`Action`] to the live connection.
///
/// Lets outbound actions be composed with ordinary tower middleware
/// (timeouts, rate limits, buffering) before they reach the session.
#[derive(Clone, Debug)]
pub struct ActionService {
    controller: Controller,
}

impl ActionService {
    /// Wraps `controller`.
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }

    /// Returns the wrapped controller.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}

impl Controller {
    /// Returns a [`tower::Service`] view of this controller.
    pub fn service(&self) -> ActionService {
        ActionService::new(self.clone())
    }
}

impl Service<Action> for ActionService {
    type Response = ();
    type Error = ControllerError;
    type Future = BoxFuture<'static, Result<(), ControllerError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.controller.is_closed() {
            Poll::Ready(Err(ControllerError::Closed))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn call(&mut self, action: Action) -> Self::Future {
        let controller = self.controller.clone();
        Box::pin(async move { controller.send(action).await })
    }
}
