//! Ready-made domain observers.

use crate::controller::ActionSender;
use crate::handle::{Action, DomainEvent, SessionEvent};
use relink_core::events::EventListener;

/// Respawns the player as soon as a health update reports death.
///
/// ```no_run
/// # use relink_session::{Controller, observers::AutoRespawn};
/// # fn wire(controller: &Controller) -> Result<(), relink_session::ControllerError> {
/// controller.observe(AutoRespawn::new(controller.action_sender()))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AutoRespawn {
    actions: ActionSender,
}

impl AutoRespawn {
    /// Creates an observer that submits respawns through `actions`.
    pub fn new(actions: ActionSender) -> Self {
        Self { actions }
    }
}

impl EventListener<SessionEvent> for AutoRespawn {
    fn on_event(&self, event: &SessionEvent) {
        let DomainEvent::Health { health, .. } = event.kind else {
            return;
        };
        if health > 0.0 {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(
            controller = %event.controller,
            generation = event.generation.get(),
            "player died, respawning"
        );

        if let Err(_error) = self.actions.submit(Action::Respawn) {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %_error, "respawn not submitted");
        }
    }
}

/// Logs chat, whispers and spawns at info level.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

#[cfg(feature = "tracing")]
impl EventListener<SessionEvent> for LogObserver {
    fn on_event(&self, event: &SessionEvent) {
        match &event.kind {
            DomainEvent::Spawned => {
                tracing::info!(controller = %event.controller, "spawned in world")
            }
            DomainEvent::Chat { sender, text } => {
                tracing::info!(controller = %event.controller, %sender, "<{sender}> {text}")
            }
            DomainEvent::Whisper { sender, text } => {
                tracing::info!(controller = %event.controller, %sender, "whisper: {text}")
            }
            DomainEvent::Health { health, food } => {
                tracing::trace!(controller = %event.controller, health, food, "health update")
            }
        }
    }
}
