//! Process shutdown hooks.
//!
//! [`stop_on_shutdown`] ties a controller to the process lifetime: when
//! SIGINT, SIGTERM or SIGQUIT arrives (Ctrl-C elsewhere) the controller is
//! stopped, closing the live connection cleanly instead of leaving the
//! server to time it out.

use crate::controller::Controller;
use std::future::Future;

/// Completes when the process is asked to terminate.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
        _ = quit.recv() => {},
    }
    Ok(())
}

/// Completes when the process is asked to terminate.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Stops `controller` once the process receives a termination signal.
pub async fn stop_on_shutdown(controller: Controller) -> std::io::Result<()> {
    stop_when(controller, wait_for_shutdown_signal()).await
}

/// Stops `controller` once `signal` completes successfully.
///
/// The controller is left running if `signal` fails.
pub async fn stop_when<F>(controller: Controller, signal: F) -> std::io::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    signal.await?;

    #[cfg(feature = "tracing")]
    tracing::info!("shutdown requested, stopping controller");

    controller.stop().await;
    Ok(())
}
