//! Listening for the external shutdown request.

use crate::error::CriticalError;

/// Resolves once the process receives a shutdown request (Ctrl-C / `SIGINT` on unix,
/// Ctrl-C on Windows).
///
/// This crate does not forward any other signal (`SIGHUP`, `SIGTERM`, `SIGUSR1`, ...) to the
/// running task tree; an embedder that needs that can race its own signal handling against
/// [`crate::cancel::CancelToken`] directly.
///
/// # Errors
///
/// Returns [`CriticalError::SignalHandler`] if the OS signal handler could not be installed.
pub async fn shutdown_requested() -> Result<(), CriticalError> {
	tokio::signal::ctrl_c().await.map_err(CriticalError::SignalHandler)
}
