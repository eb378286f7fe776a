//! Graceful shutdown handling.

use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancels `cancel` on the first Ctrl-C.
///
/// The returned handle finishes on its own once the token fires for any other
/// reason.
pub fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => {
                    info!("Interrupt received, stopping load");
                    cancel.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
            },
        }
    })
}

/// Stops the background tasks of a finished load.
///
/// `background` is a child of the load's token, so cancelling it leaves the
/// load's own cancelled flag untouched.
pub async fn shutdown_gracefully(background: CancellationToken, logging_task: Option<JoinHandle<()>>) {
    background.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }
}
