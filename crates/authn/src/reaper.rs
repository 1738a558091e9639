//! Background removal of expired tokens.
//!
//! Expiry is enforced lazily at use, so the reaper only reclaims storage. It
//! runs [`TokenManager::sweep_expired`] every interval until shut down.

use std::{sync::Arc, time::Duration};

use tokio::{select, sync::watch, task::JoinHandle, time::sleep};

use crate::manager::TokenManager;

/// Holds the shutdown signal sender. When dropped, the watch channel
/// closes and the sweep loop exits.
struct ShutdownGuard {
    shutdown_tx: watch::Sender<()>,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        // Best-effort: the loop may already have exited.
        let _ = self.shutdown_tx.send(());
    }
}

/// Handle to a running sweep loop.
///
/// Dropping the handle stops the loop after its current sweep. Call
/// [`shutdown`](Self::shutdown) to stop it and wait for it to finish.
pub struct TokenReaper {
    guard: ShutdownGuard,
    task: JoinHandle<()>,
}

impl TokenReaper {
    /// Spawns a sweep loop on the current Tokio runtime.
    ///
    /// The first sweep runs one `interval` after spawning.
    #[must_use]
    pub fn spawn(manager: Arc<TokenManager>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let task = tokio::spawn(sweep_loop(manager, interval, shutdown_rx));
        Self { guard: ShutdownGuard { shutdown_tx }, task }
    }

    /// Signals the loop to stop and waits for it to exit.
    pub async fn shutdown(self) {
        let Self { guard, task } = self;
        drop(guard);
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "token reaper task ended abnormally");
        }
    }

    /// Whether the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl std::fmt::Debug for TokenReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenReaper").field("finished", &self.task.is_finished()).finish()
    }
}

async fn sweep_loop(
    manager: Arc<TokenManager>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    loop {
        select! {
            _ = sleep(interval) => {}
            _ = shutdown_rx.changed() => {
                return;
            }
        }

        match manager.sweep_expired().await {
            Ok(0) => tracing::trace!("token sweep found nothing to remove"),
            Ok(removed) => tracing::info!(removed, "swept expired tokens"),
            Err(e) => tracing::warn!(error = %e, "token sweep failed"),
        }
    }
}
