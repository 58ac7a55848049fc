//! Cooperative shutdown plumbing for worker tasks.

use tokio::sync::watch;
use tracing::*;

/// Creates a linked shutdown signal and guard pair.
pub fn shutdown_signal() -> (ShutdownSignal, ShutdownGuard) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSignal { tx }, ShutdownGuard { rx })
}

/// Sender half used to ask all workers holding a guard to wind down.
#[derive(Debug)]
pub struct ShutdownSignal {
    tx: watch::Sender<bool>,
}

impl ShutdownSignal {
    /// Triggers shutdown. Idempotent.
    pub fn send(&self) {
        debug!("sending shutdown signal");
        let _ = self.tx.send(true);
    }
}

/// Receiver half polled (or awaited) by workers at their suspension points.
#[derive(Clone, Debug)]
pub struct ShutdownGuard {
    rx: watch::Receiver<bool>,
}

impl ShutdownGuard {
    /// Whether shutdown has been requested.
    pub fn should_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown is requested. A dropped signal counts as a
    /// shutdown request so orphaned workers don't hang.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_observes_signal() {
        let (signal, guard) = shutdown_signal();
        assert!(!guard.should_shutdown());
        signal.send();
        assert!(guard.should_shutdown());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_send() {
        let (signal, guard) = shutdown_signal();
        signal.send();
        guard.wait_for_shutdown().await;
    }

    #[tokio::test]
    async fn test_wait_resolves_on_dropped_signal() {
        let (signal, guard) = shutdown_signal();
        drop(signal);
        guard.wait_for_shutdown().await;
    }
}
