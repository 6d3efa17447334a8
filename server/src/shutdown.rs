//! Process-wide shutdown flag.
//!
//! [`Shutdown`] is the trigger side, [`ShutdownListener`] is what every loop
//! holds. Loops check the flag before each blocking call and race the call
//! against [`ShutdownListener::wait`], so a pending accept or read is dropped
//! (and its socket closed) as soon as shutdown is requested.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

#[derive(Debug, Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownListener {
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been triggered. If every [`Shutdown`]
    /// handle is dropped first, nobody can trigger it any more and this never
    /// resolves.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_trigger_wakes_listeners() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.subscribe();
        let mut second = first.clone();

        assert!(!first.is_shutdown());

        let waiter = tokio::spawn(async move {
            first.wait().await;
        });

        shutdown.trigger();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listener did not wake")
            .unwrap();

        assert!(second.is_shutdown());
        // Already triggered: returns immediately
        timeout(Duration::from_millis(50), second.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        assert!(shutdown.subscribe().is_shutdown());
    }

    #[tokio::test]
    async fn test_dropped_trigger_is_not_a_shutdown() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        drop(shutdown);

        assert!(timeout(Duration::from_millis(100), listener.wait())
            .await
            .is_err());
        assert!(!listener.is_shutdown());
    }
}
