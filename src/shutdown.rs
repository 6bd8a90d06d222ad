//! Graceful shutdown signal
//!
//! The accept loop and every session wait on this alongside their socket, so
//! a trigger stops the process between accepts and between reads.

use tokio::sync::watch;

/// Create a connected trigger/listener pair
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Sending half, owned by whoever decides when to stop
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Ask every holder of a [`Shutdown`] to stop
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half, cloned into every task that must stop on request
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Resolve once shutdown has been requested.
    ///
    /// If the trigger is dropped without firing, this never resolves.
    pub async fn requested(&mut self) {
        loop {
            let fired = *self.rx.borrow_and_update();
            if fired {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
