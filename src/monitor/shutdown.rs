use tokio::sync::watch;

/// Fires the shutdown signal for every [`Shutdown`] handle created from the same channel.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

/// Cooperative cancellation handle, checked at every suspension point of the monitor.
///
/// The signal is sticky: a handle cloned or polled after the trigger fired
/// still sees it. Dropping the trigger counts as shutdown too.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown has been triggered.
    pub async fn cancelled(&mut self) {
        // Err means the trigger is gone, which is treated the same way.
        let _ = self.rx.wait_for(|stop| *stop).await;
    }
}
