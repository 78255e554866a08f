use std::time::Duration;
use tokio::sync::watch;

/// Process-wide stop signal. Long waits go through [`Shutdown::sleep`] so a
/// Ctrl-C interrupts them.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A signal that never fires.
    #[cfg(test)]
    pub fn never() -> Self {
        Self::new().1
    }

    /// Resolves once shutdown is requested. Pends forever if the sender is
    /// gone without having fired.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Returns `false` when the wait was cut short by shutdown.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.triggered() => false,
        }
    }
}
