use tokio::sync::watch;

/// Create a shutdown trigger and its first listener
pub fn channel() -> (Shutdown, ShutdownListener) {
    let (tx, rx) = watch::channel(false);
    (Shutdown { tx }, ShutdownListener { rx })
}

/// Cooperative cancellation shared by the supervised activities
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Signal every listener. Returns true only for the first call.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observes the shutdown signal at suspension points
#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolves once shutdown has been triggered (or the trigger is gone)
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_wakes_listeners() {
        let (shutdown, mut listener) = channel();
        let mut second = shutdown.listener();

        assert!(!listener.is_cancelled());
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger(), "only the first trigger reports true");

        tokio::time::timeout(Duration::from_secs(1), listener.cancelled())
            .await
            .expect("listener should observe shutdown");
        tokio::time::timeout(Duration::from_secs(1), second.cancelled())
            .await
            .expect("late listener should observe shutdown");
    }

    #[tokio::test]
    async fn test_dropped_trigger_counts_as_shutdown() {
        let (shutdown, mut listener) = channel();
        drop(shutdown);
        tokio::time::timeout(Duration::from_secs(1), listener.cancelled())
            .await
            .expect("listener should resolve when the trigger is dropped");
    }
}
