//! Delayed view refresh after a mutation

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Gives the success toast time to show before the view is redrawn
pub const REFRESH_DELAY: Duration = Duration::from_millis(500);

/// Views that show mutable records and can be re-fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Records,
    Board,
}

/// Requests a re-fetch of a view after a short delay.
///
/// The UI loop owns the receiving end and reloads the view it names.
#[derive(Clone)]
pub struct RefreshScheduler {
    tx: mpsc::UnboundedSender<View>,
    delay: Duration,
    handle: Handle,
}

impl RefreshScheduler {
    /// Must be called from within a tokio runtime
    pub fn new(tx: mpsc::UnboundedSender<View>) -> Self {
        Self {
            tx,
            delay: REFRESH_DELAY,
            handle: Handle::current(),
        }
    }

    pub fn schedule(&self, view: View) {
        let tx = self.tx.clone();
        let delay = self.delay;
        tracing::debug!("Refreshing {:?} in {:?}", view, delay);
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the UI already exited
            let _ = tx.send(view);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_refresh_arrives_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scheduler = RefreshScheduler::new(tx);
        scheduler.schedule(View::Records);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().unwrap(), View::Records);
        assert!(rx.try_recv().is_err());
    }
}
