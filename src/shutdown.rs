use std::time::Duration;

use futures::future;
use tokio::select;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

/// Cancellation signal shared by every wait loop of one invocation.
#[derive(Clone)]
pub struct Shutdown {
    rx: watch::Receiver<Option<&'static str>>,
}

pub struct ShutdownTrigger {
    tx: watch::Sender<Option<&'static str>>,
}

impl ShutdownTrigger {
    pub fn trigger(&self, reason: &'static str) {
        let _ = self.tx.send(Some(reason));
    }
}

impl Shutdown {
    /// Fires on SIGINT or SIGTERM.
    pub fn listen() -> Self {
        Self {
            rx: spawn_signal_listener(),
        }
    }

    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(None);
        (ShutdownTrigger { tx }, Self { rx })
    }

    pub fn requested(&self) -> Option<&'static str> {
        *self.rx.borrow()
    }

    /// Resolves with the signal name once shutdown is requested.
    pub async fn wait(&mut self) -> &'static str {
        loop {
            if let Some(signal) = self.requested() {
                return signal;
            }
            if self.rx.changed().await.is_err() {
                return future::pending().await;
            }
        }
    }

    /// Sleeps for `duration`, returning the signal name early if shutdown is requested.
    pub async fn sleep_or_shutdown(&mut self, duration: Duration) -> Option<&'static str> {
        if let Some(signal) = self.requested() {
            return Some(signal);
        }

        select! {
            _ = tokio::time::sleep(duration) => None,
            signal = self.wait() => Some(signal),
        }
    }
}

fn spawn_signal_listener() -> watch::Receiver<Option<&'static str>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(None);

    tokio::spawn(async move {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).ok();

        let term_future = async {
            if let Some(ref mut sigterm) = sigterm {
                sigterm.recv().await;
            } else {
                future::pending::<()>().await
            }
        };

        select! {
            res = signal::ctrl_c() => {
                if res.is_ok() {
                    info!("Received SIGINT.");
                    let _ = shutdown_tx.send(Some("SIGINT"));
                } else {
                    warn!("Failed to listen for SIGINT: {:?}", res.err());
                }
            }
            _ = term_future => {
                info!("Received SIGTERM.");
                let _ = shutdown_tx.send(Some("SIGTERM"));
            }
        }
        // Keep the sender alive so waiters never observe a closed channel.
        future::pending::<()>().await
    });

    shutdown_rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_completes_without_signal() {
        let (_trigger, mut shutdown) = Shutdown::channel();
        assert_eq!(shutdown.sleep_or_shutdown(Duration::from_secs(5)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_interrupted_by_trigger() {
        let (trigger, mut shutdown) = Shutdown::channel();
        let start = tokio::time::Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.trigger("SIGINT");
        });

        assert_eq!(
            shutdown.sleep_or_shutdown(Duration::from_secs(600)).await,
            Some("SIGINT")
        );
        assert!(start.elapsed() < Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_requested_after_trigger() {
        let (trigger, shutdown) = Shutdown::channel();
        assert_eq!(shutdown.requested(), None);
        trigger.trigger("SIGTERM");
        assert_eq!(shutdown.requested(), Some("SIGTERM"));
    }
}
