use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::backend::ConsoleBackend;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct ConnectionIndicator {
    connected: Arc<AtomicBool>,
}

impl ConnectionIndicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value.
    pub fn set(&self, connected: bool) -> bool {
        self.connected.swap(connected, Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct ConnectivityMonitor<B: ConsoleBackend> {
    backend: Arc<B>,
    indicator: ConnectionIndicator,
}

impl<B: ConsoleBackend + 'static> ConnectivityMonitor<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, indicator: ConnectionIndicator) -> Self {
        Self { backend, indicator }
    }

    #[must_use]
    pub fn indicator(&self) -> &ConnectionIndicator {
        &self.indicator
    }

    pub async fn poll(&self) -> bool {
        let connected = match self.backend.ping().await {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%error, "connectivity check failed");
                false
            }
        };

        let previous = self.indicator.set(connected);
        if previous != connected {
            if connected {
                tracing::info!("backend reachable");
            } else {
                tracing::info!("backend unreachable");
            }
        }
        connected
    }

    /// Polls immediately, then once per `interval`, until the handle is stopped or dropped.
    #[must_use]
    pub fn spawn(self, interval: Duration) -> MonitorHandle {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.poll().await;
            }
        });
        MonitorHandle { task: Some(task) }
    }
}

#[derive(Debug)]
pub struct MonitorHandle {
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
