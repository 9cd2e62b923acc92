//! Periodic expiry sweeper.
//!
//! Runs [`SecretService::sweep`] on a fixed interval until told to stop. The
//! sweep itself runs on the blocking pool since it is a synchronous store
//! transaction.

use std::time::Duration;

use burnbox_store::SecretStore;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::SecretService;

/// Sweeper configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps. The first sweep runs immediately.
    pub interval: Duration,
    /// Secrets older than this many days are removed.
    pub ttl_days: u32,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval: Duration::from_secs(60 * 60), ttl_days: 7 }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<usize>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    ///
    /// Returns the total number of secrets removed over the sweeper's life. A
    /// sweep already in flight completes first.
    pub async fn shutdown(self) -> usize {
        // The receiver only disappears once the task has exited.
        let _ = self.shutdown.send(true);
        self.task.await.unwrap_or_else(|err| {
            warn!(%err, "sweeper task panicked");
            0
        })
    }
}

/// Spawn the sweeper on the current tokio runtime.
pub fn spawn_sweeper<S: SecretStore>(
    service: SecretService<S>,
    config: SweeperConfig,
) -> SweeperHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(service, config, shutdown_rx));
    SweeperHandle { shutdown, task }
}

async fn run<S: SecretStore>(
    service: SecretService<S>,
    config: SweeperConfig,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut ticker = time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut total = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            },
        }

        let sweeper = service.clone();
        let ttl_days = config.ttl_days;
        match tokio::task::spawn_blocking(move || sweeper.sweep(ttl_days)).await {
            Ok(Ok(removed)) => total += removed,
            Ok(Err(err)) => warn!(%err, "expiry sweep failed"),
            Err(err) => warn!(%err, "expiry sweep task failed"),
        }
    }

    debug!(total, "sweeper stopped");
    total
}
