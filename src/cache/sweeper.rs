//! Background eviction for the in-process cache
//!
//! Runs for the lifetime of the process and is torn down with an explicit,
//! joinable stop signal.

use crate::cache::memory::InMemoryCacheStore;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Handle to a running sweep task.
pub struct Sweeper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawns the sweep loop on the current tokio runtime.
    ///
    /// The first sweep happens one full `interval` after spawning.
    pub fn spawn(store: Arc<InMemoryCacheStore>, interval: Duration) -> Self {
        let (stop, mut stopped) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!("Starting scheduled cache cleanup");
                        let evicted = store.evict_expired();
                        if evicted > 0 {
                            info!("Cache sweep evicted {} expired entries ({} remain)", evicted, store.len());
                        }
                    }
                    _ = &mut stopped => break,
                }
            }

            debug!("Cache sweeper stopped");
        });

        info!("Cache sweeper running every {:?}", interval);
        Self { stop, task }
    }

    /// Signals the loop to stop and waits for it to finish.
    pub async fn stop(self) {
        // The receiver is gone only if the task already ended.
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            warn!("Cache sweeper ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
