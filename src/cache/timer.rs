//! Periodic driver for [`CacheManager::tick`].

use super::manager::CacheManager;
use super::transmit::Transmitter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub struct TimerWheel;

/// Handle to a running driver. Dropping it stops the driver.
pub struct TimerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<u64>,
}

impl TimerWheel {
    /// Tick `manager` every `tick_interval` of its configuration, on the
    /// current tokio runtime.
    pub fn spawn<T>(manager: Arc<CacheManager<T>>) -> TimerHandle
    where
        T: Transmitter + 'static,
    {
        // interval() rejects a zero period
        let period = manager.config().tick_interval.max(MIN_PERIOD);
        let (shutdown, mut stop) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = 0u64;

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = timer.tick() => {
                        let report = manager.tick(Instant::now().into_std());
                        ticks += 1;
                        if !report.is_quiet() {
                            debug!(
                                transitions = report.transitions,
                                probes = report.probes,
                                failed = report.failed.len(),
                                expired = report.expired,
                                "ARP cache tick"
                            );
                        }
                    }
                }
            }

            info!(ticks, "ARP timer stopped");
            ticks
        });

        TimerHandle { shutdown, task }
    }
}

impl TimerHandle {
    /// Stop the driver and wait for it. Returns the number of ticks run.
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(());
        self.task.await.unwrap_or(0)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
