//! Background polling of cached cities.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::{cache::WeatherCache, fetcher::WeatherFetcher};

/// Outcome of one pass over the cached cities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub refreshed: usize,
    pub failed: usize,
}

/// Refetch every city currently in the cache.
///
/// Failures are logged and counted; they never end the sweep early.
pub async fn sweep(cache: &WeatherCache, fetcher: &dyn WeatherFetcher) -> SweepReport {
    sweep_until(cache, fetcher, || false).await
}

async fn sweep_until(
    cache: &WeatherCache,
    fetcher: &dyn WeatherFetcher,
    should_stop: impl Fn() -> bool,
) -> SweepReport {
    let mut report = SweepReport::default();

    for city in cache.keys() {
        if should_stop() {
            break;
        }
        match fetcher.fetch(&city).await {
            Ok(record) => {
                cache.put(&city, record);
                report.refreshed += 1;
            }
            Err(err) => {
                error!(city = %city, error = %err, "Failed to update weather");
                report.failed += 1;
            }
        }
    }

    report
}

/// Handle to a running polling task.
#[derive(Debug)]
pub struct Refresher {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Refresher {
    /// Start polling on `runtime`. The first sweep runs immediately, then once
    /// per `period`. `period` must be non-zero.
    pub(crate) fn spawn(
        runtime: &Handle,
        cache: Arc<WeatherCache>,
        fetcher: Arc<dyn WeatherFetcher>,
        period: Duration,
    ) -> Self {
        let (stop, stop_rx) = watch::channel(false);
        let task = runtime.spawn(run(cache, fetcher, period, stop_rx));
        Self { stop, task }
    }

    /// Signal the task to stop. A fetch already in flight may still land in
    /// the cache, but no further sweep starts.
    pub fn stop(self) {
        let _ = self.stop.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn run(
    cache: Arc<WeatherCache>,
    fetcher: Arc<dyn WeatherFetcher>,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = stop.changed() => break,
        }
        if *stop.borrow() {
            break;
        }

        let report = sweep_until(&cache, fetcher.as_ref(), || *stop.borrow()).await;
        debug!(refreshed = report.refreshed, failed = report.failed, "Polling sweep finished");
    }

    info!("Polling stopped");
}
