use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::{Result, SdkError},
    fetcher::WeatherFetcher,
    model::{WeatherRecord, tests::record_for},
};

/// In-process fetcher that counts calls and stamps each record with its call number.
///
/// Calls are counted when they start, before any configured delay.
#[derive(Debug, Default)]
pub(crate) struct CountingFetcher {
    calls: AtomicUsize,
    failing: HashSet<String>,
    delay: Option<Duration>,
}

impl CountingFetcher {
    pub(crate) fn failing_for(cities: &[&str]) -> Self {
        Self {
            failing: cities.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Every fetch sleeps for `delay` on the tokio clock before answering.
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherFetcher for CountingFetcher {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(city) {
            return Err(SdkError::Transport(format!("simulated outage for {city}")));
        }

        let mut record = record_for(city);
        record.datetime = n as i64;
        Ok(record)
    }
}
