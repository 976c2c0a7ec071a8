use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::{
    cache::WeatherCache,
    config::{SdkConfig, WeatherMode},
    error::{Result, SdkError},
    fetcher::{HttpFetcher, WeatherFetcher},
    model::WeatherRecord,
    refresher::Refresher,
    registry,
};

/// A weather client bound to one API key.
///
/// Only one live instance may exist per API key in a process. The key is
/// released by [`destroy`](Self::destroy), or when the instance is dropped.
#[derive(Debug)]
pub struct WeatherSdk {
    api_key: String,
    mode: WeatherMode,
    cache: Arc<WeatherCache>,
    fetcher: Arc<dyn WeatherFetcher>,
    refresher: Mutex<Option<Refresher>>,
    destroyed: AtomicBool,
}

/// Collects construction overrides for [`WeatherSdk`].
#[derive(Debug, Default)]
pub struct WeatherSdkBuilder {
    config: Option<SdkConfig>,
    config_path: Option<PathBuf>,
    mode: Option<WeatherMode>,
    url_template: Option<String>,
    fetcher: Option<Arc<dyn WeatherFetcher>>,
}

impl WeatherSdkBuilder {
    /// Use an already loaded config instead of reading a file.
    pub fn config(mut self, config: SdkConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Read config from `path` instead of the platform default location.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn mode(mut self, mode: WeatherMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Override the URL template. Empty strings are ignored.
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    /// Replace the HTTP fetcher, e.g. with a fake in tests.
    pub fn fetcher(mut self, fetcher: Arc<dyn WeatherFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn build(self) -> Result<WeatherSdk> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => SdkConfig::load_from(&path)?,
            (None, None) => SdkConfig::load()?,
        };
        info!("Configuration loaded successfully");

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(template) = self.url_template.filter(|t| !t.is_empty()) {
            config.url_template = template;
        }

        if config.api_key.is_empty() {
            error!("API key is not provided in config");
            return Err(SdkError::config("API key must be provided in the configuration"));
        }

        let runtime = match config.mode {
            WeatherMode::OnDemand => None,
            WeatherMode::Polling => {
                if config.polling_interval_minutes == 0 {
                    return Err(SdkError::config(
                        "polling interval must be at least one minute in POLLING mode",
                    ));
                }
                let handle = Handle::try_current().map_err(|_| {
                    SdkError::config("POLLING mode must be started inside a Tokio runtime")
                })?;
                Some(handle)
            }
        };

        registry::register(&config.api_key)?;

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(HttpFetcher::from_config(&config)));
        let cache = Arc::new(WeatherCache::new(config.max_cities, config.cache_expiration()));

        let refresher = runtime.map(|handle| {
            info!(
                interval_minutes = config.polling_interval_minutes,
                "Starting polling mode"
            );
            Refresher::spawn(&handle, cache.clone(), fetcher.clone(), config.polling_interval())
        });

        info!(
            api_key = %mask_key(&config.api_key),
            mode = %config.mode,
            max_cities = config.max_cities,
            expiration_ms = config.cache_expiration_ms,
            "SDK instance created"
        );

        Ok(WeatherSdk {
            api_key: config.api_key,
            mode: config.mode,
            cache,
            fetcher,
            refresher: Mutex::new(refresher),
            destroyed: AtomicBool::new(false),
        })
    }
}

impl WeatherSdk {
    pub fn builder() -> WeatherSdkBuilder {
        WeatherSdkBuilder::default()
    }

    /// Build an instance from the default config file with no overrides.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Current conditions for `city`.
    ///
    /// In `OnDemand` mode a fresh cached record is returned without a network
    /// call. In `Polling` mode every call fetches, and the result refreshes the
    /// cache.
    ///
    /// Empty and whitespace-only city names are rejected with
    /// [`SdkError::InvalidArgument`]; other names are sent upstream verbatim.
    pub async fn get_weather(&self, city: &str) -> Result<WeatherRecord> {
        self.ensure_alive()?;

        if city.trim().is_empty() {
            warn!(city = %city, "Invalid city name provided");
            return Err(SdkError::InvalidArgument(
                "city name cannot be empty".to_string(),
            ));
        }

        if self.mode == WeatherMode::OnDemand
            && let Some(record) = self.cache.get(city)
        {
            info!(city = %city, "Returning cached weather data");
            return Ok(record);
        }

        info!(city = %city, "Fetching weather data");
        match self.fetcher.fetch(city).await {
            Ok(record) => {
                self.cache.put(city, record.clone());
                Ok(record)
            }
            Err(err) => {
                error!(city = %city, error = %err, "Failed to fetch weather data");
                Err(err)
            }
        }
    }

    /// Cities currently held in the cache, most recently used first.
    pub fn cached_cities(&self) -> Result<Vec<String>> {
        self.ensure_alive()?;
        Ok(self.cache.keys())
    }

    pub fn mode(&self) -> WeatherMode {
        self.mode
    }

    /// Masked form of the API key, safe for display.
    pub fn api_key_hint(&self) -> String {
        mask_key(&self.api_key)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Stop polling and release the API key. Calling it again does nothing.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(api_key = %mask_key(&self.api_key), "Destroying SDK instance");
        let refresher = self
            .refresher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(refresher) = refresher {
            refresher.stop();
        }
        registry::release(&self.api_key);
    }

    /// Forget every registered API key. Intended for tests only.
    pub fn clear_registry() {
        registry::clear();
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            warn!("Attempt to use destroyed SDK instance");
            return Err(SdkError::Destroyed);
        }
        Ok(())
    }
}

impl Drop for WeatherSdk {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}***")
}
