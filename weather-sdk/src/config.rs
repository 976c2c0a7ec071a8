use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use std::{fmt, fs, path::Path, path::PathBuf, str::FromStr, time::Duration};
use toml::{Table, Value};

pub const KEY_API_KEY: &str = "weather.api.key";
pub const KEY_API_URL: &str = "weather.api.url";
pub const KEY_MODE: &str = "weather.mode";
pub const KEY_UNITS: &str = "weather.units";
pub const KEY_CACHE_EXPIRATION: &str = "cache.expiration.time";
pub const KEY_CACHE_MAX_CITIES: &str = "cache.max.cities";
pub const KEY_POLLING_INTERVAL: &str = "polling.interval.minutes";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://api.openweathermap.org/data/2.5/weather?q=%s&appid=%s&units=%s";
pub const DEFAULT_UNITS: &str = "metric";
pub const DEFAULT_CACHE_EXPIRATION_MS: u64 = 600_000;
pub const DEFAULT_MAX_CITIES: usize = 10;
pub const DEFAULT_POLLING_INTERVAL_MINUTES: u64 = 10;

/// How an SDK instance keeps its cached cities fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeatherMode {
    /// Fetch only when asked; answer from cache while entries are fresh.
    #[default]
    OnDemand,
    /// Refresh every cached city in the background.
    Polling,
}

impl WeatherMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherMode::OnDemand => "ON_DEMAND",
            WeatherMode::Polling => "POLLING",
        }
    }

    pub const fn all() -> &'static [WeatherMode] {
        &[WeatherMode::OnDemand, WeatherMode::Polling]
    }
}

impl fmt::Display for WeatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_uppercase().replace('-', "_");

        match upper.as_str() {
            "ON_DEMAND" => Ok(WeatherMode::OnDemand),
            "POLLING" => Ok(WeatherMode::Polling),
            _ => Err(anyhow!(
                "Unknown weather mode '{value}'. Supported modes: ON_DEMAND, POLLING."
            )),
        }
    }
}

/// Settings consumed when building an SDK instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    pub api_key: String,
    /// Format string with three `%s` slots: city, API key, units.
    pub url_template: String,
    pub units: String,
    pub mode: WeatherMode,
    pub cache_expiration_ms: u64,
    pub max_cities: usize,
    pub polling_interval_minutes: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            units: DEFAULT_UNITS.to_string(),
            mode: WeatherMode::default(),
            cache_expiration_ms: DEFAULT_CACHE_EXPIRATION_MS,
            max_cities: DEFAULT_MAX_CITIES,
            polling_interval_minutes: DEFAULT_POLLING_INTERVAL_MINUTES,
        }
    }
}

impl SdkConfig {
    pub fn cache_expiration(&self) -> Duration {
        Duration::from_millis(self.cache_expiration_ms)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_minutes.saturating_mul(60))
    }

    /// Parse a config document. Options are addressed by their dotted names,
    /// so both `weather.api.key = "..."` and a `[weather.api]` table work.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let table: Table = toml::from_str(contents).context("Failed to parse config as TOML")?;
        let defaults = Self::default();

        let mode = match lookup_str(&table, KEY_MODE)? {
            Some(raw) => raw.parse()?,
            None => defaults.mode,
        };

        Ok(Self {
            api_key: lookup_str(&table, KEY_API_KEY)?.unwrap_or_default(),
            url_template: lookup_str(&table, KEY_API_URL)?.unwrap_or(defaults.url_template),
            units: lookup_str(&table, KEY_UNITS)?.unwrap_or(defaults.units),
            mode,
            cache_expiration_ms: lookup_u64(&table, KEY_CACHE_EXPIRATION)?
                .unwrap_or(defaults.cache_expiration_ms),
            max_cities: match lookup_u64(&table, KEY_CACHE_MAX_CITIES)? {
                Some(n) => usize::try_from(n)
                    .with_context(|| format!("'{KEY_CACHE_MAX_CITIES}' is too large"))?,
                None => defaults.max_cities,
            },
            polling_interval_minutes: lookup_u64(&table, KEY_POLLING_INTERVAL)?
                .unwrap_or(defaults.polling_interval_minutes),
        })
    }

    /// Load config from an explicit file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load config from the platform config directory.
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        Self::load_from(&path)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        let mut table = Table::new();
        insert_path(&mut table, KEY_API_KEY, Value::String(self.api_key.clone()));
        insert_path(&mut table, KEY_API_URL, Value::String(self.url_template.clone()));
        insert_path(&mut table, KEY_MODE, Value::String(self.mode.to_string()));
        insert_path(&mut table, KEY_UNITS, Value::String(self.units.clone()));
        insert_path(&mut table, KEY_CACHE_EXPIRATION, int_value(self.cache_expiration_ms));
        insert_path(&mut table, KEY_CACHE_MAX_CITIES, int_value(self.max_cities as u64));
        insert_path(&mut table, KEY_POLLING_INTERVAL, int_value(self.polling_interval_minutes));

        toml::to_string_pretty(&table).context("Failed to serialize configuration to TOML")
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, self.to_toml_string()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Path to the default config file.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "simple-weather", "weather-sdk")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn lookup<'a>(table: &'a Table, path: &str) -> Option<&'a Value> {
    // A quoted flat key ("weather.api.key" = ...) wins over the nested form.
    if let Some(value) = table.get(path) {
        return Some(value);
    }

    let mut segments = path.split('.');
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

fn lookup_str(table: &Table, path: &str) -> Result<Option<String>> {
    match lookup(table, path) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => bail!("'{path}' must be a string, got {}", other.type_str()),
    }
}

fn lookup_u64(table: &Table, path: &str) -> Result<Option<u64>> {
    match lookup(table, path) {
        None => Ok(None),
        Some(Value::Integer(n)) => u64::try_from(*n)
            .map(Some)
            .with_context(|| format!("'{path}' must not be negative, got {n}")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("'{path}' must be a non-negative integer, got '{s}'")),
        Some(other) => bail!("'{path}' must be an integer, got {}", other.type_str()),
    }
}

fn insert_path(table: &mut Table, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    insert_segments(table, &segments, value);
}

fn insert_segments(table: &mut Table, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            table.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = table
                .entry((*head).to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if let Value::Table(child) = child {
                insert_segments(child, rest, value);
            }
        }
    }
}

fn int_value(n: u64) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}
