use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use inquire::{Password, Select, Text};
use weather_sdk::{SdkConfig, WeatherMode, WeatherRecord, WeatherSdk};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    /// Log SDK activity (cache hits, fetches, evictions) to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively write the SDK config file.
    Configure {
        /// Config file to write; defaults to the platform config directory.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show current weather for one or more cities.
    Show {
        /// City names, passed to the weather service verbatim.
        #[arg(required = true)]
        cities: Vec<String>,

        /// Config file to read; defaults to the platform config directory.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured mode: ON_DEMAND or POLLING.
        #[arg(long)]
        mode: Option<String>,

        /// Override the configured URL template (three `%s`: city, key, units).
        #[arg(long)]
        url: Option<String>,

        /// Print raw records as JSON.
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { config } => configure(config),
            Command::Show { cities, config, mode, url, json } => {
                show(&cities, config, mode, url, json).await
            }
        }
    }
}

fn configure(explicit: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match &explicit {
        Some(path) => path.clone(),
        None => SdkConfig::default_path()?,
    };

    let mut cfg = if path.exists() {
        SdkConfig::load_from(&path)?
    } else {
        SdkConfig::default()
    };

    cfg.api_key = Password::new("API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let modes = WeatherMode::all().to_vec();
    let current = modes.iter().position(|m| *m == cfg.mode).unwrap_or(0);
    cfg.mode = Select::new("Refresh mode:", modes)
        .with_starting_cursor(current)
        .prompt()
        .context("Failed to read mode")?;

    cfg.units = Text::new("Units (standard, metric, imperial):")
        .with_default(&cfg.units)
        .prompt()
        .context("Failed to read units")?;

    match explicit {
        Some(path) => cfg.save_to(&path)?,
        None => cfg.save()?,
    }
    println!("Configuration saved to {}", path.display());

    Ok(())
}

async fn show(
    cities: &[String],
    config: Option<PathBuf>,
    mode: Option<String>,
    url: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let mut builder = WeatherSdk::builder();
    if let Some(path) = config {
        builder = builder.config_path(path);
    }
    if let Some(mode) = mode {
        builder = builder.mode(mode.parse()?);
    }
    if let Some(url) = url {
        builder = builder.url_template(url);
    }

    let sdk = builder.build()?;

    let mut failed = 0;
    for city in cities {
        match sdk.get_weather(city).await {
            Ok(record) if json => println!("{}", serde_json::to_string_pretty(&record)?),
            Ok(record) => print!("{}", render(&record)),
            Err(err) => {
                eprintln!("{city}: {err}");
                failed += 1;
            }
        }
    }

    sdk.destroy();

    if failed > 0 {
        bail!("{failed} of {} cities could not be fetched", cities.len());
    }
    Ok(())
}

fn render(record: &WeatherRecord) -> String {
    let condition = record
        .primary_condition()
        .map(|c| c.description.as_str())
        .unwrap_or("unknown");

    let offset = record.utc_offset();
    let observed = record
        .local_observed_at()
        .map(|t| t.format("%Y-%m-%d %H:%M (UTC%:z)").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "{}: {:.1} (feels like {:.1}), {}\n  wind {:.1}, visibility {}\n  observed {}, sunrise {}, sunset {}\n",
        record.name,
        record.main.temp,
        record.main.feels_like,
        condition,
        record.wind.speed,
        record.visibility,
        observed,
        clock(record.sunrise_at(), offset),
        clock(record.sunset_at(), offset),
    )
}

fn clock(at: Option<DateTime<Utc>>, offset: Option<FixedOffset>) -> String {
    match (at, offset) {
        (Some(at), Some(offset)) => at.with_timezone(&offset).format("%H:%M").to_string(),
        (Some(at), None) => at.format("%H:%M UTC").to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOSCOW_BODY: &str = r#"{"weather":[{"main":"Clouds","description":"broken clouds"}],"main":{"temp":-0.76,"feels_like":-3.65},"visibility":10000,"wind":{"speed":2.25},"dt":1740226758,"sys":{"sunrise":1740199086,"sunset":1740235699},"timezone":10800,"name":"Moscow"}"#;

    #[test]
    fn render_uses_city_local_time() {
        let record = weather_sdk::fetcher::decode_record(MOSCOW_BODY).unwrap();
        let out = render(&record);

        assert!(out.starts_with("Moscow: -0.8 (feels like -3.6), broken clouds"));
        assert!(out.contains("2025-02-22 15:19 (UTC+03:00)"));
        assert!(out.contains("sunrise 07:38"));
    }

    #[test]
    fn show_requires_a_city() {
        assert!(Cli::try_parse_from(["weather", "show"]).is_err());

        let cli = Cli::try_parse_from(["weather", "-v", "show", "Moscow", "--mode", "polling"])
            .expect("valid args");
        assert!(cli.verbose);
        match cli.command {
            Command::Show { cities, mode, .. } => {
                assert_eq!(cities, vec!["Moscow".to_string()]);
                assert_eq!(mode.as_deref(), Some("polling"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
