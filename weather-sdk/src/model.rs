use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions for one city, as projected from the upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    #[serde(default)]
    pub weather: Vec<Condition>,
    pub main: Temperature,
    #[serde(default)]
    pub visibility: i64,
    pub wind: Wind,
    /// Observation time, unix seconds.
    #[serde(rename = "dt")]
    pub datetime: i64,
    pub sys: SunTimes,
    /// Offset from UTC in seconds.
    pub timezone: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub main: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
}

impl WeatherRecord {
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.datetime, 0)
    }

    pub fn sunrise_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunrise, 0)
    }

    pub fn sunset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.sys.sunset, 0)
    }

    /// The city's offset from UTC, if the upstream value is in range.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.timezone)
    }

    /// Observation time expressed in the city's own offset.
    pub fn local_observed_at(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.utc_offset()?;
        self.observed_at().map(|t| t.with_timezone(&offset))
    }
}
