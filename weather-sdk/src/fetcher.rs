use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt::Debug;
use tracing::debug;

use crate::{
    config::SdkConfig,
    error::{Result, SdkError},
    model::WeatherRecord,
};

/// One upstream round trip: city in, decoded record out.
///
/// Implementations must not touch the cache and must not retry.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord>;
}

/// Fetches current conditions over HTTP from an OpenWeather-compatible endpoint.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    url_template: String,
    api_key: String,
    units: String,
    http: Client,
}

impl HttpFetcher {
    pub fn new(url_template: String, api_key: String, units: String) -> Self {
        Self {
            url_template,
            api_key,
            units,
            http: Client::new(),
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(
            config.url_template.clone(),
            config.api_key.clone(),
            config.units.clone(),
        )
    }

    /// Use a preconfigured client, e.g. one built with a request timeout.
    pub fn with_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn request_url(&self, city: &str) -> Result<Url> {
        let raw = format_url(&self.url_template, &[city, self.api_key.as_str(), self.units.as_str()]);
        Url::parse(&raw).map_err(|e| SdkError::Transport(format!("invalid request URL: {e}")))
    }
}

#[async_trait]
impl WeatherFetcher for HttpFetcher {
    async fn fetch(&self, city: &str) -> Result<WeatherRecord> {
        let url = self.request_url(city)?;
        debug!(city = %city, host = url.host_str().unwrap_or_default(), "Requesting current weather");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SdkError::Transport(format!("failed to send request: {e}")))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| SdkError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(SdkError::Transport(format!(
                "request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        decode_record(&body)
    }
}

/// Decode an upstream body, ignoring fields outside the projection.
pub fn decode_record(body: &str) -> Result<WeatherRecord> {
    Ok(serde_json::from_str(body)?)
}

/// Substitute `%s` slots in order with `args`.
///
/// `%%` yields a literal `%`; slots beyond the supplied arguments become empty.
pub fn format_url(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut args = args.iter();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                out.push_str(args.next().copied().unwrap_or_default());
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    out
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
