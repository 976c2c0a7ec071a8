use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use weather_sdk::{ErrorKind, HttpFetcher, SdkConfig, WeatherFetcher, WeatherMode, WeatherSdk};

const MOSCOW_BODY: &str = r#"{"weather":[{"main":"Clouds","description":"broken clouds"}],"main":{"temp":-0.76,"feels_like":-3.65},"visibility":10000,"wind":{"speed":2.25},"dt":1740226758,"sys":{"sunrise":1740199086,"sunset":1740235699},"timezone":10800,"name":"Moscow"}"#;

fn template(server: &MockServer) -> String {
    format!("{}/data/2.5/weather?q=%s&appid=%s&units=%s", server.base_url())
}

fn sdk_for(server: &MockServer, api_key: &str) -> WeatherSdk {
    let config = SdkConfig {
        api_key: api_key.to_string(),
        max_cities: 2,
        cache_expiration_ms: 60_000,
        ..SdkConfig::default()
    };
    WeatherSdk::builder()
        .config(config)
        .mode(WeatherMode::OnDemand)
        .url_template(template(server))
        .build()
        .expect("sdk")
}

#[tokio::test]
async fn decodes_upstream_payload() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/data/2.5/weather")
            .query_param("q", "Moscow")
            .query_param("appid", "http-decode-key")
            .query_param("units", "metric");
        then.status(200)
            .header("content-type", "application/json")
            .body(MOSCOW_BODY);
    });

    let sdk = sdk_for(&server, "http-decode-key");
    let record = sdk.get_weather("Moscow").await.expect("weather");

    assert_eq!(record.name, "Moscow");
    assert_eq!(record.weather[0].main, "Clouds");
    assert!((record.main.temp - -0.76).abs() < 0.01);
    mock.assert();
}

#[tokio::test]
async fn cached_city_is_not_requested_twice() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/data/2.5/weather");
        then.status(200).body(MOSCOW_BODY);
    });

    let sdk = sdk_for(&server, "http-cache-key");
    let first = sdk.get_weather("Moscow").await.expect("first");
    let second = sdk.get_weather("Moscow").await.expect("second");

    assert_eq!(first, second);
    mock.assert_calls(1);
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/data/2.5/weather");
        then.status(404).body(r#"{"cod":"404","message":"city not found"}"#);
    });

    let sdk = sdk_for(&server, "http-404-key");
    let err = sdk.get_weather("Nowhere").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("city not found"));
    assert!(sdk.cached_cities().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/data/2.5/weather");
        then.status(200).body(r#"{"name":"Moscow"}"#);
    });

    let fetcher = HttpFetcher::new(template(&server), "KEY".into(), "metric".into());
    let err = fetcher.fetch("Moscow").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn fetcher_override_is_used_as_is() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/custom").query_param("city", "Moscow");
        then.status(200).body(MOSCOW_BODY);
    });

    let fetcher = Arc::new(HttpFetcher::new(
        format!("{}/custom?city=%s&key=%s&u=%s", server.base_url()),
        "KEY".into(),
        "imperial".into(),
    ));
    let sdk = WeatherSdk::builder()
        .config(SdkConfig {
            api_key: "http-override-key".into(),
            ..SdkConfig::default()
        })
        .fetcher(fetcher)
        .build()
        .expect("sdk");

    sdk.get_weather("Moscow").await.expect("weather");
    mock.assert();
}

#[tokio::test]
async fn custom_client_is_used_for_requests() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/data/2.5/weather")
            .header("user-agent", "weather-sdk-tests");
        then.status(200).body(MOSCOW_BODY);
    });

    let client = reqwest::Client::builder()
        .user_agent("weather-sdk-tests")
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client");
    let fetcher = HttpFetcher::new(template(&server), "KEY".into(), "metric".into())
        .with_client(client);

    let record = fetcher.fetch("Moscow").await.expect("weather");
    assert_eq!(record.name, "Moscow");
    mock.assert();
}
