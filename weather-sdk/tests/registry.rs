//! Registry clearing lives in its own test binary so it cannot release keys
//! held by tests running in parallel elsewhere.

use weather_sdk::{ErrorKind, SdkConfig, WeatherSdk, registry};

fn build(api_key: &str) -> Result<WeatherSdk, weather_sdk::SdkError> {
    WeatherSdk::builder()
        .config(SdkConfig {
            api_key: api_key.to_string(),
            ..SdkConfig::default()
        })
        .build()
}

#[test]
fn clear_registry_forgets_live_keys() {
    let first = build("registry-clear").expect("first");
    assert_eq!(build("registry-clear").unwrap_err().kind(), ErrorKind::DuplicateKey);

    WeatherSdk::clear_registry();
    assert!(!registry::is_registered("registry-clear"));

    let second = build("registry-clear").expect("second after clear");

    first.destroy();
    second.destroy();
    second.destroy();
    assert!(!registry::is_registered("registry-clear"));
}
