use crate::{Config, LocationQuery, WeatherError, WeatherResult};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions for `query`. One network call, no retries.
    async fn current(&self, query: &LocationQuery) -> Result<WeatherResult, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<OpenWeatherProvider> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `localweather configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    Ok(OpenWeatherProvider::new(api_key).with_base_url(config.provider.weather_url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        if cfg.api_key().is_some() {
            // Key injected through the environment on this machine.
            return;
        }

        let err = provider_from_config(&cfg).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("No OpenWeather API key configured"));
        assert!(msg.contains("Hint: run `localweather configure`"));
    }

    #[test]
    fn provider_from_config_uses_configured_endpoint() {
        let mut cfg = Config::default();
        cfg.api_key = Some("KEY".into());
        cfg.provider.weather_url = "http://localhost:9999/weather".into();

        let provider = provider_from_config(&cfg).expect("provider should build");
        assert_eq!(provider.base_url(), "http://localhost:9999/weather");
    }
}
