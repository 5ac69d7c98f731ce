use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{LocationQuery, WeatherError, WeatherResult, model::round_half_up};

use super::WeatherProvider;

pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_WEATHER_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_params(&self, query: &LocationQuery) -> Vec<(&'static str, String)> {
        let mut params = query.query_pairs();
        params.push(("appid", self.api_key.clone()));
        params.push(("units", "metric".to_string()));
        params
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, query: &LocationQuery) -> Result<WeatherResult, WeatherError> {
        debug!(%query, url = %self.base_url, "requesting current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&self.request_params(query))
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.without_url().to_string()))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| WeatherError::Network(e.without_url().to_string()));

        classify(status, body, query)
    }
}

/// A non-2xx status wins over anything that went wrong reading the body.
fn classify(
    status: StatusCode,
    body: Result<String, WeatherError>,
    query: &LocationQuery,
) -> Result<WeatherResult, WeatherError> {
    if !status.is_success() {
        let body = body.unwrap_or_default();
        warn!(%status, body = %truncate_body(&body), "OpenWeather request failed");
        return Err(provider_error(status.as_u16(), &body, query));
    }

    normalize(&body?)
}

/// Error body OpenWeather sends along with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

fn provider_error(status: u16, body: &str, query: &LocationQuery) -> WeatherError {
    let message = serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| match query {
            LocationQuery::Name { .. } => "City not found".to_string(),
            LocationQuery::Coords { .. } => "Weather not found".to_string(),
        });

    WeatherError::Provider { status, message }
}

// Every field is optional here so that a partial payload turns into a
// `Decode` error naming the missing path instead of a generic serde message.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWeather {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    name: Option<String>,
    sys: Option<OwSys>,
    weather: Option<Vec<OwWeather>>,
    main: Option<OwMain>,
    wind: Option<OwWind>,
    timezone: Option<i32>,
}

fn required<T>(value: Option<T>, path: &str) -> Result<T, WeatherError> {
    value.ok_or_else(|| WeatherError::missing(path))
}

// OpenWeather sends humidity as an integer, but `40.0` is accepted too.
fn percentage(value: f64, path: &str) -> Result<u8, WeatherError> {
    u8::try_from(round_half_up(value))
        .ok()
        .filter(|pct| *pct <= 100)
        .ok_or_else(|| WeatherError::Decode(format!("field `{path}` out of range: {value}")))
}

/// Maps a raw current-weather body into a [`WeatherResult`].
pub fn normalize(body: &str) -> Result<WeatherResult, WeatherError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|e| WeatherError::Decode(format!("invalid JSON: {e}")))?;

    let sys = required(parsed.sys, "sys")?;
    let condition = required(parsed.weather, "weather")?
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::missing("weather[0]"))?;
    let main = required(parsed.main, "main")?;
    let wind = required(parsed.wind, "wind")?;

    Ok(WeatherResult {
        location_name: required(parsed.name, "name")?,
        country: required(sys.country, "sys.country")?,
        description: required(condition.description, "weather[0].description")?,
        icon: required(condition.icon, "weather[0].icon")?,
        temperature_c: required(main.temp, "main.temp")?,
        feels_like_c: required(main.feels_like, "main.feels_like")?,
        humidity_pct: percentage(required(main.humidity, "main.humidity")?, "main.humidity")?,
        wind_speed_mps: required(wind.speed, "wind.speed")?,
        pressure_hpa: required(main.pressure, "main.pressure")?,
        timezone: required(parsed.timezone, "timezone")?,
    })
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paris_payload() -> serde_json::Value {
        json!({
            "name": "Paris",
            "sys": { "country": "FR" },
            "weather": [{ "description": "clear sky", "icon": "01d" }],
            "main": { "temp": 18.4, "feels_like": 17.9, "humidity": 40, "pressure": 1012 },
            "wind": { "speed": 3.1 },
            "timezone": 7200
        })
    }

    #[test]
    fn normalizes_a_complete_payload() {
        let result = normalize(&paris_payload().to_string()).unwrap();

        assert_eq!(result.location_name, "Paris");
        assert_eq!(result.country, "FR");
        assert_eq!(result.description, "clear sky");
        assert_eq!(result.icon, "01d");
        assert_eq!(result.humidity_pct, 40);
        assert_eq!(result.pressure_hpa, 1012.0);
        assert_eq!(result.timezone, 7200);
        assert_eq!(result.temperature_display(), "18°C");
    }

    #[test]
    fn missing_humidity_is_a_decode_error() {
        let mut payload = paris_payload();
        payload["main"].as_object_mut().unwrap().remove("humidity");

        let err = normalize(&payload.to_string()).unwrap_err();
        assert_eq!(err, WeatherError::missing("main.humidity"));
    }

    #[test]
    fn missing_nested_objects_are_named() {
        let mut payload = paris_payload();
        payload.as_object_mut().unwrap().remove("sys");
        assert_eq!(normalize(&payload.to_string()).unwrap_err(), WeatherError::missing("sys"));

        let mut payload = paris_payload();
        payload["weather"] = json!([]);
        assert_eq!(
            normalize(&payload.to_string()).unwrap_err(),
            WeatherError::missing("weather[0]")
        );

        let mut payload = paris_payload();
        payload.as_object_mut().unwrap().remove("timezone");
        assert_eq!(
            normalize(&payload.to_string()).unwrap_err(),
            WeatherError::missing("timezone")
        );
    }

    #[test]
    fn fractional_humidity_is_rounded() {
        let mut payload = paris_payload();
        payload["main"]["humidity"] = json!(40.0);
        assert_eq!(normalize(&payload.to_string()).unwrap().humidity_pct, 40);

        payload["main"]["humidity"] = json!(40.5);
        assert_eq!(normalize(&payload.to_string()).unwrap().humidity_pct, 41);
    }

    #[test]
    fn out_of_range_humidity_names_the_field() {
        let mut payload = paris_payload();
        payload["main"]["humidity"] = json!(140);

        let err = normalize(&payload.to_string()).unwrap_err();
        assert_eq!(err, WeatherError::Decode("field `main.humidity` out of range: 140".into()));
    }

    #[test]
    fn error_status_wins_over_unreadable_body() {
        let query = LocationQuery::Name { value: "atlantis".into() };
        let body = Err(WeatherError::Network("connection reset".into()));

        let err = classify(StatusCode::NOT_FOUND, body, &query).unwrap_err();
        assert_eq!(err, WeatherError::Provider { status: 404, message: "City not found".into() });
    }

    #[test]
    fn unreadable_body_on_success_is_a_network_error() {
        let query = LocationQuery::Name { value: "paris".into() };
        let body = Err(WeatherError::Network("connection reset".into()));

        let err = classify(StatusCode::OK, body, &query).unwrap_err();
        assert_eq!(err, WeatherError::Network("connection reset".into()));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = normalize("{ not json").unwrap_err();
        assert!(matches!(err, WeatherError::Decode(msg) if msg.starts_with("invalid JSON")));
    }

    #[test]
    fn provider_error_prefers_body_message() {
        let query = LocationQuery::Name { value: "atlantis".into() };
        let err = provider_error(404, r#"{"cod":"404","message":"city not found"}"#, &query);
        assert_eq!(err, WeatherError::Provider { status: 404, message: "city not found".into() });
    }

    #[test]
    fn provider_error_falls_back_per_query_kind() {
        let by_name = LocationQuery::Name { value: "x".into() };
        let by_coords = LocationQuery::coords(1.0, 2.0);

        assert_eq!(
            provider_error(500, "oops", &by_name),
            WeatherError::Provider { status: 500, message: "City not found".into() }
        );
        assert_eq!(
            provider_error(502, "", &by_coords),
            WeatherError::Provider { status: 502, message: "Weather not found".into() }
        );
    }

    #[test]
    fn request_params_carry_key_and_units() {
        let provider = OpenWeatherProvider::new("KEY".into());
        let params = provider.request_params(&LocationQuery::coords(10.5, -3.0));

        assert_eq!(
            params,
            vec![
                ("lat", "10.5".to_string()),
                ("lon", "-3".to_string()),
                ("appid", "KEY".to_string()),
                ("units", "metric".to_string()),
            ]
        );
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert!(out.len() <= 203);
    }
}
