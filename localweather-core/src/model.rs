use serde::{Deserialize, Serialize};

use crate::WeatherError;

/// Where weather is requested for.
///
/// Build the `Name` variant through [`crate::LocationResolver::resolve_by_name`],
/// which guarantees a trimmed, non-empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LocationQuery {
    Name { value: String },
    Coords { lat: f64, lon: f64 },
}

impl LocationQuery {
    pub fn coords(lat: f64, lon: f64) -> Self {
        LocationQuery::Coords { lat, lon }
    }

    /// Query parameters selecting the location on the provider side.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            LocationQuery::Name { value } => vec![("q", value.clone())],
            LocationQuery::Coords { lat, lon } => {
                vec![("lat", lat.to_string()), ("lon", lon.to_string())]
            }
        }
    }
}

impl std::fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationQuery::Name { value } => f.write_str(value),
            LocationQuery::Coords { lat, lon } => write!(f, "{lat}, {lon}"),
        }
    }
}

/// Normalized current conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub location_name: String,
    pub country: String,
    pub description: String,
    pub icon: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub pressure_hpa: f64,
    /// Seconds east of UTC.
    pub timezone: i32,
}

impl WeatherResult {
    pub fn temperature_display(&self) -> String {
        format!("{}°C", round_half_up(self.temperature_c))
    }

    pub fn feels_like_display(&self) -> String {
        format!("{}°C", round_half_up(self.feels_like_c))
    }

    pub fn humidity_display(&self) -> String {
        format!("{}%", self.humidity_pct)
    }

    pub fn wind_display(&self) -> String {
        format!("{} m/s", round_half_up(self.wind_speed_mps))
    }

    pub fn pressure_display(&self) -> String {
        format!("{} hPa", self.pressure_hpa)
    }

    pub fn icon_url(&self, icon_base_url: &str) -> String {
        format!("{}/{}@2x.png", icon_base_url.trim_end_matches('/'), self.icon)
    }
}

/// Rounds to the nearest integer with ties going up, so `-2.5` becomes `-2`.
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// The single state slot of a [`crate::WeatherPipeline`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum OperationState {
    #[default]
    Idle,
    Loading,
    Success(WeatherResult),
    Failure(WeatherError),
}

impl OperationState {
    pub fn is_loading(&self) -> bool {
        matches!(self, OperationState::Loading)
    }

    pub fn result(&self) -> Option<&WeatherResult> {
        match self {
            OperationState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&WeatherError> {
        match self {
            OperationState::Failure(err) => Some(err),
            _ => None,
        }
    }

    /// User-visible failure message, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}
