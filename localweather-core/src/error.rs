use thiserror::Error;

/// Everything that can end a request cycle.
///
/// Errors are stored inside [`crate::OperationState::Failure`], so they carry
/// owned strings instead of the underlying `reqwest`/`serde_json` errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("Please enter a city name")]
    EmptyInput,

    #[error("Geolocation is not supported on this system.")]
    CapabilityUnavailable,

    #[error("Unable to retrieve your location: {0}")]
    PositionUnavailable(String),

    #[error("{message} (HTTP {status})")]
    Provider { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected weather data: {0}")]
    Decode(String),
}

impl WeatherError {
    /// Short machine-friendly label, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherError::EmptyInput => "empty_input",
            WeatherError::CapabilityUnavailable => "capability_unavailable",
            WeatherError::PositionUnavailable(_) => "position_unavailable",
            WeatherError::Provider { .. } => "provider",
            WeatherError::Network(_) => "network",
            WeatherError::Decode(_) => "decode",
        }
    }

    pub(crate) fn missing(path: &str) -> Self {
        WeatherError::Decode(format!("missing field `{path}`"))
    }
}
