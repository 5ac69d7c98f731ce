use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{LocationQuery, WeatherError};

/// A device-reported position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// One-shot provider of the current device position.
///
/// Implementations answer exactly once per call and never retry.
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Position, WeatherError>;
}

/// Position known up front (command line or configuration).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Position, WeatherError> {
        Ok(self.0)
    }
}

/// Approximate position from an IP geolocation service (ip-api.com shape).
#[derive(Debug, Clone)]
pub struct IpPosition {
    endpoint: String,
    http: Client,
}

impl IpPosition {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::PositionUnavailable(e.to_string()))?;

        Ok(Self { endpoint: endpoint.into(), http })
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    lat: Option<f64>,
    lon: Option<f64>,
    message: Option<String>,
}

#[async_trait]
impl PositionSource for IpPosition {
    async fn current_position(&self) -> Result<Position, WeatherError> {
        debug!(endpoint = %self.endpoint, "requesting device position");

        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            if e.is_timeout() {
                WeatherError::PositionUnavailable("location request timed out".into())
            } else {
                WeatherError::PositionUnavailable(e.to_string())
            }
        })?;

        if !res.status().is_success() {
            return Err(WeatherError::PositionUnavailable(format!(
                "location service returned {}",
                res.status()
            )));
        }

        let parsed: IpApiResponse = res
            .json()
            .await
            .map_err(|e| WeatherError::PositionUnavailable(e.to_string()))?;

        if parsed.status != "success" {
            let reason = parsed.message.unwrap_or_else(|| "request denied".to_string());
            return Err(WeatherError::PositionUnavailable(reason));
        }

        match (parsed.lat, parsed.lon) {
            (Some(latitude), Some(longitude)) => Ok(Position { latitude, longitude }),
            _ => Err(WeatherError::PositionUnavailable(
                "location service returned no coordinates".into(),
            )),
        }
    }
}

/// Turns user input or the device position into a [`LocationQuery`].
#[derive(Debug, Clone, Default)]
pub struct LocationResolver {
    device: Option<Arc<dyn PositionSource>>,
}

impl LocationResolver {
    pub fn new(device: Option<Arc<dyn PositionSource>>) -> Self {
        Self { device }
    }

    pub fn with_device(device: Arc<dyn PositionSource>) -> Self {
        Self { device: Some(device) }
    }

    /// No local geocoding: the provider resolves the name.
    pub fn resolve_by_name(input: &str) -> Result<LocationQuery, WeatherError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(WeatherError::EmptyInput);
        }

        Ok(LocationQuery::Name { value: trimmed.to_string() })
    }

    /// Reported coordinates are trusted as-is.
    pub async fn resolve_by_device(&self) -> Result<LocationQuery, WeatherError> {
        let source = self.device.as_ref().ok_or(WeatherError::CapabilityUnavailable)?;

        match source.current_position().await {
            Ok(pos) => {
                debug!(lat = pos.latitude, lon = pos.longitude, "device position resolved");
                Ok(LocationQuery::coords(pos.latitude, pos.longitude))
            }
            Err(err) => {
                warn!(error = %err, "device position unavailable");
                if matches!(err, WeatherError::PositionUnavailable(_)) {
                    Err(err)
                } else {
                    Err(WeatherError::PositionUnavailable(err.to_string()))
                }
            }
        }
    }
}
