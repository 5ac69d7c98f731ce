//! Core library for the `localweather` CLI.
//!
//! This crate defines:
//! - Location resolution (typed city name or device position)
//! - The OpenWeather provider and payload normalization
//! - The weather pipeline state machine and its live local clock
//! - Configuration & credentials handling
//!
//! It is used by `localweather-cli`, but any front end can drive
//! [`WeatherPipeline`] and render its state.

pub mod clock;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod provider;

pub use clock::{ClockTicker, SystemClock, TimeSource, format_local_time};
pub use config::Config;
pub use error::WeatherError;
pub use location::{FixedPosition, IpPosition, LocationResolver, Position, PositionSource};
pub use model::{LocationQuery, OperationState, WeatherResult};
pub use pipeline::WeatherPipeline;
pub use provider::{OpenWeatherProvider, WeatherProvider, provider_from_config};
