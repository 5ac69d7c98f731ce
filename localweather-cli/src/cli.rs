use std::{io::Write, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use localweather_core::{
    Config, FixedPosition, LocationQuery, LocationResolver, OperationState, Position,
    PositionSource, WeatherPipeline, provider_from_config,
};
use tokio::sync::watch;
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "localweather", version, about = "Current weather and local time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key in the config file.
    Configure,

    /// Show weather for a city.
    Show {
        /// City name, e.g. `paris` or `new york`.
        #[arg(num_args = 0..)]
        city: Vec<String>,

        /// Keep redrawing the local time until Ctrl-C.
        #[arg(long)]
        watch: bool,
    },

    /// Show weather for the current position.
    Here {
        /// Latitude in decimal degrees; overrides the configured position source.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Keep redrawing the local time until Ctrl-C.
        #[arg(long)]
        watch: bool,
    },
}

impl Cli {
    /// Returns the process exit code.
    pub async fn run(self) -> anyhow::Result<i32> {
        match self.command {
            Command::Configure => {
                configure()?;
                Ok(0)
            }
            Command::Show { city, watch } => {
                let query = match LocationResolver::resolve_by_name(&city.join(" ")) {
                    Ok(query) => query,
                    Err(err) => {
                        if let Some(line) = render::status(&OperationState::Failure(err)) {
                            eprintln!("{line}");
                        }
                        return Ok(1);
                    }
                };

                let config = Config::load()?;
                let pipeline = build_pipeline(&config)?;
                show(&pipeline, &config.provider.icon_base_url, query, watch).await
            }
            Command::Here { lat, lon, watch } => {
                let config = Config::load()?;
                let source: Option<Arc<dyn PositionSource>> = match (lat, lon) {
                    (Some(latitude), Some(longitude)) => {
                        Some(Arc::new(FixedPosition(Position { latitude, longitude })))
                    }
                    _ => config.position_source()?,
                };

                here(&config, LocationResolver::new(source), watch).await
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    config.set_api_key(api_key);
    let path = config.save()?;
    println!("Saved configuration to {}", path.display());

    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<WeatherPipeline> {
    let provider = provider_from_config(config)?;
    Ok(WeatherPipeline::new(Arc::new(provider)))
}

/// The key is checked before the device is asked for its position.
async fn here(config: &Config, resolver: LocationResolver, watch: bool) -> anyhow::Result<i32> {
    let pipeline = build_pipeline(config)?;

    match resolver.resolve_by_device().await {
        Ok(query) => show(&pipeline, &config.provider.icon_base_url, query, watch).await,
        Err(err) => {
            let state = pipeline.report(err);
            if let Some(line) = render::status(&state) {
                eprintln!("{line}");
            }
            Ok(1)
        }
    }
}

async fn show(
    pipeline: &WeatherPipeline,
    icon_base: &str,
    query: LocationQuery,
    watch: bool,
) -> anyhow::Result<i32> {
    debug!(%query, "fetching");
    let pending = pipeline.fetch(query);
    if let Some(line) = render::status(&pipeline.state()) {
        eprintln!("{line}");
    }
    let state = pending.await;

    let code = match &state {
        OperationState::Success(result) => {
            let mut clock = pipeline.subscribe_local_time();
            let local_time = clock.wait_for(Option::is_some).await?.clone();
            println!("{}", render::card(result, local_time.as_deref(), icon_base));

            if watch {
                watch_clock(clock).await?;
            }
            0
        }
        other => {
            if let Some(line) = render::status(other) {
                eprintln!("{line}");
            }
            1
        }
    };

    pipeline.teardown();
    Ok(code)
}

async fn watch_clock(mut clock: watch::Receiver<Option<String>>) -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut stdout = std::io::stdout();
    println!();

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = clock.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = render::clock_line(clock.borrow_and_update().as_deref());
                write!(stdout, "\r{line}")?;
                stdout.flush()?;
            }
        }
    }

    println!();
    Ok(())
}
