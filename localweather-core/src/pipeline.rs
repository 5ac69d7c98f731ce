//! The location-to-display pipeline.
//!
//! [`WeatherPipeline`] owns the single [`OperationState`] slot. Each call to
//! [`WeatherPipeline::fetch`] runs one request cycle:
//!
//! ```text
//! idle ─┬─> loading ─┬─> success(result)   (starts the live clock)
//!       │            └─> failure(error)
//!       └─ any new fetch re-enters loading and supersedes the in-flight one
//! ```
//!
//! A superseded cycle is cancelled and never writes state, so the slot always
//! reflects the most recently *requested* location.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    LocationQuery, OperationState, WeatherError, WeatherResult,
    clock::{ClockTicker, SystemClock, TimeSource},
    provider::WeatherProvider,
};

#[derive(Debug, Default)]
struct Inflight {
    generation: u64,
    cancel: Option<CancellationToken>,
    ticker: Option<ClockTicker>,
}

#[derive(Debug)]
pub struct WeatherPipeline {
    provider: Arc<dyn WeatherProvider>,
    time: Arc<dyn TimeSource>,
    state: watch::Sender<OperationState>,
    local_time: watch::Sender<Option<String>>,
    inflight: Mutex<Inflight>,
}

impl WeatherPipeline {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self::with_time_source(provider, Arc::new(SystemClock))
    }

    pub fn with_time_source(provider: Arc<dyn WeatherProvider>, time: Arc<dyn TimeSource>) -> Self {
        let (state, _) = watch::channel(OperationState::Idle);
        let (local_time, _) = watch::channel(None);

        Self {
            provider,
            time,
            state,
            local_time,
            inflight: Mutex::new(Inflight::default()),
        }
    }

    pub fn state(&self) -> OperationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OperationState> {
        self.state.subscribe()
    }

    /// Current local time at the result's location, present only on success.
    pub fn local_time(&self) -> Option<String> {
        self.local_time.borrow().clone()
    }

    pub fn subscribe_local_time(&self) -> watch::Receiver<Option<String>> {
        self.local_time.subscribe()
    }

    pub fn clock_running(&self) -> bool {
        self.inflight.lock().ticker.as_ref().is_some_and(ClockTicker::is_running)
    }

    /// Starts a request cycle for `query`.
    ///
    /// The state is `Loading` as soon as this returns, before the future is
    /// polled. The future resolves to the terminal state of this cycle, or to
    /// the current state if a newer fetch superseded it. Dropping the future
    /// before it completes ends the cycle with a `Network` failure.
    pub fn fetch(
        &self,
        query: LocationQuery,
    ) -> impl Future<Output = OperationState> + Send + '_ {
        let (generation, cancel) = self.begin();
        let guard = CycleGuard { pipeline: self, generation };

        async move {
            let _guard = guard;
            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                res = self.provider.current(&query) => Some(res),
            };

            match outcome {
                Some(res) => self.finish(generation, res),
                None => {
                    debug!(generation, %query, "fetch superseded before completion");
                    self.state()
                }
            }
        }
    }

    /// Records a failure that happened before a request could be made, such
    /// as an empty city name or a denied position request.
    pub fn report(&self, error: WeatherError) -> OperationState {
        let mut inflight = self.inflight.lock();
        inflight.generation += 1;
        if let Some(cancel) = inflight.cancel.take() {
            cancel.cancel();
        }
        inflight.ticker = None;

        warn!(kind = error.kind(), %error, "request failed before fetching");
        let state = OperationState::Failure(error);
        self.state.send_replace(state.clone());
        state
    }

    /// Cancels any in-flight fetch and stops the live clock.
    pub fn teardown(&self) {
        let mut inflight = self.inflight.lock();
        inflight.generation += 1;
        if let Some(cancel) = inflight.cancel.take() {
            cancel.cancel();
        }
        inflight.ticker = None;
        debug!("pipeline torn down");
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut inflight = self.inflight.lock();
        inflight.generation += 1;
        if let Some(previous) = inflight.cancel.take() {
            previous.cancel();
        }
        inflight.ticker = None;

        let cancel = CancellationToken::new();
        inflight.cancel = Some(cancel.clone());
        self.state.send_replace(OperationState::Loading);

        debug!(generation = inflight.generation, "loading");
        (inflight.generation, cancel)
    }

    /// Ends a cycle whose future was dropped before it completed.
    fn abandon(&self, generation: u64) {
        let mut inflight = self.inflight.lock();
        if inflight.generation != generation {
            return;
        }
        let Some(cancel) = inflight.cancel.take() else {
            return;
        };
        cancel.cancel();
        inflight.ticker = None;

        warn!(generation, "fetch dropped before completion");
        self.state
            .send_replace(OperationState::Failure(WeatherError::Network("request cancelled".into())));
    }

    fn finish(&self, generation: u64, res: Result<WeatherResult, WeatherError>) -> OperationState {
        let mut inflight = self.inflight.lock();
        if inflight.generation != generation {
            warn!(generation, current = inflight.generation, "discarding stale response");
            return self.state();
        }
        inflight.cancel = None;

        let state = match res {
            Ok(result) => {
                debug!(location = %result.location_name, timezone = result.timezone, "weather loaded");
                inflight.ticker = Some(ClockTicker::spawn(
                    result.timezone,
                    self.time.clone(),
                    self.local_time.clone(),
                ));
                OperationState::Success(result)
            }
            Err(error) => {
                warn!(kind = error.kind(), %error, "weather request failed");
                inflight.ticker = None;
                OperationState::Failure(error)
            }
        };

        self.state.send_replace(state.clone());
        state
    }
}

/// Travels with the future returned by [`WeatherPipeline::fetch`] so a dropped
/// cycle still leaves `Loading`.
struct CycleGuard<'a> {
    pipeline: &'a WeatherPipeline,
    generation: u64,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.pipeline.abandon(self.generation);
    }
}

impl Drop for WeatherPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}
