//! Live local clock derived from a UTC offset.
//!
//! [`format_local_time`] is the pure part. [`ClockTicker`] republishes it once
//! per second into a `watch` channel and stops as soon as it is dropped.

use std::{fmt::Debug, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const TICK: Duration = Duration::from_secs(1);

/// Source of "now". Production code uses [`SystemClock`].
pub trait TimeSource: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Wall-clock time at `offset_seconds` east of UTC, e.g. `3:04:05 PM`.
pub fn format_local_time(now: DateTime<Utc>, offset_seconds: i32) -> String {
    let local = now + chrono::Duration::seconds(i64::from(offset_seconds));
    local.format("%-I:%M:%S %p").to_string()
}

/// Periodic recomputation of the local time, owned by a successful result.
#[derive(Debug)]
pub struct ClockTicker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    out: watch::Sender<Option<String>>,
}

impl ClockTicker {
    /// Starts ticking immediately; must be called inside a tokio runtime.
    pub fn spawn(
        offset_seconds: i32,
        source: Arc<dyn TimeSource>,
        out: watch::Sender<Option<String>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let task_out = out.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let text = format_local_time(source.now(), offset_seconds);
                        // Checked under the channel lock so a stopped ticker
                        // can never overwrite the cleared value.
                        task_out.send_if_modified(|slot| {
                            if task_cancel.is_cancelled() {
                                return false;
                            }
                            *slot = Some(text);
                            true
                        });
                    }
                }
            }
        });

        Self { cancel, handle, out }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
        self.out.send_replace(None);
    }
}
