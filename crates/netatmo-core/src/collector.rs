//! Refresh-and-cache collector.
//!
//! The [`Collector`] owns the published [`Snapshot`] and the refresh
//! bookkeeping. Scrapes call [`Collector::sample`], which never waits on the
//! upstream: when the refresh interval has elapsed it spawns a background
//! refresh and immediately renders whatever snapshot is currently published.
//!
//! # Concurrency
//!
//! All shared state lives in one [`RwLock<RefreshState>`]:
//!
//! - **Read mode**: scrapes take a consistent view (snapshot `Arc`, last
//!   attempt, last outcome) and release the lock before rendering.
//! - **Write mode**: the dispatch step re-checks the gate and sets
//!   `in_progress` together with `last_attempt`; the completion handler swaps
//!   the snapshot and clears `in_progress`.
//!
//! At most one refresh is in flight. A refresh that never finishes keeps
//! `in_progress` set, so no further refresh is dispatched, but scrapes keep
//! serving the last published snapshot.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, warn};

use netatmo_types::{Snapshot, Station};

use crate::error::{Error, Result};
use crate::gate;
use crate::metrics::{
    self, CACHE_UPDATED_TIME, LAST_REFRESH_TIME, MetricDesc, Observation, UP,
};
use crate::staleness::{self, Freshness, RefreshOutcome};
use crate::traits::StationSource;

/// Timing parameters of a [`Collector`].
///
/// Both durations must be non-zero; the exporter's configuration layer
/// enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorSettings {
    /// Minimum spacing between upstream refresh attempts.
    pub refresh_interval: Duration,
    /// Maximum age of a reading before it is left out of samples.
    pub stale_threshold: Duration,
}

#[derive(Debug)]
struct RefreshState {
    last_attempt: Option<OffsetDateTime>,
    last_outcome: Option<RefreshOutcome>,
    last_error: Option<String>,
    snapshot: Arc<Snapshot>,
    in_progress: bool,
    completed: u64,
}

impl RefreshState {
    fn new() -> Self {
        Self {
            last_attempt: None,
            last_outcome: None,
            last_error: None,
            snapshot: Arc::new(Snapshot::empty()),
            in_progress: false,
            completed: 0,
        }
    }
}

/// What a scrape needs from the shared state, copied out under the read lock.
struct View {
    last_attempt: Option<OffsetDateTime>,
    last_outcome: Option<RefreshOutcome>,
    snapshot: Arc<Snapshot>,
}

struct Inner {
    source: Arc<dyn StationSource>,
    settings: CollectorSettings,
    state: RwLock<RefreshState>,
    refreshes_tx: watch::Sender<u64>,
}

/// Collector serving cached station readings as metric observations.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Collector {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("settings", &self.inner.settings)
            .finish()
    }
}

impl Collector {
    /// Create a collector with an empty snapshot and no refresh history.
    pub fn new(source: Arc<dyn StationSource>, settings: CollectorSettings) -> Self {
        let (refreshes_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                source,
                settings,
                state: RwLock::new(RefreshState::new()),
                refreshes_tx,
            }),
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.inner.settings
    }

    /// Every metric identity this collector can emit.
    pub fn describe(&self) -> &'static [&'static MetricDesc] {
        metrics::describe()
    }

    /// Produce the observations for one scrape at `now`.
    ///
    /// Dispatches a background refresh when one is due, then renders the state
    /// as it was when the scrape began. The refresh dispatched by this call is
    /// therefore only visible to later scrapes.
    pub async fn sample(&self, now: OffsetDateTime) -> Vec<Observation> {
        let (view, due) = {
            let state = self.inner.state.read().await;
            let due = gate::should_refresh(
                now,
                state.last_attempt,
                self.inner.settings.refresh_interval,
                state.in_progress,
            );
            let view = View {
                last_attempt: state.last_attempt,
                last_outcome: state.last_outcome,
                snapshot: Arc::clone(&state.snapshot),
            };
            (view, due)
        };

        if due {
            self.poll_refresh(now).await;
        }

        self.render(&view, now)
    }

    /// Dispatch a background refresh if one is due at `now`.
    ///
    /// Returns `true` if this call dispatched a refresh.
    pub async fn poll_refresh(&self, now: OffsetDateTime) -> bool {
        {
            let mut state = self.inner.state.write().await;
            if !gate::should_refresh(
                now,
                state.last_attempt,
                self.inner.settings.refresh_interval,
                state.in_progress,
            ) {
                return false;
            }

            match state.last_attempt {
                Some(last) => debug!(
                    "Refresh interval elapsed: {} > {:?}",
                    now - last,
                    self.inner.settings.refresh_interval
                ),
                None => debug!("Initial refresh"),
            }
            state.in_progress = true;
            state.last_attempt = Some(now);
        }

        self.spawn_refresh(now);
        true
    }

    fn spawn_refresh(&self, now: OffsetDateTime) {
        let collector = self.clone();
        tokio::spawn(async move {
            let source = Arc::clone(&collector.inner.source);
            // Run the read in its own task so a panic still reaches the
            // completion handler and clears `in_progress`.
            let result = match tokio::spawn(async move { source.read().await }).await {
                Ok(result) => result,
                Err(e) => Err(Error::TaskFailed(e.to_string())),
            };
            collector.complete_refresh(now, result).await;
        });
    }

    /// Apply the result of a refresh attempted at `now`.
    ///
    /// This is the only writer of the published snapshot.
    async fn complete_refresh(&self, now: OffsetDateTime, result: Result<Vec<Station>>) {
        let completed = {
            let mut state = self.inner.state.write().await;
            match result {
                Ok(stations) => {
                    let snapshot = Snapshot::new(now, stations);
                    info!(
                        "Refreshed data: {} station(s), {} module(s)",
                        snapshot.stations.len(),
                        snapshot.module_count()
                    );
                    state.snapshot = Arc::new(snapshot);
                    state.last_outcome = Some(RefreshOutcome::Succeeded);
                    state.last_error = None;
                }
                Err(e) => {
                    error!("Error during refresh: {}", e);
                    state.last_outcome = Some(RefreshOutcome::Failed);
                    state.last_error = Some(e.to_string());
                }
            }
            state.in_progress = false;
            state.completed += 1;
            state.completed
        };

        self.inner.refreshes_tx.send_replace(completed);
    }

    fn render(&self, view: &View, now: OffsetDateTime) -> Vec<Observation> {
        let snapshot = &view.snapshot;
        let mut observations = Vec::with_capacity(3 + snapshot.sensor_count() * 4);

        observations.push(Observation::new(&UP, staleness::up_value(view.last_outcome)));
        observations.push(Observation::new(
            &LAST_REFRESH_TIME,
            staleness::unix_seconds(view.last_attempt),
        ));
        observations.push(Observation::new(
            &CACHE_UPDATED_TIME,
            staleness::unix_seconds(snapshot.captured_at),
        ));

        // A label pair is exported once; the first entity carrying it wins.
        let mut exported = HashSet::new();
        let threshold = self.inner.settings.stale_threshold;
        for sensor in snapshot.sensors() {
            match staleness::evaluate(sensor.measurements.captured_at, now, threshold) {
                Freshness::Fresh if !exported.insert((sensor.name, sensor.station)) => {
                    warn!(
                        "Skipping {} ({}): another sensor of this station has the same name",
                        sensor.name, sensor.station
                    );
                }
                Freshness::Fresh => observations.extend(metrics::sensor_observations(
                    sensor.name,
                    sensor.station,
                    sensor.measurements,
                )),
                Freshness::Missing => {
                    debug!("No data available for {} ({})", sensor.name, sensor.station);
                }
                Freshness::Stale { age } => {
                    debug!(
                        "Data is stale for {}: {} > {:?}",
                        sensor.name, age, threshold
                    );
                }
            }
        }

        observations
    }

    /// Current refresh bookkeeping, for health reporting.
    pub async fn status(&self) -> CollectorStatus {
        let state = self.inner.state.read().await;
        CollectorStatus {
            last_attempt: state.last_attempt,
            cache_updated: state.snapshot.captured_at,
            last_outcome: state.last_outcome,
            last_error: state.last_error.clone(),
            refresh_in_progress: state.in_progress,
            refreshes_completed: state.completed,
            stations: state.snapshot.stations.len(),
            modules: state.snapshot.module_count(),
        }
    }

    /// The currently published snapshot.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.state.read().await.snapshot)
    }

    /// Subscribe to the number of completed refreshes.
    ///
    /// The value is bumped after each completion has been applied.
    pub fn subscribe_refreshes(&self) -> watch::Receiver<u64> {
        self.inner.refreshes_tx.subscribe()
    }
}

/// Refresh bookkeeping exposed to the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorStatus {
    /// Time of the last refresh attempt, successful or not.
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_attempt: Option<OffsetDateTime>,
    /// Capture time of the published snapshot.
    #[serde(with = "time::serde::rfc3339::option")]
    pub cache_updated: Option<OffsetDateTime>,
    /// Outcome of the last completed refresh.
    pub last_outcome: Option<RefreshOutcome>,
    /// Error text of the last refresh, if it failed.
    pub last_error: Option<String>,
    pub refresh_in_progress: bool,
    pub refreshes_completed: u64,
    /// Stations in the published snapshot.
    pub stations: usize,
    /// Modules in the published snapshot.
    pub modules: usize,
}

impl CollectorStatus {
    /// Whether the last completed refresh succeeded.
    pub fn is_up(&self) -> bool {
        self.last_outcome == Some(RefreshOutcome::Succeeded)
    }
}
