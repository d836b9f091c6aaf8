//! Mock station source for testing.
//!
//! This module provides a source that can be used for unit testing without
//! talking to the real API.
//!
//! The [`MockSource`] implements the [`StationSource`] trait, allowing it to
//! be used interchangeably with [`crate::NetatmoClient`] in generic code.
//!
//! # Features
//!
//! - **Failure injection**: Fail every read, or only the next N reads
//! - **Latency simulation**: Add artificial delays to simulate a slow upstream
//! - **Hold gate**: Park reads until the test releases them, to observe an
//!   in-flight refresh

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, Semaphore};

use netatmo_types::Station;

use crate::error::{Error, Result};
use crate::traits::StationSource;

/// A mock upstream for testing.
///
/// # Example
///
/// ```
/// use netatmo_core::{MockSource, StationSource};
/// use netatmo_types::{Measurements, Station};
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockSource::new(vec![Station::new("Home", Measurements::default())]);
///     let stations = source.read().await.unwrap();
///     assert_eq!(stations[0].name, "Home");
///     assert_eq!(source.read_count(), 1);
/// }
/// ```
pub struct MockSource {
    stations: RwLock<Vec<Station>>,
    read_count: AtomicU32,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated read latency in milliseconds (0 = no delay).
    read_latency_ms: AtomicU64,
    /// Number of reads to fail before succeeding.
    remaining_failures: AtomicU32,
    /// Whether reads wait on `gate` before completing.
    held: AtomicBool,
    gate: Semaphore,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("should_fail", &self.should_fail.load(Ordering::Relaxed))
            .field("held", &self.held.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MockSource {
    /// Create a mock that returns `stations` on every read.
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations: RwLock::new(stations),
            read_count: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            read_latency_ms: AtomicU64::new(0),
            remaining_failures: AtomicU32::new(0),
            held: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    /// Replace the stations returned by subsequent reads.
    pub async fn set_stations(&self, stations: Vec<Station>) {
        *self.stations.write().await = stations;
    }

    /// Set whether reads should fail.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Number of reads started so far.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Set simulated read latency.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Fail the next `count` reads, then resume normal behavior.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Make subsequent reads wait until [`release`](Self::release) is called.
    pub fn hold(&self) {
        self.held.store(true, Ordering::Relaxed);
    }

    /// Let `count` held reads complete.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }
}

#[async_trait]
impl StationSource for MockSource {
    async fn read(&self) -> Result<Vec<Station>> {
        self.read_count.fetch_add(1, Ordering::Relaxed);

        if self.held.load(Ordering::Relaxed) {
            match self.gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(Error::Mock("gate closed".to_string())),
            }
        }

        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        // Check for transient failures first
        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(Error::Mock(self.fail_message.read().await.clone()));
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::Mock(self.fail_message.read().await.clone()));
        }

        Ok(self.stations.read().await.clone())
    }
}
