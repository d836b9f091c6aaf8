//! Refresh-and-cache collector for Netatmo weather stations.
//!
//! This crate decouples metric scrapes from the Netatmo API. A scrape never
//! waits on the upstream: it renders the most recently published snapshot and,
//! when the refresh interval has elapsed, kicks off a background refresh whose
//! result becomes visible to later scrapes.
//!
//! # Features
//!
//! - **Refresh gate**: At most one refresh in flight, spaced by a configurable interval
//! - **Staleness filtering**: Per-entity readings older than a threshold are left out
//! - **Health reporting**: `up`, last refresh time, and cache time gauges
//! - **Netatmo client**: OAuth2 refresh-token flow against `getstationsdata`
//! - **Mock source**: Failure injection, latency, and hold gates for tests
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use netatmo_core::{Collector, CollectorSettings, Credentials, NetatmoClient};
//! use time::OffsetDateTime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NetatmoClient::new(
//!         netatmo_core::client::DEFAULT_API_URL,
//!         Credentials {
//!             client_id: "id".to_string(),
//!             client_secret: "secret".to_string(),
//!             refresh_token: "token".to_string(),
//!         },
//!     )?;
//!
//!     let collector = Collector::new(
//!         Arc::new(client),
//!         CollectorSettings {
//!             refresh_interval: Duration::from_secs(480),
//!             stale_threshold: Duration::from_secs(3600),
//!         },
//!     );
//!
//!     for obs in collector.sample(OffsetDateTime::now_utc()).await {
//!         println!("{} {:?} {}", obs.desc.name, obs.labels, obs.value);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod collector;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod mock;
pub mod staleness;
pub mod traits;

pub use client::{Credentials, NetatmoClient};
pub use collector::{Collector, CollectorSettings, CollectorStatus};
pub use error::{Error, Result};
pub use metrics::{MetricDesc, MetricKind, Observation};
pub use mock::MockSource;
pub use staleness::{Freshness, RefreshOutcome};
pub use traits::StationSource;

// Re-export from netatmo-types
pub use netatmo_types::{Measurements, Module, Snapshot, Station};
