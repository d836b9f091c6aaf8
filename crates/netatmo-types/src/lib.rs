//! Data model for Netatmo weather stations.
//!
//! This crate provides the types shared by the collector core and the
//! exporter binary.
//!
//! # Features
//!
//! - Stations, their linked modules and per-device measurement sets
//! - Immutable [`Snapshot`] of everything captured at one refresh
//! - Wire model of the upstream `getstationsdata` response (`serde` feature)
//!
//! # Example
//!
//! ```
//! use netatmo_types::{Measurements, Module, Snapshot, Station};
//! use time::OffsetDateTime;
//!
//! let now = OffsetDateTime::now_utc();
//! let station = Station::new("Home", Measurements::at(now))
//!     .with_module(Module::new("Outdoor", Measurements::at(now)));
//! let snapshot = Snapshot::new(now, vec![station]);
//!
//! assert_eq!(snapshot.sensor_count(), 2);
//! ```

pub mod error;
pub mod types;
#[cfg(feature = "serde")]
pub mod wire;

pub use error::{ParseError, ParseResult};
pub use types::{Measurements, Module, SensorRef, Snapshot, Station};
#[cfg(feature = "serde")]
pub use wire::parse_stations_data;
