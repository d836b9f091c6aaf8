//! Core types for weather station data.

use time::OffsetDateTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The latest readings reported by a station or one of its modules.
///
/// Every field is independently optional. An absent field means the device
/// does not carry that sensor, which is different from a sensor reporting zero.
/// An absent [`captured_at`](Self::captured_at) means no data has been
/// received for the device yet.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurements {
    /// When the readings were taken.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::timestamp::option")
    )]
    pub captured_at: Option<OffsetDateTime>,
    /// Temperature in degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity in percent.
    pub humidity: Option<f64>,
    /// CO2 concentration in ppm.
    pub co2: Option<f64>,
    /// Noise level in dB.
    pub noise: Option<f64>,
    /// Atmospheric pressure in mbar.
    pub pressure: Option<f64>,
    /// Wind strength in km/h.
    pub wind_strength: Option<f64>,
    /// Wind direction in degrees.
    pub wind_direction: Option<f64>,
    /// Rain amount in mm.
    pub rain: Option<f64>,
    /// Remaining battery life in percent.
    pub battery_percent: Option<f64>,
    /// WiFi signal quality (86: bad, 71: avg, 56: good).
    pub wifi_signal: Option<f64>,
    /// RF signal quality (90: lowest, 60: highest).
    pub rf_signal: Option<f64>,
}

impl Measurements {
    /// Create an empty measurement set taken at `captured_at`.
    pub fn at(captured_at: OffsetDateTime) -> Self {
        Self {
            captured_at: Some(captured_at),
            ..Self::default()
        }
    }

    /// Returns `true` if no reading has ever been received.
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none()
    }
}

/// A sub-sensor unit linked to a [`Station`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Module {
    /// Module name as configured by the owner.
    pub name: String,
    /// Latest readings.
    pub measurements: Measurements,
}

impl Module {
    pub fn new(name: impl Into<String>, measurements: Measurements) -> Self {
        Self {
            name: name.into(),
            measurements,
        }
    }
}

/// A weather station.
///
/// A station is a sensor in its own right and also owns the modules that are
/// paired with it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Station {
    /// Station name as configured by the owner.
    pub name: String,
    /// Readings taken by the station itself.
    pub measurements: Measurements,
    /// Linked modules.
    #[cfg_attr(feature = "serde", serde(default))]
    pub modules: Vec<Module>,
}

impl Station {
    pub fn new(name: impl Into<String>, measurements: Measurements) -> Self {
        Self {
            name: name.into(),
            measurements,
            modules: Vec::new(),
        }
    }

    /// Attach a module, builder style.
    #[must_use]
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }
}

/// A sensor-bearing entity as seen from the metrics layer.
///
/// For a station reporting on itself, `name` and `station` are both the
/// station name.
#[derive(Debug, Clone, Copy)]
pub struct SensorRef<'a> {
    /// Name of the entity (module name, or the station name for the station itself).
    pub name: &'a str,
    /// Name of the owning station.
    pub station: &'a str,
    /// The entity's readings.
    pub measurements: &'a Measurements,
}

/// Immutable captured state of all stations at one refresh.
///
/// A snapshot is never mutated once built; a refresh produces a new one that
/// replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    /// When the snapshot was captured; `None` for the empty initial snapshot.
    #[cfg_attr(
        feature = "serde",
        serde(default, with = "time::serde::timestamp::option")
    )]
    pub captured_at: Option<OffsetDateTime>,
    /// Stations in upstream order.
    pub stations: Vec<Station>,
}

impl Snapshot {
    /// The snapshot published before any refresh has succeeded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(captured_at: OffsetDateTime, stations: Vec<Station>) -> Self {
        Self {
            captured_at: Some(captured_at),
            stations,
        }
    }

    /// Number of modules across all stations.
    pub fn module_count(&self) -> usize {
        self.stations.iter().map(|s| s.modules.len()).sum()
    }

    /// Number of sensor-bearing entities (stations plus modules).
    pub fn sensor_count(&self) -> usize {
        self.stations.len() + self.module_count()
    }

    /// Iterate over every sensor: each station first, then its modules.
    pub fn sensors(&self) -> impl Iterator<Item = SensorRef<'_>> {
        self.stations.iter().flat_map(|station| {
            let own = SensorRef {
                name: &station.name,
                station: &station.name,
                measurements: &station.measurements,
            };
            std::iter::once(own).chain(station.modules.iter().map(move |module| SensorRef {
                name: &module.name,
                station: &station.name,
                measurements: &module.measurements,
            }))
        })
    }
}
