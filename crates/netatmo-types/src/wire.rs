//! Wire model of the `getstationsdata` API response.
//!
//! Only the fields the exporter consumes are modelled; everything else in the
//! payload is ignored. Every reading is optional because devices only report
//! the sensors they carry.

use serde::Deserialize;
use time::OffsetDateTime;

use crate::error::{ParseError, ParseResult};
use crate::types::{Measurements, Module, Station};

/// Top-level response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StationsDataResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub body: StationsDataBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationsDataBody {
    #[serde(default)]
    pub devices: Vec<WireDevice>,
}

/// A station as reported upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireDevice {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub station_name: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub dashboard_data: Option<DashboardData>,
    #[serde(default)]
    pub wifi_status: Option<f64>,
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default)]
    pub rf_status: Option<f64>,
    #[serde(default)]
    pub modules: Vec<WireModule>,
}

/// A module as reported upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireModule {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub dashboard_data: Option<DashboardData>,
    #[serde(default)]
    pub battery_percent: Option<f64>,
    #[serde(default)]
    pub rf_status: Option<f64>,
    #[serde(default)]
    pub wifi_status: Option<f64>,
}

/// Latest measurements block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub time_utc: Option<i64>,
    #[serde(rename = "Temperature", default)]
    pub temperature: Option<f64>,
    #[serde(rename = "Humidity", default)]
    pub humidity: Option<f64>,
    #[serde(rename = "CO2", default)]
    pub co2: Option<f64>,
    #[serde(rename = "Noise", default)]
    pub noise: Option<f64>,
    #[serde(rename = "Pressure", default)]
    pub pressure: Option<f64>,
    #[serde(rename = "WindStrength", default)]
    pub wind_strength: Option<f64>,
    #[serde(rename = "WindAngle", default)]
    pub wind_angle: Option<f64>,
    #[serde(rename = "Rain", default)]
    pub rain: Option<f64>,
}

/// Radio and battery fields live outside the dashboard block upstream.
struct Radio {
    battery_percent: Option<f64>,
    wifi_signal: Option<f64>,
    rf_signal: Option<f64>,
}

fn measurements(data: Option<&DashboardData>, radio: Radio) -> Measurements {
    let data = data.cloned().unwrap_or_default();
    Measurements {
        captured_at: data
            .time_utc
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
        temperature: data.temperature,
        humidity: data.humidity,
        co2: data.co2,
        noise: data.noise,
        pressure: data.pressure,
        wind_strength: data.wind_strength,
        wind_direction: data.wind_angle,
        rain: data.rain,
        battery_percent: radio.battery_percent,
        wifi_signal: radio.wifi_signal,
        rf_signal: radio.rf_signal,
    }
}

fn first_name(candidates: [Option<&String>; 2]) -> String {
    candidates
        .into_iter()
        .flatten()
        .find(|name| !name.is_empty())
        .cloned()
        .unwrap_or_default()
}

impl From<WireModule> for Module {
    fn from(module: WireModule) -> Self {
        let name = first_name([module.module_name.as_ref(), module.id.as_ref()]);
        let measurements = measurements(
            module.dashboard_data.as_ref(),
            Radio {
                battery_percent: module.battery_percent,
                wifi_signal: module.wifi_status,
                rf_signal: module.rf_status,
            },
        );
        Module { name, measurements }
    }
}

impl From<WireDevice> for Station {
    fn from(device: WireDevice) -> Self {
        let name = match device.station_name.as_ref().filter(|n| !n.is_empty()) {
            Some(name) => name.clone(),
            None => first_name([device.module_name.as_ref(), device.id.as_ref()]),
        };
        let measurements = measurements(
            device.dashboard_data.as_ref(),
            Radio {
                battery_percent: device.battery_percent,
                wifi_signal: device.wifi_status,
                rf_signal: device.rf_status,
            },
        );
        Station {
            name,
            measurements,
            modules: device.modules.into_iter().map(Module::from).collect(),
        }
    }
}

impl StationsDataResponse {
    /// Convert the response into the data model, preserving upstream order.
    pub fn into_stations(self) -> Vec<Station> {
        self.body.devices.into_iter().map(Station::from).collect()
    }
}

/// Parse a raw `getstationsdata` body into stations.
///
/// # Errors
///
/// Returns [`ParseError::Json`] for malformed payloads and
/// [`ParseError::Status`] when the envelope carries a status other than `ok`.
pub fn parse_stations_data(bytes: &[u8]) -> ParseResult<Vec<Station>> {
    let response: StationsDataResponse = serde_json::from_slice(bytes)?;
    match response.status.as_deref() {
        None | Some("ok") => Ok(response.into_stations()),
        Some(other) => Err(ParseError::Status(other.to_string())),
    }
}
