//! Metric identities and observations.
//!
//! [`describe`] lists every metric the collector can emit, independent of the
//! data currently cached. [`sensor_observations`] maps one entity's readings
//! to observations, skipping absent fields individually.

use netatmo_types::Measurements;

/// Prefix shared by every metric name.
pub const PREFIX: &str = "netatmo_";

/// Label schema of the per-sensor metrics.
pub const SENSOR_LABELS: &[&str] = &["module", "station"];

/// Prometheus metric type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    /// Name used in `# TYPE` lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// Static identity of a metric.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    pub labels: &'static [&'static str],
}

const fn gauge(name: &'static str, help: &'static str) -> MetricDesc {
    MetricDesc {
        name,
        help,
        kind: MetricKind::Gauge,
        labels: &[],
    }
}

const fn sensor_gauge(name: &'static str, help: &'static str) -> MetricDesc {
    MetricDesc {
        name,
        help,
        kind: MetricKind::Gauge,
        labels: SENSOR_LABELS,
    }
}

pub static UP: MetricDesc = gauge(
    "netatmo_up",
    "Zero if there was an error during the last refresh try.",
);
pub static LAST_REFRESH_TIME: MetricDesc = gauge(
    "netatmo_last_refresh_time",
    "Contains the time of the last refresh try, successful or not.",
);
pub static CACHE_UPDATED_TIME: MetricDesc = gauge(
    "netatmo_cache_updated_time",
    "Contains the time of the cached data.",
);
pub static SENSOR_UPDATED: MetricDesc = MetricDesc {
    name: "netatmo_sensor_updated",
    help: "Timestamp of last update",
    kind: MetricKind::Counter,
    labels: SENSOR_LABELS,
};
pub static TEMPERATURE: MetricDesc = sensor_gauge(
    "netatmo_sensor_temperature_celsius",
    "Temperature measurement in celsius",
);
pub static HUMIDITY: MetricDesc = sensor_gauge(
    "netatmo_sensor_humidity_percent",
    "Relative humidity measurement in percent",
);
pub static CO2: MetricDesc = sensor_gauge(
    "netatmo_sensor_co2_ppm",
    "Carbondioxide measurement in parts per million",
);
pub static NOISE: MetricDesc =
    sensor_gauge("netatmo_sensor_noise_db", "Noise measurement in decibels");
pub static PRESSURE: MetricDesc = sensor_gauge(
    "netatmo_sensor_pressure_mb",
    "Atmospheric pressure measurement in millibar",
);
pub static WIND_STRENGTH: MetricDesc = sensor_gauge(
    "netatmo_sensor_wind_strength_kph",
    "Wind strength in kilometers per hour",
);
pub static WIND_DIRECTION: MetricDesc = sensor_gauge(
    "netatmo_sensor_wind_direction_degrees",
    "Wind direction in degrees",
);
pub static RAIN: MetricDesc =
    sensor_gauge("netatmo_sensor_rain_amount_mm", "Rain amount in millimeters");
pub static BATTERY: MetricDesc = sensor_gauge(
    "netatmo_sensor_battery_percent",
    "Battery remaining life (10: low)",
);
pub static WIFI_SIGNAL: MetricDesc = sensor_gauge(
    "netatmo_sensor_wifi_signal_strength",
    "Wifi signal strength (86: bad, 71: avg, 56: good)",
);
pub static RF_SIGNAL: MetricDesc = sensor_gauge(
    "netatmo_sensor_rf_signal_strength",
    "RF signal strength (90: lowest, 60: highest)",
);

static ALL: [&MetricDesc; 15] = [
    &UP,
    &LAST_REFRESH_TIME,
    &CACHE_UPDATED_TIME,
    &SENSOR_UPDATED,
    &TEMPERATURE,
    &HUMIDITY,
    &CO2,
    &NOISE,
    &PRESSURE,
    &WIND_STRENGTH,
    &WIND_DIRECTION,
    &RAIN,
    &BATTERY,
    &WIFI_SIGNAL,
    &RF_SIGNAL,
];

/// Every metric identity the collector can emit.
pub fn describe() -> &'static [&'static MetricDesc] {
    &ALL
}

/// One sample value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub desc: &'static MetricDesc,
    /// Label values, positionally matching `desc.labels`.
    pub labels: Vec<String>,
    pub value: f64,
}

impl Observation {
    /// An observation of an unlabelled metric.
    pub fn new(desc: &'static MetricDesc, value: f64) -> Self {
        Self {
            desc,
            labels: Vec::new(),
            value,
        }
    }

    /// Label value by label name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .labels
            .iter()
            .position(|l| *l == name)
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
    }
}

/// Observations for one entity's readings.
///
/// Emits `sensor_updated` followed by one gauge per present field. Returns
/// nothing when the readings carry no capture time; staleness is not checked
/// here.
pub fn sensor_observations(
    module: &str,
    station: &str,
    measurements: &Measurements,
) -> Vec<Observation> {
    let Some(captured_at) = measurements.captured_at else {
        return Vec::new();
    };

    let fields: [(&'static MetricDesc, Option<f64>); 11] = [
        (&TEMPERATURE, measurements.temperature),
        (&HUMIDITY, measurements.humidity),
        (&CO2, measurements.co2),
        (&NOISE, measurements.noise),
        (&PRESSURE, measurements.pressure),
        (&WIND_STRENGTH, measurements.wind_strength),
        (&WIND_DIRECTION, measurements.wind_direction),
        (&RAIN, measurements.rain),
        (&BATTERY, measurements.battery_percent),
        (&WIFI_SIGNAL, measurements.wifi_signal),
        (&RF_SIGNAL, measurements.rf_signal),
    ];

    let labels = vec![module.to_string(), station.to_string()];
    let mut observations = Vec::with_capacity(1 + fields.len());
    observations.push(Observation {
        desc: &SENSOR_UPDATED,
        labels: labels.clone(),
        value: captured_at.unix_timestamp() as f64,
    });
    observations.extend(fields.into_iter().filter_map(|(desc, value)| {
        value.map(|v| Observation {
            desc,
            labels: labels.clone(),
            value: v,
        })
    }));
    observations
}
