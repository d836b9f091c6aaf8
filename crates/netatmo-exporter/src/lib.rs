//! Prometheus exporter for Netatmo weather stations.
//!
//! This crate provides an HTTP service that:
//! - Serves cached station readings as Prometheus metrics
//! - Refreshes the cache from the Netatmo API in the background, at most once
//!   per refresh interval and only when scraped
//! - Leaves out sensors whose readings are older than the stale threshold
//!
//! # Endpoints
//!
//! - `GET /metrics` - Prometheus text exposition
//! - `GET /version` - Exporter name and version
//! - `GET /api/health` - Refresh status (`ok` or `degraded`)
//! - `GET /` - Redirect to `/metrics`
//!
//! # Configuration
//!
//! The exporter reads configuration from `~/.config/netatmo/exporter.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:9210"
//!
//! [netatmo]
//! client_id = "your-app-client-id"
//! client_secret = "your-app-client-secret"
//! refresh_token = "your-refresh-token"
//!
//! [collector]
//! refresh_interval = 480  # seconds
//! stale_threshold = 3600  # seconds
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Credentials can also be passed through `NETATMO_CLIENT_ID`,
//! `NETATMO_CLIENT_SECRET` and `NETATMO_REFRESH_TOKEN`.

pub mod api;
pub mod config;
pub mod prometheus;
pub mod state;

pub use config::{
    CollectorConfig, Config, ConfigError, LoggingConfig, NetatmoConfig, ServerConfig,
    ValidationError,
};
pub use state::AppState;
