//! Application state shared across handlers.

use std::sync::Arc;

use netatmo_core::Collector;
use time::OffsetDateTime;

/// Shared application state.
pub struct AppState {
    /// The refresh-and-cache collector serving `/metrics`.
    pub collector: Collector,
    /// When the exporter started.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new application state.
    pub fn new(collector: Collector) -> Arc<Self> {
        Arc::new(Self {
            collector,
            started_at: OffsetDateTime::now_utc(),
        })
    }

    /// Seconds since the exporter started.
    pub fn uptime_seconds(&self) -> i64 {
        (OffsetDateTime::now_utc() - self.started_at)
            .whole_seconds()
            .max(0)
    }
}
