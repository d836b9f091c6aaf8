//! Trait abstractions for upstream station data.
//!
//! This module provides the [`StationSource`] trait that abstracts over the
//! real Netatmo API client and mock sources for testing.

use async_trait::async_trait;

use netatmo_types::Station;

use crate::error::Result;

/// A source of station readings.
///
/// The collector calls [`read`](Self::read) from a background task, never from
/// the scrape path, so implementations are free to be slow. Timeouts are the
/// implementation's responsibility.
///
/// # Example
///
/// ```ignore
/// use netatmo_core::{Result, StationSource};
///
/// async fn count_stations<S: StationSource>(source: &S) -> Result<usize> {
///     Ok(source.read().await?.len())
/// }
/// ```
#[async_trait]
pub trait StationSource: Send + Sync {
    /// Fetch the current state of every station.
    async fn read(&self) -> Result<Vec<Station>>;
}

#[async_trait]
impl<S: StationSource + ?Sized> StationSource for std::sync::Arc<S> {
    async fn read(&self) -> Result<Vec<Station>> {
        (**self).read().await
    }
}
