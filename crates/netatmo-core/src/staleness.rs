//! Staleness policy.
//!
//! Staleness is judged per sensor-bearing entity, not per snapshot: a station
//! can keep reporting while one of its modules has lost its radio link. An
//! entity whose readings are missing or too old is dropped from the sample
//! rather than failing the scrape.

use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

/// Freshness of one entity's readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No reading has ever been received.
    Missing,
    /// Readings exist but are older than the threshold.
    Stale {
        /// How old the readings are.
        age: time::Duration,
    },
    /// Readings are recent enough to publish.
    Fresh,
}

impl Freshness {
    /// Whether the entity's metrics should be emitted.
    pub fn should_emit(&self) -> bool {
        matches!(self, Freshness::Fresh)
    }
}

/// Classify readings taken at `captured_at` as seen at `now`.
///
/// Readings are stale when strictly older than `threshold`; an age exactly
/// equal to the threshold is still fresh.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use netatmo_core::staleness::{Freshness, evaluate};
/// use time::OffsetDateTime;
///
/// let now = OffsetDateTime::UNIX_EPOCH + Duration::from_secs(1_000);
/// let threshold = Duration::from_secs(120);
///
/// assert_eq!(evaluate(None, now, threshold), Freshness::Missing);
/// assert!(evaluate(Some(now - Duration::from_secs(120)), now, threshold).should_emit());
/// assert!(!evaluate(Some(now - Duration::from_secs(121)), now, threshold).should_emit());
/// ```
#[must_use]
pub fn evaluate(
    captured_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
    threshold: Duration,
) -> Freshness {
    let Some(captured_at) = captured_at else {
        return Freshness::Missing;
    };

    let age = now - captured_at;
    if age > threshold {
        Freshness::Stale { age }
    } else {
        Freshness::Fresh
    }
}

/// Result of the most recent completed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Succeeded,
    Failed,
}

/// Value of the `up` gauge.
///
/// `1.0` only when at least one refresh has completed and the last one
/// succeeded.
pub fn up_value(last_completed: Option<RefreshOutcome>) -> f64 {
    match last_completed {
        Some(RefreshOutcome::Succeeded) => 1.0,
        Some(RefreshOutcome::Failed) | None => 0.0,
    }
}

/// Unix timestamp in seconds as a gauge value, `0.0` when absent.
pub fn unix_seconds(time: Option<OffsetDateTime>) -> f64 {
    time.map_or(0.0, |t| t.unix_timestamp() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    #[test]
    fn test_missing_timestamp() {
        let f = evaluate(None, ts(1_000), Duration::from_secs(60));
        assert_eq!(f, Freshness::Missing);
        assert!(!f.should_emit());
    }

    #[test]
    fn test_threshold_boundary() {
        let now = ts(10_000);
        let threshold = Duration::from_secs(120);

        assert!(evaluate(Some(ts(10_000 - 119)), now, threshold).should_emit());
        assert!(evaluate(Some(ts(10_000 - 120)), now, threshold).should_emit());
        assert_eq!(
            evaluate(Some(ts(10_000 - 121)), now, threshold),
            Freshness::Stale {
                age: time::Duration::seconds(121)
            }
        );
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        // Device clocks can run ahead of ours.
        assert!(evaluate(Some(ts(1_060)), ts(1_000), Duration::from_secs(30)).should_emit());
    }

    #[test]
    fn test_up_value() {
        assert_eq!(up_value(None), 0.0);
        assert_eq!(up_value(Some(RefreshOutcome::Failed)), 0.0);
        assert_eq!(up_value(Some(RefreshOutcome::Succeeded)), 1.0);
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(unix_seconds(None), 0.0);
        assert_eq!(unix_seconds(Some(ts(1_700_000_000))), 1_700_000_000.0);
    }

    proptest! {
        #[test]
        fn prop_threshold_split(
            refresh in 1_000_000i64..2_000_000,
            threshold in 1u64..100_000,
        ) {
            let now = ts(refresh);
            let threshold_d = Duration::from_secs(threshold);
            let t = threshold as i64;

            prop_assert!(!evaluate(Some(ts(refresh - t - 1)), now, threshold_d).should_emit());
            prop_assert!(evaluate(Some(ts(refresh - t + 1)), now, threshold_d).should_emit());
        }
    }
}
