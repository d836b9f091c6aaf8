//! Refresh gate.
//!
//! Decides whether a scrape should dispatch a new upstream refresh. The gate
//! is a pure function; the collector evaluates it under its write lock and, on
//! a `true` result, marks the refresh in progress and records the attempt time
//! in the same critical section. A second scrape arriving while that refresh
//! is running therefore sees `in_progress` and does not dispatch again.

use std::time::Duration;

use time::OffsetDateTime;

/// Returns `true` if a refresh should be dispatched at `now`.
///
/// A refresh is due when none is in progress and at least `interval` has
/// passed since the last attempt. A source that has never been attempted
/// (`last_attempt == None`) is always due.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use netatmo_core::gate::should_refresh;
/// use time::OffsetDateTime;
///
/// let t0 = OffsetDateTime::UNIX_EPOCH;
/// let interval = Duration::from_secs(60);
///
/// assert!(should_refresh(t0, None, interval, false));
/// assert!(!should_refresh(t0, None, interval, true));
/// assert!(!should_refresh(t0 + Duration::from_secs(59), Some(t0), interval, false));
/// assert!(should_refresh(t0 + Duration::from_secs(60), Some(t0), interval, false));
/// ```
#[must_use]
pub fn should_refresh(
    now: OffsetDateTime,
    last_attempt: Option<OffsetDateTime>,
    interval: Duration,
    in_progress: bool,
) -> bool {
    if in_progress {
        return false;
    }

    match last_attempt {
        None => true,
        Some(last) => now - last >= interval,
    }
}
