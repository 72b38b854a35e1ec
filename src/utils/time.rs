use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;

/// Returns the current OS system time as a POSIX duration.
///
/// If system time is before the epoch, returns [`Duration::ZERO`].
#[inline]
pub(crate) fn unix() -> Duration {
  SystemTime::now()
    .duration_since(SystemTime::UNIX_EPOCH)
    .unwrap_or(Duration::ZERO)
}

/// Returns the instant `timeout` from now, or `None` if it does not fit.
#[inline]
pub(crate) fn deadline(timeout: Duration) -> Option<Instant> {
  Instant::now().checked_add(timeout)
}
