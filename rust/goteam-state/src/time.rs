//! Token time model.
//!
//! Tokens carry their expiry as whole seconds since the UNIX epoch, which is
//! the precision cookies are able to express anyway.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time with one-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current system time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Creates a timestamp from seconds since the UNIX epoch.
    pub const fn from_unix(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the UNIX epoch.
    pub const fn to_unix(self) -> u64 {
        self.0
    }

    /// Returns the timestamp `duration` later, saturating at the far end of
    /// the representable range.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_secs()))
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        // Clocks set before 1970 collapse onto the epoch.
        Self(
            time.duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default(),
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
