//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Whole milliseconds elapsed from `earlier` to this timestamp, clamped at zero.
    pub fn millis_since(&self, earlier: &Timestamp) -> u64 {
        self.0
            .signed_duration_since(earlier.0)
            .num_milliseconds()
            .max(0) as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn millis_since_measures_forward_gap() {
        let start = Timestamp::now();
        let end = Timestamp::from_datetime(*start.as_datetime() + Duration::milliseconds(250));
        assert_eq!(end.millis_since(&start), 250);
    }

    #[test]
    fn millis_since_clamps_negative_gap() {
        let start = Timestamp::now();
        let earlier = Timestamp::from_datetime(*start.as_datetime() - Duration::seconds(1));
        assert_eq!(earlier.millis_since(&start), 0);
    }

    #[test]
    fn timestamps_order_chronologically() {
        let a = Timestamp::now();
        let b = Timestamp::from_datetime(*a.as_datetime() + Duration::seconds(1));
        assert!(a < b);
    }
}
