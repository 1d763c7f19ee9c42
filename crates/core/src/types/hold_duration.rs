//! Per-shop hold duration configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed set of hold durations a merchant can pick, in minutes.
pub const HOLD_DURATION_OPTIONS: [i64; 6] = [30, 45, 60, 90, 120, 180];

/// Error returned when a duration value is not one of the fixed options.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hold duration: {0} minutes is not one of {HOLD_DURATION_OPTIONS:?}")]
pub struct HoldDurationError(pub i64);

/// How long fulfillment is held after an order is placed.
///
/// Only the enumerated values are representable; the database stores the
/// raw minute count and [`HoldDuration::from_minutes`] validates it on the
/// way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct HoldDuration(i64);

impl HoldDuration {
    /// The default hold duration for newly installed shops.
    pub const DEFAULT: Self = Self(30);

    /// Validate a minute count against the fixed options.
    ///
    /// # Errors
    ///
    /// Returns [`HoldDurationError`] if `minutes` is not an allowed option.
    pub fn from_minutes(minutes: i64) -> Result<Self, HoldDurationError> {
        if HOLD_DURATION_OPTIONS.contains(&minutes) {
            Ok(Self(minutes))
        } else {
            Err(HoldDurationError(minutes))
        }
    }

    /// The duration in minutes.
    #[must_use]
    pub const fn minutes(self) -> i64 {
        self.0
    }

    /// The duration as a `chrono::Duration`.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::minutes(self.0)
    }
}

impl Default for HoldDuration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for HoldDuration {
    type Error = HoldDurationError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes)
    }
}

impl From<HoldDuration> for i64 {
    fn from(duration: HoldDuration) -> Self {
        duration.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_every_fixed_option() {
        for minutes in HOLD_DURATION_OPTIONS {
            let duration = HoldDuration::from_minutes(minutes).expect("valid option");
            assert_eq!(duration.minutes(), minutes);
        }
    }

    #[test]
    fn test_rejects_values_outside_the_fixed_set() {
        for minutes in [0, 15, 29, 31, 100, 240, -30] {
            assert_eq!(
                HoldDuration::from_minutes(minutes),
                Err(HoldDurationError(minutes))
            );
        }
    }

    #[test]
    fn test_default_is_thirty_minutes() {
        assert_eq!(HoldDuration::default().minutes(), 30);
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let duration: HoldDuration = serde_json::from_str("90").expect("valid");
        assert_eq!(duration.minutes(), 90);

        let invalid: Result<HoldDuration, _> = serde_json::from_str("42");
        assert!(invalid.is_err());
    }
}
