//! Address-edit-window policy.
//!
//! An order's shipping address stays editable from the moment the order is
//! placed until the shop's configured hold duration elapses. These are pure
//! functions; the caller supplies `now` so the policy is deterministic.

use chrono::{DateTime, Utc};

use crate::types::HoldDuration;

/// When the edit window closes for an order placed at `created_at`.
#[must_use]
pub fn closes_at(created_at: DateTime<Utc>, duration: HoldDuration) -> DateTime<Utc> {
    created_at + duration.as_duration()
}

/// Whether the edit window has expired. The boundary counts as expired:
/// exactly at `closes_at` the address is no longer editable.
#[must_use]
pub fn is_expired(now: DateTime<Utc>, closes_at: DateTime<Utc>) -> bool {
    now >= closes_at
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, min, 0).single().expect("valid time")
    }

    #[test]
    fn test_closes_at_adds_the_configured_minutes() {
        let created = at(12, 0);
        let duration = HoldDuration::from_minutes(45).expect("valid");
        assert_eq!(closes_at(created, duration), at(12, 45));
    }

    #[test]
    fn test_window_is_open_before_the_boundary() {
        let closes = at(12, 30);
        assert!(!is_expired(at(12, 29), closes));
    }

    #[test]
    fn test_window_is_expired_exactly_at_the_boundary() {
        let closes = at(12, 30);
        assert!(is_expired(at(12, 30), closes));
    }

    #[test]
    fn test_window_is_expired_after_the_boundary() {
        let closes = at(12, 30);
        assert!(is_expired(at(13, 0), closes));
    }

    #[test]
    fn test_default_duration_gives_thirty_minute_window() {
        let created = at(9, 0);
        assert_eq!(closes_at(created, HoldDuration::default()), at(9, 30));
    }
}
