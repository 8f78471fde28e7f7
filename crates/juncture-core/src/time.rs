//! Absolute time as milliseconds since the Unix epoch.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A point in time with millisecond resolution.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time {
    millis_since_epoch: i64,
}

crate::layout_contract! {
    /// Declared layout of [`Time`].
    pub const TIME_LAYOUT: Time {
        size = 8,
        align = 8,
        millis_since_epoch = 0,
    }
}

impl Time {
    pub const fn from_milliseconds(millis_since_epoch: i64) -> Self {
        Self { millis_since_epoch }
    }

    pub fn now() -> Self {
        SystemTime::now().into()
    }

    pub const fn to_milliseconds(self) -> i64 {
        self.millis_since_epoch
    }
}

impl From<SystemTime> for Time {
    fn from(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Self::from_milliseconds(millis)
    }
}

impl From<Time> for SystemTime {
    fn from(time: Time) -> Self {
        let offset = Duration::from_millis(time.millis_since_epoch.unsigned_abs());
        if time.millis_since_epoch >= 0 {
            UNIX_EPOCH + offset
        } else {
            UNIX_EPOCH - offset
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_round_trip() {
        for millis in [0, 1_700_000_000_123, -86_400_000] {
            let time = Time::from_milliseconds(millis);
            assert_eq!(Time::from(SystemTime::from(time)), time);
        }
    }

    #[test]
    fn test_serialised_as_millis() {
        let time = Time::from_milliseconds(1234);
        assert_eq!(serde_json::to_string(&time).unwrap(), "1234");
        assert!(Time::now() > time);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_layout_matches_contract() {
        assert_eq!(
            TIME_LAYOUT.check(
                std::mem::size_of::<Time>(),
                std::mem::align_of::<Time>(),
                &[("millis_since_epoch", std::mem::offset_of!(Time, millis_since_epoch))],
            ),
            Ok(())
        );
    }
}
