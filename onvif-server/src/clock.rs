//! Time source for GetSystemDateAndTime

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Where the reported system time comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    /// Always report 2024-01-01 12:00:00 UTC, as reference devices do
    #[default]
    Fixed,
    /// Report the host's current UTC time
    Live,
}

impl ClockMode {
    pub fn now(self) -> UtcDateTime {
        match self {
            ClockMode::Fixed => UtcDateTime::FIXED,
            ClockMode::Live => UtcDateTime::from(Utc::now()),
        }
    }
}

/// Broken-down UTC time as carried in `tds:UTCDateTime`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl UtcDateTime {
    pub const FIXED: UtcDateTime = UtcDateTime {
        year: 2024,
        month: 1,
        day: 1,
        hour: 12,
        minute: 0,
        second: 0,
    };
}

impl From<DateTime<Utc>> for UtcDateTime {
    fn from(t: DateTime<Utc>) -> Self {
        Self {
            year: t.year(),
            month: t.month(),
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_is_constant() {
        assert_eq!(ClockMode::Fixed.now(), UtcDateTime::FIXED);
        assert_eq!(ClockMode::Fixed.now(), ClockMode::Fixed.now());
    }

    #[test]
    fn test_from_chrono() {
        let t = Utc.with_ymd_and_hms(2031, 7, 14, 3, 4, 5).unwrap();
        let dt = UtcDateTime::from(t);
        assert_eq!(
            dt,
            UtcDateTime {
                year: 2031,
                month: 7,
                day: 14,
                hour: 3,
                minute: 4,
                second: 5,
            }
        );
    }

    #[test]
    fn test_live_clock_tracks_host() {
        let before = Utc::now().year();
        let live = ClockMode::Live.now();
        assert!(live.year >= before);
        assert!((1..=12).contains(&live.month));
    }
}
