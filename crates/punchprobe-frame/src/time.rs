//! Punch timestamp fields.
//!
//! A punch carries wall-clock time the way the station hardware keeps it:
//! a packed day/half-day byte, a 12-hour seconds counter and a 1/256 s tick.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Weekday};

/// Seconds in one AM/PM half-day.
pub const HALF_DAY_SECS: u32 = 12 * 60 * 60;

const PM_BIT: u8 = 0x01;
const WEEKDAY_SHIFT: u8 = 1;
const WEEKDAY_MASK: u8 = 0x07;

/// Time fields of a punch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PunchTime {
    /// bit 0: PM, bits 3..1: weekday (Sunday = 0), bits 5..4: week counter.
    pub day_flags: u8,
    /// Seconds since the start of the current half-day.
    pub time_of_day: u16,
    /// Sub-second fraction in 1/256 s units.
    pub sub_second: u8,
}

impl PunchTime {
    /// Derive punch time fields from a timestamp in any time zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        let weekday = dt.weekday().num_days_from_sunday() as u8;
        let pm = dt.hour() >= 12;
        let day_flags = ((weekday & WEEKDAY_MASK) << WEEKDAY_SHIFT) | u8::from(pm);

        let time_of_day = (dt.num_seconds_from_midnight() % HALF_DAY_SECS) as u16;

        // nanosecond() exceeds 1e9 during a leap second
        let nanos = u64::from(dt.nanosecond() % 1_000_000_000);
        let sub_second = (nanos * 256 / 1_000_000_000) as u8;

        Self {
            day_flags,
            time_of_day,
            sub_second,
        }
    }

    /// Punch time fields for the current local time.
    pub fn now() -> Self {
        Self::from_datetime(&Local::now())
    }

    /// True when the half-day bit marks the afternoon.
    pub fn is_pm(&self) -> bool {
        self.day_flags & PM_BIT != 0
    }

    /// Day of the week encoded in the flags byte.
    pub fn weekday(&self) -> Option<Weekday> {
        match (self.day_flags >> WEEKDAY_SHIFT) & WEEKDAY_MASK {
            0 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        }
    }

    /// Seconds since midnight, combining the half-day bit and the 12h counter.
    pub fn seconds_since_midnight(&self) -> u32 {
        let base = if self.is_pm() { HALF_DAY_SECS } else { 0 };
        base + u32::from(self.time_of_day)
    }
}
