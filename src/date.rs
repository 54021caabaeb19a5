//! Capture date value type.

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use std::fmt;

/// Calendar date a photo was taken. Always a valid date; renders as `YYYY_MM_DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureDate(NaiveDate);

impl CaptureDate {
    /// Build from year/month/day; `None` if the triple is not a real calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(0..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse the date part of an EXIF timestamp (`2025:10:26 14:03:12`, `2025:10:26`, ...).
    pub fn from_exif(value: &str) -> Option<Self> {
        let date_part = value.trim().split([' ', 'T']).next()?;
        let mut it = date_part.split([':', '-']);
        let year = it.next()?.parse().ok()?;
        let month = it.next()?.parse().ok()?;
        let day = it.next()?.parse().ok()?;
        if it.next().is_some() {
            return None;
        }
        Self::from_ymd(year, month, day)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}_{:02}", self.year(), self.month(), self.day())
    }
}

impl Serialize for CaptureDate {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}
