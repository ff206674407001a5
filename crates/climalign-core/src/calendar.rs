//! Calendar value types shared by the raster stack, the 360-day converter,
//! and discovery's filename parsing. The conversion algorithm itself lives
//! in `climalign-calendar`; this module only defines the dates and windows
//! it operates on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ClimalignError, ClimalignResult};

/// A date on the fixed 12x30 model calendar used by CPM: every month has
/// exactly 30 days, every year the same, with no leap-day concept at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Calendar360Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl Calendar360Date {
    pub fn new(year: i32, month: u8, day: u8) -> ClimalignResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(ClimalignError::CalendarMismatch(format!(
                "month {month} out of range 1..=12"
            )));
        }
        if !(1..=30).contains(&day) {
            return Err(ClimalignError::CalendarMismatch(format!(
                "day {day} out of range 1..=30 on the 360-day calendar"
            )));
        }
        Ok(Self { year, month, day })
    }

    /// The zero-based ordinal day within the calendar year (0..360, January
    /// first), useful as an index into a 360-slot time axis. Anchored at the
    /// calendar year, not at the hydrological year the 360-day converter in
    /// `climalign-calendar` uses for CPM filenames.
    pub fn ordinal0(&self) -> u32 {
        (self.month as u32 - 1) * 30 + (self.day as u32 - 1)
    }

    /// Step forward `days` days on the 360-day calendar, rolling over
    /// months and years as needed.
    pub fn add_days(&self, days: u32) -> Self {
        let total = self.ordinal0() + days;
        let year_offset = (total / 360) as i32;
        let remainder = total % 360;
        Self {
            year: self.year + year_offset,
            month: (remainder / 30) as u8 + 1,
            day: (remainder % 30) as u8 + 1,
        }
    }
}

/// Either flavor of date a raster stack's time axis can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeStep {
    Model360(Calendar360Date),
    Civil(NaiveDate),
}

impl TimeStep {
    pub fn is_civil(&self) -> bool {
        matches!(self, TimeStep::Civil(_))
    }

    pub fn is_model360(&self) -> bool {
        matches!(self, TimeStep::Model360(_))
    }
}

/// A closed-open `[start, end)` interval on the civil calendar, as parsed
/// from the `YYYYMMDD-YYYYMMDD` token embedded in input filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    /// Exclusive end.
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> ClimalignResult<Self> {
        if end <= start {
            return Err(ClimalignError::CalendarMismatch(format!(
                "time window end {end} is not after start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Number of whole civil days the window spans.
    pub fn civil_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn is_subset_of(&self, other: &TimeWindow) -> bool {
        self.start >= other.start && self.end <= other.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal0_is_zero_based() {
        // ordinal0 is anchored at the calendar year (month 1 = January),
        // not at the hydrological year the 360-day converter uses elsewhere.
        let d = Calendar360Date::new(1981, 12, 1).unwrap();
        assert_eq!(d.ordinal0(), 330);
        let d2 = Calendar360Date::new(1981, 12, 30).unwrap();
        assert_eq!(d2.ordinal0(), 359);
        let d3 = Calendar360Date::new(1982, 1, 1).unwrap();
        assert_eq!(d3.ordinal0(), 0);
    }

    #[test]
    fn add_days_rolls_over_year() {
        let d = Calendar360Date::new(1981, 12, 1).unwrap();
        let rolled = d.add_days(360);
        assert_eq!(rolled, Calendar360Date::new(1982, 12, 1).unwrap());
    }

    #[test]
    fn rejects_day_31() {
        assert!(Calendar360Date::new(1981, 1, 31).is_err());
    }

    #[test]
    fn window_rejects_non_positive_span() {
        let d = NaiveDate::from_ymd_opt(1981, 12, 1).unwrap();
        assert!(TimeWindow::new(d, d).is_err());
    }
}
