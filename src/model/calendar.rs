//! Civil calendar dates used as search keys
//!
//! The court site indexes registrations by dates in the Bikram Sambat
//! calendar. Month lengths in that calendar vary by year; the crawler only
//! needs to enumerate candidate search keys, so it works from a fixed
//! 12-entry month table that the configuration can override.

use crate::CalendarError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Month lengths used when no table is configured: months 1-8 have 31 days,
/// months 9-11 have 30 days and month 12 has 29 days.
///
/// This does not match the real calendar for every year. Dates that do not
/// exist are searched anyway and come back as "not found"; months longer than
/// the table in a given year lose their trailing days.
pub const DEFAULT_MONTH_LENGTHS: [u8; 12] = [31, 31, 31, 31, 31, 31, 31, 31, 30, 30, 30, 29];

/// Largest day number any month table may declare
pub const MAX_MONTH_LENGTH: u8 = 32;

/// A `(year, month, day)` triple in the site's civil calendar
///
/// Ordering is chronological (year, then month, then day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalendarDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    /// Creates a date, rejecting months outside 1-12 and days outside 1-32
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, CalendarError> {
        if !(1..=12).contains(&month) {
            return Err(CalendarError::InvalidMonth(month));
        }
        if day == 0 || day > MAX_MONTH_LENGTH {
            return Err(CalendarError::InvalidDay { month, day });
        }
        Ok(Self { year, month, day })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for CalendarDate {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CalendarError::Malformed(s.to_string());

        let mut parts = s.trim().splitn(3, '-');
        let year = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(malformed)?;
        let month = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(malformed)?;
        let day = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(malformed)?;

        Self::new(year, month, day)
    }
}

impl From<CalendarDate> for String {
    fn from(date: CalendarDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for CalendarDate {
    type Error = CalendarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Number of days in each of the 12 months
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthTable {
    lengths: [u8; 12],
}

impl MonthTable {
    /// Builds a table from 12 month lengths, each between 1 and 32
    pub fn new(lengths: [u8; 12]) -> Result<Self, CalendarError> {
        for (index, &length) in lengths.iter().enumerate() {
            if length == 0 || length > MAX_MONTH_LENGTH {
                return Err(CalendarError::InvalidDay {
                    month: index as u8 + 1,
                    day: length,
                });
            }
        }
        Ok(Self { lengths })
    }

    /// Builds a table from a slice, which must hold exactly 12 entries
    pub fn from_slice(lengths: &[u8]) -> Result<Self, CalendarError> {
        let lengths: [u8; 12] = lengths
            .try_into()
            .map_err(|_| CalendarError::TableSize(lengths.len()))?;
        Self::new(lengths)
    }

    /// Days in `month` (1-12); months outside the range have zero days
    pub fn days_in_month(&self, month: u8) -> u8 {
        match month {
            1..=12 => self.lengths[month as usize - 1],
            _ => 0,
        }
    }

    /// Days in one year according to this table
    pub fn days_in_year(&self) -> u32 {
        self.lengths.iter().map(|&d| d as u32).sum()
    }

    /// Every date of `year` in chronological order
    pub fn dates_in_year(&self, year: u16) -> impl Iterator<Item = CalendarDate> + '_ {
        (1..=12u8).flat_map(move |month| {
            (1..=self.days_in_month(month)).map(move |day| CalendarDate { year, month, day })
        })
    }

    /// Every date from the first day of `start_year` to the last day of
    /// `end_year`, inclusive, in chronological order
    ///
    /// An inverted range yields no dates.
    pub fn date_range(&self, start_year: u16, end_year: u16) -> Vec<CalendarDate> {
        if start_year > end_year {
            return Vec::new();
        }
        let years = (end_year - start_year) as usize + 1;
        let mut dates = Vec::with_capacity(years * self.days_in_year() as usize);
        for year in start_year..=end_year {
            dates.extend(self.dates_in_year(year));
        }
        dates
    }

    pub fn lengths(&self) -> &[u8; 12] {
        &self.lengths
    }
}

impl Default for MonthTable {
    fn default() -> Self {
        Self {
            lengths: DEFAULT_MONTH_LENGTHS,
        }
    }
}
