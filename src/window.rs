use chrono::{DateTime, Days, NaiveDate};
use tracing::info;

use crate::error::DigestError;

pub const DEFAULT_WINDOW_DAYS: u32 = 7;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m-%d-%Y", "%m/%d/%Y"];

/// Inclusive range of calendar days covered by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
    length_days: u32,
}

impl DateWindow {
    /// Builds the window from an optional start date argument.
    ///
    /// With a start date the window runs `length_days` forward from it. Without
    /// one it ends on `today` and starts `length_days` earlier.
    pub fn build(
        start: Option<&str>,
        length_days: u32,
        today: NaiveDate,
    ) -> Result<Self, DigestError> {
        match start {
            Some(value) => Self::starting_at(parse_date(value)?, length_days),
            None => {
                info!("No date provided. Doing {length_days} days until today.");
                Self::ending_at(today, length_days)
            }
        }
    }

    pub fn starting_at(start: NaiveDate, length_days: u32) -> Result<Self, DigestError> {
        let end = start
            .checked_add_days(Days::new(u64::from(length_days)))
            .ok_or_else(|| {
                DigestError::InvalidDate(format!("{start} + {length_days} days is out of range"))
            })?;
        Ok(Self {
            start,
            end,
            length_days,
        })
    }

    pub fn ending_at(end: NaiveDate, length_days: u32) -> Result<Self, DigestError> {
        let start = end
            .checked_sub_days(Days::new(u64::from(length_days)))
            .ok_or_else(|| {
                DigestError::InvalidDate(format!("{end} - {length_days} days is out of range"))
            })?;
        Ok(Self {
            start,
            end,
            length_days,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days in the window, both ends included.
    pub fn day_count(&self) -> usize {
        self.length_days as usize + 1
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take(self.day_count()).collect()
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate, DigestError> {
    let trimmed = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    DateTime::parse_from_rfc3339(trimmed)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| DigestError::InvalidDate(value.to_string()))
}
