use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the dataset's `start_date`/`end_date` are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `MM-DD-YYYY`, safe to use as a directory name.
    #[default]
    Us,
    /// `YYYY-MM-DD`.
    Iso,
}

impl DateFormat {
    pub fn format(self, date: NaiveDate) -> String {
        match self {
            DateFormat::Us => date.format("%m-%d-%Y").to_string(),
            DateFormat::Iso => date.format("%Y-%m-%d").to_string(),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateFormat::Us => write!(f, "us"),
            DateFormat::Iso => write!(f, "iso"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRecord {
    pub key: String,
    pub count: u64,
}

impl ActivityRecord {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }

    /// Ingests a raw archive count. Fractions truncate toward zero; negative and
    /// non-finite values become 0.
    pub fn from_raw(key: impl Into<String>, count: f64) -> Self {
        let count = if count.is_finite() && count > 0.0 {
            count.trunc() as u64
        } else {
            0
        };
        Self::new(key, count)
    }
}

/// Records the archive reported for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRecordSet {
    pub day: NaiveDate,
    records: Vec<ActivityRecord>,
}

impl DayRecordSet {
    /// Builds a set keeping the first record for any repeated key.
    pub fn new(day: NaiveDate, records: Vec<ActivityRecord>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let records = records
            .into_iter()
            .filter(|record| seen.insert(record.key.clone()))
            .collect();
        Self { day, records }
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn count_for(&self, key: &str) -> Option<u64> {
        self.records
            .iter()
            .find(|record| record.key == key)
            .map(|record| record.count)
    }
}
