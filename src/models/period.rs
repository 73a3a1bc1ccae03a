use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s*[/\-.]\s*(\d{4})$").expect("month/year pattern"));
static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*[/\-.]\s*(\d{1,2})$").expect("year/month pattern"));

/// A reporting month. Ordering follows `year * 100 + month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Lenient parse used by the normalizer; `None` for anything unrecognised.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(caps) = MONTH_YEAR.captures(value) {
            let month = caps[1].parse().ok()?;
            let year = caps[2].parse().ok()?;
            return Self::new(year, month);
        }
        if let Some(caps) = YEAR_MONTH.captures(value) {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            return Self::new(year, month);
        }
        None
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn quarter(&self) -> u32 {
        (self.month - 1) / 3 + 1
    }

    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 100 + i64::from(self.month)
    }

    /// True when `date` is in this period's quarter and year, no later than this month.
    pub fn quarter_to_date_contains(&self, date: NaiveDate) -> bool {
        let other = Self::from_date(date);
        other.year == self.year && other.quarter() == self.quarter() && other.month <= self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePeriodError(pub String);

impl fmt::Display for ParsePeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid reporting period `{}`", self.0)
    }
}

impl std::error::Error for ParsePeriodError {}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParsePeriodError(s.to_string()))
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
