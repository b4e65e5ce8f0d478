//! Monthly reporting periods.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cell::Cell;
use crate::diagnostic::RowError;
use crate::error::ModelError;

const SHORT_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const LONG_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Month number (1-12) for a three-letter or full English month name.
///
/// Matching is case-sensitive; surrounding whitespace is ignored.
pub fn month_from_name(name: &str) -> Option<u32> {
    let trimmed = name.trim();
    SHORT_MONTHS
        .iter()
        .position(|month| *month == trimmed)
        .or_else(|| LONG_MONTHS.iter().position(|month| *month == trimmed))
        .map(|idx| idx as u32 + 1)
}

/// A reporting year and month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1000..=9999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Parse a period from the reporting-year and reporting-month cells of a row.
    pub fn from_cells(year: Option<&Cell>, month: Option<&Cell>) -> Result<Self, RowError> {
        let undefined = || RowError::UndefinedPeriod {
            year: year.map(ToString::to_string),
            month: month.map(ToString::to_string),
        };
        let year_value = year
            .and_then(Cell::exact_integer)
            .and_then(|value| i32::try_from(value).ok())
            .ok_or_else(undefined)?;
        let month_value = month
            .and_then(Cell::as_str)
            .and_then(month_from_name)
            .ok_or_else(undefined)?;
        Self::new(year_value, month_value).ok_or_else(undefined)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Full English month name.
    pub fn month_name(&self) -> &'static str {
        LONG_MONTHS[(self.month - 1) as usize]
    }

    /// Calendar quarter label, `Quarter1` through `Quarter4`.
    pub fn quarter(&self) -> String {
        format!("Quarter{}", (self.month - 1) / 3 + 1)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ModelError::InvalidPeriod(s.to_string());
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = trimmed[..4].parse().map_err(|_| invalid())?;
        let month = trimmed[4..].parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
