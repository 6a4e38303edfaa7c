use chrono::{Datelike, NaiveDate};

use crate::error::{JournalError, Result};

/// Formats a date the way the journal expects it: `day.month.year`, no padding.
pub fn date_to_str(date: NaiveDate) -> String {
    format!("{}.{}.{}", date.day(), date.month(), date.year())
}

/// Parses a `day.month.year` string. Leading zeros are accepted but not required.
pub fn str_to_date(text: &str) -> Result<NaiveDate> {
    let invalid = || JournalError::InvalidDate(text.to_string());
    // chrono skips whitespace in front of numeric fields.
    if text.contains(char::is_whitespace) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(text, "%d.%m.%Y").map_err(|_| invalid())
}

/// One bound of a marks query: either already formatted or a calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBound {
    Text(String),
    Date(NaiveDate),
}

impl DateBound {
    pub fn to_query_value(&self) -> String {
        match self {
            DateBound::Text(text) => text.clone(),
            DateBound::Date(date) => date_to_str(*date),
        }
    }
}

impl From<NaiveDate> for DateBound {
    fn from(date: NaiveDate) -> Self {
        DateBound::Date(date)
    }
}

impl From<&str> for DateBound {
    fn from(text: &str) -> Self {
        DateBound::Text(text.to_string())
    }
}

impl From<String> for DateBound {
    fn from(text: String) -> Self {
        DateBound::Text(text)
    }
}
