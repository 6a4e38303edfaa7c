use std::collections::HashMap;

use chrono::NaiveDate;
use log::debug;

use crate::{
    dates::str_to_date,
    error::{JournalError, Result},
    models::{Period, Subject},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodRange {
    pub name: String,
    pub date_from: String,
    pub date_to: String,
}

impl PeriodRange {
    pub fn contains(&self, day: NaiveDate) -> Result<bool> {
        let start = str_to_date(&self.date_from)?;
        let end = str_to_date(&self.date_to)?;
        Ok(start <= day && day <= end)
    }
}

/// Period name to date range, in the order names first appear in the
/// period list. A repeated name replaces the earlier range in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodDict {
    entries: Vec<PeriodRange>,
}

impl PeriodDict {
    pub fn insert(&mut self, range: PeriodRange) {
        match self.entries.iter_mut().find(|entry| entry.name == range.name) {
            Some(existing) => *existing = range,
            None => self.entries.push(range),
        }
    }

    pub fn get(&self, name: &str) -> Option<(&str, &str)> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| (entry.date_from.as_str(), entry.date_to.as_str()))
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodRange> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn period_dict(periods: &[Period]) -> PeriodDict {
    let mut dict = PeriodDict::default();
    for period in periods.iter().filter(|period| !period.is_summary()) {
        dict.insert(PeriodRange {
            name: period.name.clone(),
            date_from: period.date_from.clone(),
            date_to: period.date_to.clone(),
        });
    }
    dict
}

/// Name of the first period whose inclusive range holds `today`.
pub fn current_period(periods: &[Period], today: NaiveDate) -> Result<String> {
    for range in period_dict(periods).iter() {
        if range.contains(today)? {
            debug!("{today} falls into {}", range.name);
            return Ok(range.name.clone());
        }
    }
    Err(JournalError::NoCurrentPeriod { today })
}

pub fn period_for_name(periods: &[Period], name: &str) -> Result<Option<(NaiveDate, NaiveDate)>> {
    let dict = period_dict(periods);
    let Some((from, to)) = dict.get(name) else {
        return Ok(None);
    };
    Ok(Some((str_to_date(from)?, str_to_date(to)?)))
}

/// Subject name to id; the last subject with a given name wins.
pub fn subject_dict(subjects: &[Subject]) -> HashMap<String, i64> {
    subjects
        .iter()
        .map(|subject| (subject.name.clone(), subject.id))
        .collect()
}
