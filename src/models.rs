//! Typed views of the journal's JSON answers. Only the fields the client
//! relies on are modelled; everything else in a payload is ignored.

use serde::Deserialize;

use crate::error::{JournalError, Result};

/// Every endpoint wraps its payload as `{"data": {"items": [...]}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: Page<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Envelope<T> {
    pub fn items(&self) -> &[T] {
        &self.data.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.data.items
    }

    pub fn first(&self, what: &str) -> Result<&T> {
        self.data
            .items
            .first()
            .ok_or_else(|| JournalError::malformed(format!("{what} list is empty")))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Child {
    #[serde(default)]
    pub educations: Vec<Education>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Education {
    pub jurisdiction_id: i64,
    pub institution_id: i64,
    pub education_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EducationPeriod {
    pub code: String,
}

/// A grading interval. Dates stay as the `d.m.Y` strings the journal sends.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Period {
    pub name: String,
    pub date_from: String,
    pub date_to: String,
    pub education_period: EducationPeriod,
    pub identity: Identity,
}

impl Period {
    /// Summary periods (yearly totals and the like) carry this code.
    pub const SUMMARY_CODE: &'static str = "30";

    pub fn education_period_code(&self) -> &str {
        &self.education_period.code
    }

    pub fn is_summary(&self) -> bool {
        self.education_period.code == Self::SUMMARY_CODE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subject {
    pub name: String,
    pub id: i64,
}

pub type ChildrenList = Envelope<Child>;
pub type GroupList = Envelope<Group>;
pub type PeriodList = Envelope<Period>;
pub type SubjectList = Envelope<Subject>;
