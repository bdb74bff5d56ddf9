//! Study models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_rfc3339, ParseLabelError};

/// Study lifecycle status. Any transition is allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StudyStatus {
    #[default]
    Planning,
    Active,
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
}

impl StudyStatus {
    pub const ALL: [StudyStatus; 4] = [
        StudyStatus::Planning,
        StudyStatus::Active,
        StudyStatus::Completed,
        StudyStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StudyStatus::Planning => "Planning",
            StudyStatus::Active => "Active",
            StudyStatus::Completed => "Completed",
            StudyStatus::OnHold => "On Hold",
        }
    }
}

impl fmt::Display for StudyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseLabelError::new("study status", s))
    }
}

/// A preclinical research study. Owns cohorts, visits and study procedures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    pub id: String,
    pub name: String,
    pub description: String,
    pub principal_investigator: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub status: StudyStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a study.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewStudy {
    pub name: String,
    pub description: String,
    pub principal_investigator: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<StudyStatus>,
}

impl Study {
    /// Build a study from validated input.
    pub fn from_new(new: NewStudy) -> Self {
        let now = now_rfc3339();
        Self {
            id: new_id(),
            name: new.name,
            description: new.description,
            principal_investigator: new.principal_investigator,
            start_date: new.start_date,
            end_date: new.end_date,
            status: new.status.unwrap_or_default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
