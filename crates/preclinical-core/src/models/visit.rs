//! Visit and visit-procedure models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_rfc3339, ParseLabelError};

/// Visit status. Plain value with an unconditional setter; every transition
/// between the six values is legal, including Completed -> Scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VisitStatus {
    #[default]
    Scheduled,
    Upcoming,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Missed,
    Skipped,
}

impl VisitStatus {
    pub const ALL: [VisitStatus; 6] = [
        VisitStatus::Scheduled,
        VisitStatus::Upcoming,
        VisitStatus::InProgress,
        VisitStatus::Completed,
        VisitStatus::Missed,
        VisitStatus::Skipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "Scheduled",
            VisitStatus::Upcoming => "Upcoming",
            VisitStatus::InProgress => "In Progress",
            VisitStatus::Completed => "Completed",
            VisitStatus::Missed => "Missed",
            VisitStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseLabelError::new("visit status", s))
    }
}

/// A scheduled timepoint in a study's timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    pub id: String,
    pub study_id: String,
    pub name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Free text, e.g. "Day 7 +/- 1 day"
    pub planned_timepoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_date: Option<NaiveDate>,
    /// Participating cohorts of the same study, without duplicates
    pub cohort_ids: Vec<String>,
    pub status: VisitStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewVisit {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub planned_timepoint: String,
    pub planned_date: Option<NaiveDate>,
    pub cohort_ids: Vec<String>,
}

/// Partial visit update. `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VisitUpdate {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub planned_timepoint: Option<String>,
    pub planned_date: Option<NaiveDate>,
    pub actual_date: Option<NaiveDate>,
    pub cohort_ids: Option<Vec<String>>,
    pub status: Option<VisitStatus>,
}

impl Visit {
    pub fn from_new(study_id: String, new: NewVisit) -> Self {
        let now = now_rfc3339();
        Self {
            id: new_id(),
            study_id,
            name: new.name,
            label: new.label,
            description: new.description,
            planned_timepoint: new.planned_timepoint,
            planned_date: new.planned_date,
            actual_date: None,
            cohort_ids: dedup_preserving_order(new.cohort_ids),
            status: VisitStatus::Scheduled,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: VisitStatus) {
        self.status = status;
        self.updated_at = now_rfc3339();
    }

    pub fn apply(&mut self, update: VisitUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(label) = update.label {
            self.label = label;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(timepoint) = update.planned_timepoint {
            self.planned_timepoint = timepoint;
        }
        if let Some(date) = update.planned_date {
            self.planned_date = Some(date);
        }
        if let Some(date) = update.actual_date {
            self.actual_date = Some(date);
        }
        if let Some(cohort_ids) = update.cohort_ids {
            self.cohort_ids = dedup_preserving_order(cohort_ids);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = now_rfc3339();
    }
}

/// Link between a visit and a study procedure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitProcedure {
    pub id: String,
    pub visit_id: String,
    pub study_procedure_id: String,
    /// Advisory display order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_order: Option<i32>,
    pub assigned_at: String,
}

impl VisitProcedure {
    pub fn new(visit_id: String, study_procedure_id: String, sequence_order: Option<i32>) -> Self {
        Self {
            id: new_id(),
            visit_id,
            study_procedure_id,
            sequence_order,
            assigned_at: now_rfc3339(),
        }
    }
}

pub(crate) fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
