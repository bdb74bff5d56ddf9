//! Cohort models.

use serde::{Deserialize, Serialize};

use super::{new_id, now_rfc3339};

/// A named group of animals within a study, tracked against a planned size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cohort {
    pub id: String,
    pub study_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<String>,
    /// Target size. Informational only, never enforced as a cap.
    pub planned_animal_count: u32,
    /// Member animal UUIDs, without duplicates
    pub animal_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a cohort.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NewCohort {
    pub name: String,
    pub description: String,
    pub criteria: Option<String>,
    pub planned_animal_count: u32,
}

/// Partial cohort update. `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CohortUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub criteria: Option<String>,
    pub planned_animal_count: Option<u32>,
}

impl Cohort {
    /// Build an empty cohort for a study.
    pub fn from_new(study_id: String, new: NewCohort) -> Self {
        let now = now_rfc3339();
        Self {
            id: new_id(),
            study_id,
            name: new.name,
            description: new.description,
            criteria: new.criteria,
            planned_animal_count: new.planned_animal_count,
            animal_ids: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn contains(&self, animal_id: &str) -> bool {
        self.animal_ids.iter().any(|id| id == animal_id)
    }

    pub fn animal_count(&self) -> usize {
        self.animal_ids.len()
    }

    /// Assigned / planned, unclamped. May exceed 1.0.
    pub fn fill_rate(&self) -> f64 {
        if self.planned_animal_count == 0 {
            return 0.0;
        }
        self.animal_ids.len() as f64 / f64::from(self.planned_animal_count)
    }

    /// Fill rate as a percentage clamped to [0, 100], for display.
    pub fn fill_percent_clamped(&self) -> f64 {
        (self.fill_rate() * 100.0).clamp(0.0, 100.0)
    }

    pub fn apply(&mut self, update: CohortUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(criteria) = update.criteria {
            self.criteria = Some(criteria);
        }
        if let Some(count) = update.planned_animal_count {
            self.planned_animal_count = count;
        }
        self.updated_at = now_rfc3339();
    }
}
