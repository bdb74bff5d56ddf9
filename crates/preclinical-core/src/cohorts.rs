//! Cohort assignment: cohort definitions and animal membership.
//!
//! Membership is a set. Assigning a member again or removing a non-member is
//! a no-op, and `planned_animal_count` is a target rather than a cap.

use tracing::{debug, info};

use crate::db::Database;
use crate::error::{require_text, CoreError, CoreResult};
use crate::models::{now_rfc3339, Cohort, CohortUpdate, NewCohort};
use crate::studies::StudyRegistry;

pub struct CohortAssignment<'a> {
    db: &'a Database,
}

impl<'a> CohortAssignment<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create an empty cohort in an existing study.
    pub fn create_cohort(&self, study_id: &str, new: NewCohort) -> CoreResult<Cohort> {
        require_text("name", &new.name)?;
        require_text("description", &new.description)?;
        validate_planned_count(new.planned_animal_count)?;
        StudyRegistry::new(self.db).ensure_exists(study_id)?;

        let cohort = Cohort::from_new(study_id.to_string(), new);
        self.db.insert_cohort(&cohort)?;
        info!(
            cohort_id = %cohort.id,
            study_id = %study_id,
            planned = cohort.planned_animal_count,
            "cohort created"
        );
        Ok(cohort)
    }

    pub fn get_cohort(&self, id: &str) -> CoreResult<Cohort> {
        self.db
            .get_cohort(id)?
            .ok_or_else(|| CoreError::not_found("Cohort", id))
    }

    pub fn list_cohorts_by_study(&self, study_id: &str) -> CoreResult<Vec<Cohort>> {
        Ok(self.db.list_cohorts_by_study(study_id)?)
    }

    /// Change cohort attributes. Membership is untouched.
    pub fn update_cohort(&self, id: &str, update: CohortUpdate) -> CoreResult<Cohort> {
        let mut cohort = self.get_cohort(id)?;
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(description) = &update.description {
            require_text("description", description)?;
        }
        if let Some(count) = update.planned_animal_count {
            validate_planned_count(count)?;
        }

        cohort.apply(update);
        self.db.update_cohort(&cohort)?;
        info!(cohort_id = %cohort.id, "cohort updated");
        Ok(cohort)
    }

    /// Add an animal to a cohort. Idempotent.
    pub fn assign_animal(&self, cohort_id: &str, animal_id: &str) -> CoreResult<Cohort> {
        let cohort = self.get_cohort(cohort_id)?;
        if self.db.get_animal(animal_id)?.is_none() {
            return Err(CoreError::not_found("Animal", animal_id));
        }

        if self.db.add_cohort_member(cohort_id, animal_id, &now_rfc3339())? {
            let cohort = self.get_cohort(cohort_id)?;
            info!(
                cohort_id = %cohort_id,
                animal_id = %animal_id,
                members = cohort.animal_count(),
                planned = cohort.planned_animal_count,
                "animal assigned"
            );
            Ok(cohort)
        } else {
            debug!(cohort_id = %cohort_id, animal_id = %animal_id, "animal already assigned");
            Ok(cohort)
        }
    }

    /// Remove an animal from a cohort. Removing a non-member is a no-op.
    pub fn remove_animal(&self, cohort_id: &str, animal_id: &str) -> CoreResult<Cohort> {
        let cohort = self.get_cohort(cohort_id)?;

        if self.db.remove_cohort_member(cohort_id, animal_id, &now_rfc3339())? {
            info!(cohort_id = %cohort_id, animal_id = %animal_id, "animal removed");
            self.get_cohort(cohort_id)
        } else {
            debug!(cohort_id = %cohort_id, animal_id = %animal_id, "animal was not a member");
            Ok(cohort)
        }
    }
}

fn validate_planned_count(count: u32) -> CoreResult<()> {
    if count < 1 {
        return Err(CoreError::validation("planned_animal_count", "must be at least 1"));
    }
    Ok(())
}
