//! Visit scheduler: visits, cohort participation, procedure assignment and
//! status.
//!
//! Status is a plain value. Any of the six statuses may follow any other so
//! operators can correct mistakes (Completed -> Scheduled is allowed).

mod timeline;

pub use timeline::*;

use tracing::info;

use crate::db::Database;
use crate::error::{require_text, CoreError, CoreResult};
use crate::models::{NewVisit, Visit, VisitProcedure, VisitStatus, VisitUpdate};
use crate::studies::StudyRegistry;

pub struct VisitScheduler<'a> {
    db: &'a Database,
}

impl<'a> VisitScheduler<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a visit with at least one cohort, all from the same study.
    pub fn create_visit(&self, study_id: &str, new: NewVisit) -> CoreResult<Visit> {
        StudyRegistry::new(self.db).ensure_exists(study_id)?;
        require_text("name", &new.name)?;
        require_text("label", &new.label)?;
        require_text("planned_timepoint", &new.planned_timepoint)?;
        self.validate_cohorts(study_id, &new.cohort_ids)?;

        let visit = Visit::from_new(study_id.to_string(), new);
        self.db.insert_visit(&visit)?;
        info!(
            visit_id = %visit.id,
            study_id = %study_id,
            timepoint = %visit.planned_timepoint,
            cohorts = visit.cohort_ids.len(),
            "visit created"
        );
        Ok(visit)
    }

    pub fn get_visit(&self, id: &str) -> CoreResult<Visit> {
        self.db
            .get_visit(id)?
            .ok_or_else(|| CoreError::not_found("Visit", id))
    }

    /// A study's visits in timeline order (see [`compare_visits`]).
    pub fn list_visits_by_study(&self, study_id: &str) -> CoreResult<Vec<Visit>> {
        let mut visits = self.db.list_visits_by_study(study_id)?;
        sort_timeline(&mut visits);
        Ok(visits)
    }

    /// Unconditional status change.
    pub fn update_status(&self, visit_id: &str, status: VisitStatus) -> CoreResult<Visit> {
        let mut visit = self.get_visit(visit_id)?;
        let previous = visit.status;
        visit.set_status(status);
        self.db.update_visit_status(&visit.id, visit.status, &visit.updated_at)?;
        info!(visit_id = %visit_id, from = %previous, to = %status, "visit status updated");
        Ok(visit)
    }

    /// Partial update with the same rules as creation.
    pub fn update_visit(&self, visit_id: &str, update: VisitUpdate) -> CoreResult<Visit> {
        let mut visit = self.get_visit(visit_id)?;
        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(label) = &update.label {
            require_text("label", label)?;
        }
        if let Some(timepoint) = &update.planned_timepoint {
            require_text("planned_timepoint", timepoint)?;
        }
        if let Some(cohort_ids) = &update.cohort_ids {
            self.validate_cohorts(&visit.study_id, cohort_ids)?;
        }

        visit.apply(update);
        self.db.update_visit(&visit)?;
        info!(visit_id = %visit.id, "visit updated");
        Ok(visit)
    }

    /// Link a study procedure of the same study to a visit, at most once.
    pub fn assign_procedure(
        &self,
        visit_id: &str,
        study_procedure_id: &str,
        sequence_order: Option<i32>,
    ) -> CoreResult<VisitProcedure> {
        let visit = self.get_visit(visit_id)?;
        let procedure = self
            .db
            .get_study_procedure(study_procedure_id)?
            .ok_or_else(|| CoreError::not_found("StudyProcedure", study_procedure_id))?;
        if procedure.study_id != visit.study_id {
            return Err(CoreError::validation(
                "study_procedure_id",
                format!(
                    "procedure {} belongs to study {}, visit belongs to study {}",
                    procedure.id, procedure.study_id, visit.study_id
                ),
            ));
        }

        let link = VisitProcedure::new(visit.id, procedure.id, sequence_order);
        self.db.insert_visit_procedure(&link)?;
        info!(
            visit_id = %link.visit_id,
            study_procedure_id = %link.study_procedure_id,
            sequence_order = ?link.sequence_order,
            "procedure assigned to visit"
        );
        Ok(link)
    }

    /// A visit's procedure links in display order.
    pub fn list_procedures_by_visit(&self, visit_id: &str) -> CoreResult<Vec<VisitProcedure>> {
        if self.db.get_visit(visit_id)?.is_none() {
            return Err(CoreError::not_found("Visit", visit_id));
        }
        let mut links = self.db.list_visit_procedures(visit_id)?;
        sort_by_sequence(&mut links);
        Ok(links)
    }

    fn validate_cohorts(&self, study_id: &str, cohort_ids: &[String]) -> CoreResult<()> {
        if cohort_ids.is_empty() {
            return Err(CoreError::validation("cohort_ids", "at least one cohort is required"));
        }
        for cohort_id in cohort_ids {
            match self.db.get_cohort(cohort_id)? {
                Some(cohort) if cohort.study_id == study_id => {}
                Some(_) => {
                    return Err(CoreError::validation(
                        "cohort_ids",
                        format!("cohort {cohort_id} does not belong to study {study_id}"),
                    ))
                }
                None => {
                    return Err(CoreError::validation(
                        "cohort_ids",
                        format!("cohort {cohort_id} does not exist"),
                    ))
                }
            }
        }
        Ok(())
    }
}
