//! Study registry: the root every other component hangs off.

use tracing::info;

use crate::db::Database;
use crate::error::{require_text, CoreError, CoreResult};
use crate::models::{now_rfc3339, NewStudy, Study, StudyStatus};

pub struct StudyRegistry<'a> {
    db: &'a Database,
}

impl<'a> StudyRegistry<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a study after validating required fields and the date range.
    pub fn create_study(&self, new: NewStudy) -> CoreResult<Study> {
        require_text("name", &new.name)?;
        require_text("description", &new.description)?;
        require_text("principal_investigator", &new.principal_investigator)?;
        if let (Some(start), Some(end)) = (new.start_date, new.end_date) {
            if end < start {
                return Err(CoreError::validation(
                    "end_date",
                    format!("{end} is before start_date {start}"),
                ));
            }
        }

        let study = Study::from_new(new);
        self.db.insert_study(&study)?;
        info!(study_id = %study.id, name = %study.name, "study created");
        Ok(study)
    }

    pub fn get_study(&self, id: &str) -> CoreResult<Study> {
        self.db
            .get_study(id)?
            .ok_or_else(|| CoreError::not_found("Study", id))
    }

    pub fn list_studies(&self) -> CoreResult<Vec<Study>> {
        Ok(self.db.list_studies()?)
    }

    /// Any status may follow any other.
    pub fn update_status(&self, id: &str, status: StudyStatus) -> CoreResult<Study> {
        if !self.db.update_study_status(id, status, &now_rfc3339())? {
            return Err(CoreError::not_found("Study", id));
        }
        info!(study_id = %id, status = %status, "study status updated");
        self.get_study(id)
    }

    /// Fail with `NotFound` unless the study exists.
    pub(crate) fn ensure_exists(&self, id: &str) -> CoreResult<()> {
        if self.db.study_exists(id)? {
            Ok(())
        } else {
            Err(CoreError::not_found("Study", id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_study() -> NewStudy {
        NewStudy {
            name: "TOX-001".into(),
            description: "Dose range finding".into(),
            principal_investigator: "Dr. Achterberg".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let registry = StudyRegistry::new(&db);

        let study = registry.create_study(new_study()).unwrap();
        assert_eq!(registry.get_study(&study.id).unwrap(), study);
        assert_eq!(registry.list_studies().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_pi_rejected() {
        let db = Database::open_in_memory().unwrap();
        let registry = StudyRegistry::new(&db);

        let mut new = new_study();
        new.principal_investigator = String::new();
        let err = registry.create_study(new).unwrap_err();
        assert_eq!(err.field(), Some("principal_investigator"));
        assert!(registry.list_studies().unwrap().is_empty());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let db = Database::open_in_memory().unwrap();
        let registry = StudyRegistry::new(&db);

        let mut new = new_study();
        new.start_date = NaiveDate::from_ymd_opt(2026, 5, 1);
        new.end_date = NaiveDate::from_ymd_opt(2026, 4, 1);
        let err = registry.create_study(new).unwrap_err();
        assert_eq!(err.field(), Some("end_date"));
    }

    #[test]
    fn test_status_transitions_unrestricted() {
        let db = Database::open_in_memory().unwrap();
        let registry = StudyRegistry::new(&db);
        let study = registry.create_study(new_study()).unwrap();

        registry.update_status(&study.id, StudyStatus::Completed).unwrap();
        let reopened = registry.update_status(&study.id, StudyStatus::Planning).unwrap();
        assert_eq!(reopened.status, StudyStatus::Planning);
    }

    #[test]
    fn test_unknown_study() {
        let db = Database::open_in_memory().unwrap();
        let registry = StudyRegistry::new(&db);
        assert!(matches!(
            registry.get_study("nope"),
            Err(CoreError::NotFound { resource: "Study", .. })
        ));
        assert!(matches!(
            registry.update_status("nope", StudyStatus::Active),
            Err(CoreError::NotFound { .. })
        ));
    }
}
