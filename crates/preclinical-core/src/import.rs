//! Procedure import: snapshot a master procedure into a study.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::catalog::{validate_cost, ProcedureCatalog};
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::StudyProcedure;
use crate::studies::StudyRegistry;

pub struct ProcedureImporter<'a> {
    db: &'a Database,
}

impl<'a> ProcedureImporter<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Copy the master definition into the study as an independent snapshot.
    ///
    /// At most one snapshot exists per (study, master) pair. The uniqueness
    /// check is the storage constraint itself, so two racing imports cannot
    /// both succeed and a rejected import leaves no partial write.
    pub fn import_procedure(
        &self,
        study_id: &str,
        master_procedure_id: &str,
        study_specific_cost: Option<Decimal>,
    ) -> CoreResult<StudyProcedure> {
        if let Some(cost) = study_specific_cost {
            validate_cost("study_specific_cost", cost)?;
        }
        StudyRegistry::new(self.db).ensure_exists(study_id)?;
        let master = ProcedureCatalog::new(self.db).get_master_procedure(master_procedure_id)?;

        let snapshot = StudyProcedure::snapshot(study_id.to_string(), &master, study_specific_cost);
        if let Err(e) = self.db.insert_study_procedure(&snapshot) {
            let err = CoreError::from(e);
            if matches!(err, CoreError::Conflict(_)) {
                warn!(
                    study_id = %study_id,
                    master_procedure_id = %master_procedure_id,
                    "procedure already imported"
                );
            }
            return Err(err);
        }

        info!(
            study_procedure_id = %snapshot.id,
            study_id = %study_id,
            master_procedure_id = %master_procedure_id,
            overridden = snapshot.has_cost_override(),
            "procedure imported"
        );
        Ok(snapshot)
    }

    pub fn list_study_procedures(&self, study_id: &str) -> CoreResult<Vec<StudyProcedure>> {
        Ok(self.db.list_study_procedures(study_id)?)
    }

    pub fn get_study_procedure(&self, id: &str) -> CoreResult<StudyProcedure> {
        self.db
            .get_study_procedure(id)?
            .ok_or_else(|| CoreError::not_found("StudyProcedure", id))
    }
}
