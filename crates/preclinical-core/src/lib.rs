//! Preclinical Core Library
//!
//! Domain core for preclinical (animal) study management: a shared procedure
//! catalog, per-study procedure snapshots with cost overrides, cohorts of
//! animals, and a visit timeline with per-visit cost rollup.
//!
//! # Architecture
//!
//! ```text
//!   Procedure Catalog ──import (deep copy)──▶ Study Procedures
//!   (MasterProcedure)                          (snapshot + override)
//!                                                     │
//!   Animal Registry ──assign──▶ Cohorts ──▶ Visits ◀──┘ assign
//!                                             │
//!                                      Cost Resolver
//!                          (effective cost per procedure, visit/study totals)
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence, one `impl Database` block per entity
//! - [`models`]: Domain types (Study, MasterProcedure, StudyProcedure, Cohort, Visit, etc.)
//! - [`studies`], [`catalog`], [`registry`], [`cohorts`], [`import`],
//!   [`scheduler`], [`cost`]: domain services borrowing a [`Database`]
//! - [`config`]: environment configuration
//!
//! The FFI surface ([`PreclinicalCore`]) serializes calls through a mutex
//! around one connection; uniqueness and membership invariants are also
//! enforced by storage constraints.

pub mod catalog;
pub mod cohorts;
pub mod config;
pub mod cost;
pub mod db;
pub mod error;
pub mod ffi;
pub mod import;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod studies;

// Re-export commonly used types
pub use catalog::ProcedureCatalog;
pub use cohorts::CohortAssignment;
pub use config::CoreConfig;
pub use cost::{effective_cost, CostResolver, StudyCost, VisitCost};
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use ffi::*;
pub use import::ProcedureImporter;
pub use models::{
    Animal, Cohort, Field, FieldType, MasterProcedure, ProcedureCategory, Sex, Study,
    StudyProcedure, StudyStatus, Visit, VisitProcedure, VisitStatus,
};
pub use registry::AnimalRegistry;
pub use scheduler::VisitScheduler;
pub use studies::StudyRegistry;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing::info;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PreclinicalError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Overflow: {0}")]
    Overflow(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<CoreError> for PreclinicalError {
    fn from(e: CoreError) -> Self {
        let message = e.to_string();
        match e {
            CoreError::Validation { .. } => PreclinicalError::Validation(message),
            CoreError::Conflict(_) => PreclinicalError::Conflict(message),
            CoreError::NotFound { .. } => PreclinicalError::NotFound(message),
            CoreError::Overflow(_) => PreclinicalError::Overflow(message),
            CoreError::Database(_) => PreclinicalError::DatabaseError(message),
        }
    }
}

impl From<db::DbError> for PreclinicalError {
    fn from(e: db::DbError) -> Self {
        CoreError::from(e).into()
    }
}

impl From<models::ParseLabelError> for PreclinicalError {
    fn from(e: models::ParseLabelError) -> Self {
        PreclinicalError::InvalidInput(e.to_string())
    }
}

impl From<serde_json::Error> for PreclinicalError {
    fn from(e: serde_json::Error) -> Self {
        PreclinicalError::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for PreclinicalError {
    fn from(e: config::ConfigError) -> Self {
        PreclinicalError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PreclinicalError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PreclinicalError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path.
#[uniffi::export]
pub fn open_database(path: String) -> Result<Arc<PreclinicalCore>, PreclinicalError> {
    let db = Database::open(&path)?;
    Ok(PreclinicalCore::wrap(db, config::DEFAULT_CURRENCY.to_string()))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PreclinicalCore>, PreclinicalError> {
    let db = Database::open_in_memory()?;
    Ok(PreclinicalCore::wrap(db, config::DEFAULT_CURRENCY.to_string()))
}

/// Open the database named by `PRECLINICAL_DB_PATH` (and `.env`).
#[uniffi::export]
pub fn open_from_env() -> Result<Arc<PreclinicalCore>, PreclinicalError> {
    let config = CoreConfig::from_env()?;
    open_with_config(&config)
}

/// Open the database described by `config`.
pub fn open_with_config(config: &CoreConfig) -> Result<Arc<PreclinicalCore>, PreclinicalError> {
    let db = if config.is_in_memory() {
        Database::open_in_memory()?
    } else {
        Database::open(&config.database_path)?
    };
    info!(
        path = %config.database_path,
        currency = %config.default_currency,
        "database opened"
    );
    Ok(PreclinicalCore::wrap(db, config.default_currency.clone()))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe database wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PreclinicalCore {
    db: Arc<Mutex<Database>>,
    default_currency: String,
}

impl PreclinicalCore {
    fn wrap(db: Database, default_currency: String) -> Arc<Self> {
        Arc::new(Self {
            db: Arc::new(Mutex::new(db)),
            default_currency,
        })
    }
}

#[uniffi::export]
impl PreclinicalCore {
    // =========================================================================
    // Study Operations
    // =========================================================================

    pub fn create_study(&self, study: FfiNewStudy) -> Result<FfiStudy, PreclinicalError> {
        let db = self.db.lock()?;
        let created = StudyRegistry::new(&db).create_study(study.try_into()?)?;
        Ok(created.into())
    }

    pub fn get_study(&self, study_id: String) -> Result<FfiStudy, PreclinicalError> {
        let db = self.db.lock()?;
        Ok(StudyRegistry::new(&db).get_study(&study_id)?.into())
    }

    pub fn list_studies(&self) -> Result<Vec<FfiStudy>, PreclinicalError> {
        let db = self.db.lock()?;
        let studies = StudyRegistry::new(&db).list_studies()?;
        Ok(studies.into_iter().map(|s| s.into()).collect())
    }

    pub fn update_study_status(
        &self,
        study_id: String,
        status: String,
    ) -> Result<FfiStudy, PreclinicalError> {
        let status: StudyStatus = status.parse()?;
        let db = self.db.lock()?;
        Ok(StudyRegistry::new(&db).update_status(&study_id, status)?.into())
    }

    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Add a master procedure to the shared catalog.
    pub fn create_master_procedure(
        &self,
        procedure: FfiNewMasterProcedure,
    ) -> Result<FfiMasterProcedure, PreclinicalError> {
        let db = self.db.lock()?;
        let created = ProcedureCatalog::new(&db)
            .with_default_currency(self.default_currency.as_str())
            .create_master_procedure(procedure.try_into()?)?;
        Ok(created.into())
    }

    pub fn get_master_procedure(
        &self,
        master_procedure_id: String,
    ) -> Result<FfiMasterProcedure, PreclinicalError> {
        let db = self.db.lock()?;
        let procedure = ProcedureCatalog::new(&db).get_master_procedure(&master_procedure_id)?;
        Ok(procedure.into())
    }

    pub fn list_master_procedures(&self) -> Result<Vec<FfiMasterProcedure>, PreclinicalError> {
        let db = self.db.lock()?;
        let procedures = ProcedureCatalog::new(&db).list_master_procedures()?;
        Ok(procedures.into_iter().map(|p| p.into()).collect())
    }

    /// Edit a catalog entry. Already imported snapshots are unaffected.
    pub fn update_master_procedure(
        &self,
        master_procedure_id: String,
        update: FfiMasterProcedureUpdate,
    ) -> Result<FfiMasterProcedure, PreclinicalError> {
        let db = self.db.lock()?;
        let procedure = ProcedureCatalog::new(&db)
            .update_master_procedure(&master_procedure_id, update.try_into()?)?;
        Ok(procedure.into())
    }

    // =========================================================================
    // Animal Operations
    // =========================================================================

    pub fn register_animal(&self, animal: FfiNewAnimal) -> Result<FfiAnimal, PreclinicalError> {
        let db = self.db.lock()?;
        let registered = AnimalRegistry::new(&db).register_animal(animal.try_into()?)?;
        Ok(registered.into())
    }

    pub fn get_animal(&self, id: String) -> Result<FfiAnimal, PreclinicalError> {
        let db = self.db.lock()?;
        Ok(AnimalRegistry::new(&db).get_animal(&id)?.into())
    }

    pub fn list_animals(&self) -> Result<Vec<FfiAnimal>, PreclinicalError> {
        let db = self.db.lock()?;
        let animals = AnimalRegistry::new(&db).list_animals()?;
        Ok(animals.into_iter().map(|a| a.into()).collect())
    }

    // =========================================================================
    // Cohort Operations
    // =========================================================================

    pub fn create_cohort(
        &self,
        study_id: String,
        cohort: FfiNewCohort,
    ) -> Result<FfiCohort, PreclinicalError> {
        let db = self.db.lock()?;
        let created = CohortAssignment::new(&db).create_cohort(&study_id, cohort.into())?;
        Ok(created.into())
    }

    pub fn get_cohort(&self, cohort_id: String) -> Result<FfiCohort, PreclinicalError> {
        let db = self.db.lock()?;
        Ok(CohortAssignment::new(&db).get_cohort(&cohort_id)?.into())
    }

    pub fn list_cohorts_by_study(&self, study_id: String) -> Result<Vec<FfiCohort>, PreclinicalError> {
        let db = self.db.lock()?;
        let cohorts = CohortAssignment::new(&db).list_cohorts_by_study(&study_id)?;
        Ok(cohorts.into_iter().map(|c| c.into()).collect())
    }

    pub fn update_cohort(
        &self,
        cohort_id: String,
        update: FfiCohortUpdate,
    ) -> Result<FfiCohort, PreclinicalError> {
        let db = self.db.lock()?;
        let cohort = CohortAssignment::new(&db).update_cohort(&cohort_id, update.into())?;
        Ok(cohort.into())
    }

    /// Add an animal to a cohort. Repeating the call is a no-op.
    pub fn assign_animal(
        &self,
        cohort_id: String,
        animal_id: String,
    ) -> Result<FfiCohort, PreclinicalError> {
        let db = self.db.lock()?;
        let cohort = CohortAssignment::new(&db).assign_animal(&cohort_id, &animal_id)?;
        Ok(cohort.into())
    }

    pub fn remove_animal(
        &self,
        cohort_id: String,
        animal_id: String,
    ) -> Result<FfiCohort, PreclinicalError> {
        let db = self.db.lock()?;
        let cohort = CohortAssignment::new(&db).remove_animal(&cohort_id, &animal_id)?;
        Ok(cohort.into())
    }

    // =========================================================================
    // Import Operations
    // =========================================================================

    /// Snapshot a master procedure into a study, optionally overriding its cost.
    pub fn import_procedure(
        &self,
        study_id: String,
        master_procedure_id: String,
        study_specific_cost: Option<String>,
    ) -> Result<FfiStudyProcedure, PreclinicalError> {
        let cost = study_specific_cost
            .map(|c| ffi::parse_amount("study_specific_cost", &c))
            .transpose()?;
        let db = self.db.lock()?;
        let imported =
            ProcedureImporter::new(&db).import_procedure(&study_id, &master_procedure_id, cost)?;
        Ok(imported.into())
    }

    pub fn get_study_procedure(
        &self,
        study_procedure_id: String,
    ) -> Result<FfiStudyProcedure, PreclinicalError> {
        let db = self.db.lock()?;
        let procedure = ProcedureImporter::new(&db).get_study_procedure(&study_procedure_id)?;
        Ok(procedure.into())
    }

    pub fn list_study_procedures(
        &self,
        study_id: String,
    ) -> Result<Vec<FfiStudyProcedure>, PreclinicalError> {
        let db = self.db.lock()?;
        let procedures = ProcedureImporter::new(&db).list_study_procedures(&study_id)?;
        Ok(procedures.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Visit Operations
    // =========================================================================

    pub fn create_visit(
        &self,
        study_id: String,
        visit: FfiNewVisit,
    ) -> Result<FfiVisit, PreclinicalError> {
        let db = self.db.lock()?;
        let created = VisitScheduler::new(&db).create_visit(&study_id, visit.try_into()?)?;
        Ok(created.into())
    }

    pub fn get_visit(&self, visit_id: String) -> Result<FfiVisit, PreclinicalError> {
        let db = self.db.lock()?;
        Ok(VisitScheduler::new(&db).get_visit(&visit_id)?.into())
    }

    /// Visits of a study in timeline order.
    pub fn list_visits_by_study(&self, study_id: String) -> Result<Vec<FfiVisit>, PreclinicalError> {
        let db = self.db.lock()?;
        let visits = VisitScheduler::new(&db).list_visits_by_study(&study_id)?;
        Ok(visits.into_iter().map(|v| v.into()).collect())
    }

    pub fn update_visit(
        &self,
        visit_id: String,
        update: FfiVisitUpdate,
    ) -> Result<FfiVisit, PreclinicalError> {
        let db = self.db.lock()?;
        let visit = VisitScheduler::new(&db).update_visit(&visit_id, update.try_into()?)?;
        Ok(visit.into())
    }

    /// Set any of the six statuses, regardless of the current one.
    pub fn update_visit_status(
        &self,
        visit_id: String,
        status: String,
    ) -> Result<FfiVisit, PreclinicalError> {
        let status: VisitStatus = status.parse()?;
        let db = self.db.lock()?;
        Ok(VisitScheduler::new(&db).update_status(&visit_id, status)?.into())
    }

    pub fn assign_procedure(
        &self,
        visit_id: String,
        study_procedure_id: String,
        sequence_order: Option<i32>,
    ) -> Result<FfiVisitProcedure, PreclinicalError> {
        let db = self.db.lock()?;
        let link = VisitScheduler::new(&db).assign_procedure(
            &visit_id,
            &study_procedure_id,
            sequence_order,
        )?;
        Ok(link.into())
    }

    pub fn list_procedures_by_visit(
        &self,
        visit_id: String,
    ) -> Result<Vec<FfiVisitProcedure>, PreclinicalError> {
        let db = self.db.lock()?;
        let links = VisitScheduler::new(&db).list_procedures_by_visit(&visit_id)?;
        Ok(links.into_iter().map(|l| l.into()).collect())
    }

    // =========================================================================
    // Cost Operations
    // =========================================================================

    pub fn compute_visit_cost(&self, visit_id: String) -> Result<FfiVisitCost, PreclinicalError> {
        let db = self.db.lock()?;
        let cost = CostResolver::new(&db)
            .with_default_currency(self.default_currency.as_str())
            .visit_cost(&visit_id)?;
        Ok(cost.into())
    }

    pub fn compute_study_cost(&self, study_id: String) -> Result<FfiStudyCost, PreclinicalError> {
        let db = self.db.lock()?;
        let cost = CostResolver::new(&db)
            .with_default_currency(self.default_currency.as_str())
            .study_cost(&study_id)?;
        Ok(cost.into())
    }
}
