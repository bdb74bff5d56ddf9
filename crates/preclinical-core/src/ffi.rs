//! FFI-safe records.
//!
//! Enums, dates (ISO `YYYY-MM-DD`) and decimal amounts cross the boundary as
//! strings; `validation_rules` crosses as a JSON object string.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::cost::{effective_cost, StudyCost, VisitCost};
use crate::models::{
    Animal, Cohort, CohortUpdate, Field, MasterProcedure, MasterProcedureUpdate, NewAnimal,
    NewCohort, NewField, NewMasterProcedure, NewStudy, NewVisit, ProcedureCategory, Study,
    StudyProcedure, StudyStatus, ValidationRules, Visit, VisitProcedure, VisitStatus, VisitUpdate,
};
use crate::PreclinicalError;

fn parse_date(field: &str, value: Option<String>) -> Result<Option<NaiveDate>, PreclinicalError> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                PreclinicalError::InvalidInput(format!("{field}: '{s}' is not a date: {e}"))
            })
        })
        .transpose()
}

pub(crate) fn parse_amount(field: &str, value: &str) -> Result<Decimal, PreclinicalError> {
    Decimal::from_str(value.trim()).map_err(|e| {
        PreclinicalError::InvalidInput(format!("{field}: '{value}' is not a decimal amount: {e}"))
    })
}

fn parse_rules(value: Option<String>) -> Result<Option<ValidationRules>, PreclinicalError> {
    value
        .map(|s| serde_json::from_str::<ValidationRules>(&s))
        .transpose()
        .map_err(PreclinicalError::from)
}

fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

fn date(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

// =========================================================================
// Studies
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStudy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub principal_investigator: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Study> for FfiStudy {
    fn from(study: Study) -> Self {
        Self {
            id: study.id,
            name: study.name,
            description: study.description,
            principal_investigator: study.principal_investigator,
            start_date: date(study.start_date),
            end_date: date(study.end_date),
            status: study.status.to_string(),
            created_at: study.created_at,
            updated_at: study.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewStudy {
    pub name: String,
    pub description: String,
    pub principal_investigator: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Defaults to "Planning"
    pub status: Option<String>,
}

impl TryFrom<FfiNewStudy> for NewStudy {
    type Error = PreclinicalError;

    fn try_from(new: FfiNewStudy) -> Result<Self, Self::Error> {
        Ok(NewStudy {
            name: new.name,
            description: new.description,
            principal_investigator: new.principal_investigator,
            start_date: parse_date("start_date", new.start_date)?,
            end_date: parse_date("end_date", new.end_date)?,
            status: new.status.map(|s| s.parse::<StudyStatus>()).transpose()?,
        })
    }
}

// =========================================================================
// Catalog
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub is_mandatory: bool,
    pub units: Option<String>,
    pub options: Vec<String>,
    pub validation_rules: Option<String>,
}

impl From<Field> for FfiField {
    fn from(field: Field) -> Self {
        Self {
            id: field.id,
            name: field.name,
            label: field.label,
            field_type: field.field_type.as_str().to_string(),
            is_mandatory: field.is_mandatory,
            units: field.units,
            options: field.options,
            validation_rules: field
                .validation_rules
                .map(|rules| serde_json::Value::Object(rules).to_string()),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewField {
    pub name: String,
    pub label: String,
    pub field_type: String,
    pub is_mandatory: bool,
    pub units: Option<String>,
    pub options: Vec<String>,
    pub validation_rules: Option<String>,
}

impl TryFrom<FfiNewField> for NewField {
    type Error = PreclinicalError;

    fn try_from(new: FfiNewField) -> Result<Self, Self::Error> {
        Ok(NewField {
            name: new.name,
            label: new.label,
            field_type: new.field_type.parse()?,
            is_mandatory: new.is_mandatory,
            units: new.units,
            options: new.options,
            validation_rules: parse_rules(new.validation_rules)?,
        })
    }
}

fn new_fields(fields: Vec<FfiNewField>) -> Result<Vec<NewField>, PreclinicalError> {
    fields.into_iter().map(NewField::try_from).collect()
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMasterProcedure {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub default_cost: String,
    pub currency: String,
    pub parent_id: Option<String>,
    pub input_fields: Vec<FfiField>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<MasterProcedure> for FfiMasterProcedure {
    fn from(procedure: MasterProcedure) -> Self {
        Self {
            id: procedure.id,
            name: procedure.name,
            category: procedure.category.to_string(),
            description: procedure.description,
            default_cost: amount(procedure.default_cost),
            currency: procedure.currency,
            parent_id: procedure.parent_id,
            input_fields: procedure.input_fields.into_iter().map(Into::into).collect(),
            created_at: procedure.created_at,
            updated_at: procedure.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewMasterProcedure {
    pub name: String,
    pub category: String,
    pub description: String,
    pub default_cost: String,
    pub currency: Option<String>,
    pub parent_id: Option<String>,
    pub input_fields: Vec<FfiNewField>,
}

impl TryFrom<FfiNewMasterProcedure> for NewMasterProcedure {
    type Error = PreclinicalError;

    fn try_from(new: FfiNewMasterProcedure) -> Result<Self, Self::Error> {
        Ok(NewMasterProcedure {
            name: new.name,
            category: new.category.parse()?,
            description: new.description,
            default_cost: parse_amount("default_cost", &new.default_cost)?,
            currency: new.currency,
            parent_id: new.parent_id,
            input_fields: new_fields(new.input_fields)?,
        })
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiMasterProcedureUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub default_cost: Option<String>,
    pub currency: Option<String>,
    pub input_fields: Option<Vec<FfiNewField>>,
}

impl TryFrom<FfiMasterProcedureUpdate> for MasterProcedureUpdate {
    type Error = PreclinicalError;

    fn try_from(update: FfiMasterProcedureUpdate) -> Result<Self, Self::Error> {
        Ok(MasterProcedureUpdate {
            name: update.name,
            category: update
                .category
                .map(|c| c.parse::<ProcedureCategory>())
                .transpose()?,
            description: update.description,
            default_cost: update
                .default_cost
                .as_deref()
                .map(|cost| parse_amount("default_cost", cost))
                .transpose()?,
            currency: update.currency,
            input_fields: update.input_fields.map(new_fields).transpose()?,
        })
    }
}

/// Study procedure snapshot, with its resolved per-animal cost.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStudyProcedure {
    pub id: String,
    pub study_id: String,
    pub master_procedure_id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub currency: String,
    pub default_cost: String,
    pub study_specific_cost: Option<String>,
    pub effective_cost: String,
    pub input_fields: Vec<FfiField>,
    pub imported_at: String,
}

impl From<StudyProcedure> for FfiStudyProcedure {
    fn from(procedure: StudyProcedure) -> Self {
        let effective = amount(effective_cost(&procedure));
        Self {
            id: procedure.id,
            study_id: procedure.study_id,
            master_procedure_id: procedure.master_procedure_id,
            name: procedure.name,
            category: procedure.category.to_string(),
            description: procedure.description,
            currency: procedure.currency,
            default_cost: amount(procedure.default_cost),
            study_specific_cost: procedure.study_specific_cost.map(amount),
            effective_cost: effective,
            input_fields: procedure.input_fields.into_iter().map(Into::into).collect(),
            imported_at: procedure.imported_at,
        }
    }
}

// =========================================================================
// Animals and cohorts
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAnimal {
    pub id: String,
    pub animal_id: String,
    pub species: String,
    pub strain: Option<String>,
    pub sex: String,
    pub birth_date: Option<String>,
    pub weight: Option<f64>,
    pub created_at: String,
}

impl From<Animal> for FfiAnimal {
    fn from(animal: Animal) -> Self {
        Self {
            id: animal.id,
            animal_id: animal.animal_id,
            species: animal.species,
            strain: animal.strain,
            sex: animal.sex.to_string(),
            birth_date: date(animal.birth_date),
            weight: animal.weight,
            created_at: animal.created_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewAnimal {
    pub animal_id: String,
    pub species: String,
    pub strain: Option<String>,
    pub sex: String,
    pub birth_date: Option<String>,
    pub weight: Option<f64>,
}

impl TryFrom<FfiNewAnimal> for NewAnimal {
    type Error = PreclinicalError;

    fn try_from(new: FfiNewAnimal) -> Result<Self, Self::Error> {
        Ok(NewAnimal {
            animal_id: new.animal_id,
            species: new.species,
            strain: new.strain,
            sex: new.sex.parse()?,
            birth_date: parse_date("birth_date", new.birth_date)?,
            weight: new.weight,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCohort {
    pub id: String,
    pub study_id: String,
    pub name: String,
    pub description: String,
    pub criteria: Option<String>,
    pub planned_animal_count: u32,
    pub animal_ids: Vec<String>,
    /// Current fill against plan, clamped to 0..=100 for display
    pub fill_percent: f64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Cohort> for FfiCohort {
    fn from(cohort: Cohort) -> Self {
        let fill_percent = cohort.fill_percent_clamped();
        Self {
            id: cohort.id,
            study_id: cohort.study_id,
            name: cohort.name,
            description: cohort.description,
            criteria: cohort.criteria,
            planned_animal_count: cohort.planned_animal_count,
            animal_ids: cohort.animal_ids,
            fill_percent,
            created_at: cohort.created_at,
            updated_at: cohort.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewCohort {
    pub name: String,
    pub description: String,
    pub criteria: Option<String>,
    pub planned_animal_count: u32,
}

impl From<FfiNewCohort> for NewCohort {
    fn from(new: FfiNewCohort) -> Self {
        NewCohort {
            name: new.name,
            description: new.description,
            criteria: new.criteria,
            planned_animal_count: new.planned_animal_count,
        }
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiCohortUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub criteria: Option<String>,
    pub planned_animal_count: Option<u32>,
}

impl From<FfiCohortUpdate> for CohortUpdate {
    fn from(update: FfiCohortUpdate) -> Self {
        CohortUpdate {
            name: update.name,
            description: update.description,
            criteria: update.criteria,
            planned_animal_count: update.planned_animal_count,
        }
    }
}

// =========================================================================
// Visits
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub id: String,
    pub study_id: String,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub planned_timepoint: String,
    pub planned_date: Option<String>,
    pub actual_date: Option<String>,
    pub cohort_ids: Vec<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Visit> for FfiVisit {
    fn from(visit: Visit) -> Self {
        Self {
            id: visit.id,
            study_id: visit.study_id,
            name: visit.name,
            label: visit.label,
            description: visit.description,
            planned_timepoint: visit.planned_timepoint,
            planned_date: date(visit.planned_date),
            actual_date: date(visit.actual_date),
            cohort_ids: visit.cohort_ids,
            status: visit.status.to_string(),
            created_at: visit.created_at,
            updated_at: visit.updated_at,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNewVisit {
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub planned_timepoint: String,
    pub planned_date: Option<String>,
    pub cohort_ids: Vec<String>,
}

impl TryFrom<FfiNewVisit> for NewVisit {
    type Error = PreclinicalError;

    fn try_from(new: FfiNewVisit) -> Result<Self, Self::Error> {
        Ok(NewVisit {
            name: new.name,
            label: new.label,
            description: new.description,
            planned_timepoint: new.planned_timepoint,
            planned_date: parse_date("planned_date", new.planned_date)?,
            cohort_ids: new.cohort_ids,
        })
    }
}

#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiVisitUpdate {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub planned_timepoint: Option<String>,
    pub planned_date: Option<String>,
    pub actual_date: Option<String>,
    pub cohort_ids: Option<Vec<String>>,
    pub status: Option<String>,
}

impl TryFrom<FfiVisitUpdate> for VisitUpdate {
    type Error = PreclinicalError;

    fn try_from(update: FfiVisitUpdate) -> Result<Self, Self::Error> {
        Ok(VisitUpdate {
            name: update.name,
            label: update.label,
            description: update.description,
            planned_timepoint: update.planned_timepoint,
            planned_date: parse_date("planned_date", update.planned_date)?,
            actual_date: parse_date("actual_date", update.actual_date)?,
            cohort_ids: update.cohort_ids,
            status: update.status.map(|s| s.parse::<VisitStatus>()).transpose()?,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitProcedure {
    pub id: String,
    pub visit_id: String,
    pub study_procedure_id: String,
    pub sequence_order: Option<i32>,
    pub assigned_at: String,
}

impl From<VisitProcedure> for FfiVisitProcedure {
    fn from(link: VisitProcedure) -> Self {
        Self {
            id: link.id,
            visit_id: link.visit_id,
            study_procedure_id: link.study_procedure_id,
            sequence_order: link.sequence_order,
            assigned_at: link.assigned_at,
        }
    }
}

// =========================================================================
// Costs
// =========================================================================

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitCost {
    pub visit_id: String,
    pub total: String,
    pub currency: String,
    pub currencies: Vec<String>,
    /// Every link of the visit, including ones listed in `missing_procedure_ids`
    pub procedure_count: u32,
    pub total_animals: u32,
    pub projected_total: String,
    pub missing_procedure_ids: Vec<String>,
}

impl From<VisitCost> for FfiVisitCost {
    fn from(cost: VisitCost) -> Self {
        Self {
            visit_id: cost.visit_id,
            total: amount(cost.total),
            currency: cost.currency,
            currencies: cost.currencies,
            procedure_count: cost.procedure_count as u32,
            total_animals: cost.total_animals as u32,
            projected_total: amount(cost.projected_total),
            missing_procedure_ids: cost.missing_procedure_ids,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStudyCost {
    pub study_id: String,
    pub total: String,
    pub projected_total: String,
    pub currency: String,
    pub currencies: Vec<String>,
    pub visits: Vec<FfiVisitCost>,
}

impl From<StudyCost> for FfiStudyCost {
    fn from(cost: StudyCost) -> Self {
        Self {
            study_id: cost.study_id,
            total: amount(cost.total),
            projected_total: amount(cost.projected_total),
            currency: cost.currency,
            currencies: cost.currencies,
            visits: cost.visits.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldType;

    #[test]
    fn test_new_study_parses_dates_and_status() {
        let new: NewStudy = FfiNewStudy {
            name: "TOX-1".into(),
            description: "d".into(),
            principal_investigator: "pi".into(),
            start_date: Some("2026-01-05".into()),
            end_date: None,
            status: Some("On Hold".into()),
        }
        .try_into()
        .unwrap();
        assert_eq!(new.start_date, NaiveDate::from_ymd_opt(2026, 1, 5));
        assert_eq!(new.status, Some(StudyStatus::OnHold));
    }

    #[test]
    fn test_bad_strings_are_invalid_input() {
        let result = NewStudy::try_from(FfiNewStudy {
            name: "TOX-1".into(),
            description: "d".into(),
            principal_investigator: "pi".into(),
            start_date: Some("05/01/2026".into()),
            end_date: None,
            status: None,
        });
        assert!(matches!(result, Err(PreclinicalError::InvalidInput(_))));

        assert!(matches!(
            parse_amount("default_cost", "fifty"),
            Err(PreclinicalError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_master_procedure_round_trips_strings() {
        let new: NewMasterProcedure = FfiNewMasterProcedure {
            name: "Blood Draw".into(),
            category: "Sample Collection".into(),
            description: "Tail vein".into(),
            default_cost: "50.00".into(),
            currency: None,
            parent_id: None,
            input_fields: vec![FfiNewField {
                name: "volume".into(),
                label: "Volume".into(),
                field_type: "number".into(),
                is_mandatory: true,
                units: Some("mL".into()),
                options: vec![],
                validation_rules: Some(r#"{"min": 0.1}"#.into()),
            }],
        }
        .try_into()
        .unwrap();
        assert_eq!(new.category, ProcedureCategory::SampleCollection);
        assert_eq!(new.default_cost, Decimal::from(50));
        assert_eq!(new.input_fields[0].field_type, FieldType::Number);
        assert!(new.input_fields[0].validation_rules.as_ref().unwrap().contains_key("min"));

        let ffi: FfiMasterProcedure = MasterProcedure::from_new(new, "USD".into()).into();
        assert_eq!(ffi.default_cost, "50");
        assert_eq!(ffi.input_fields[0].validation_rules.as_deref(), Some(r#"{"min":0.1}"#));
    }

    #[test]
    fn test_rules_must_be_a_json_object() {
        let result = parse_rules(Some("[1, 2]".into()));
        assert!(matches!(result, Err(PreclinicalError::SerializationError(_))));
    }
}
