//! Procedure catalog: the global library of master procedure definitions.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::info;

use crate::config::DEFAULT_CURRENCY;
use crate::db::Database;
use crate::error::{require_currency, require_text, CoreError, CoreResult};
use crate::models::{MasterProcedure, MasterProcedureUpdate, NewField, NewMasterProcedure};

pub struct ProcedureCatalog<'a> {
    db: &'a Database,
    default_currency: String,
}

impl<'a> ProcedureCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Currency applied to definitions that do not name one.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Validate and store a new master procedure.
    pub fn create_master_procedure(&self, new: NewMasterProcedure) -> CoreResult<MasterProcedure> {
        require_text("name", &new.name)?;
        require_text("description", &new.description)?;
        validate_cost("default_cost", new.default_cost)?;
        let currency = new
            .currency
            .clone()
            .unwrap_or_else(|| self.default_currency.clone());
        require_currency("currency", &currency)?;
        validate_fields(&new.input_fields)?;
        if let Some(parent_id) = &new.parent_id {
            if self.db.get_master_procedure(parent_id)?.is_none() {
                return Err(CoreError::validation(
                    "parent_id",
                    format!("master procedure {parent_id} does not exist"),
                ));
            }
        }

        let procedure = MasterProcedure::from_new(new, currency);
        self.db.insert_master_procedure(&procedure)?;
        info!(
            master_procedure_id = %procedure.id,
            name = %procedure.name,
            fields = procedure.input_fields.len(),
            "master procedure created"
        );
        Ok(procedure)
    }

    /// All definitions in insertion order.
    pub fn list_master_procedures(&self) -> CoreResult<Vec<MasterProcedure>> {
        Ok(self.db.list_master_procedures()?)
    }

    pub fn get_master_procedure(&self, id: &str) -> CoreResult<MasterProcedure> {
        self.db
            .get_master_procedure(id)?
            .ok_or_else(|| CoreError::not_found("MasterProcedure", id))
    }

    /// Edit a definition in place. Study snapshots imported earlier keep the
    /// values they were imported with.
    pub fn update_master_procedure(
        &self,
        id: &str,
        update: MasterProcedureUpdate,
    ) -> CoreResult<MasterProcedure> {
        let mut procedure = self.get_master_procedure(id)?;

        if let Some(name) = &update.name {
            require_text("name", name)?;
        }
        if let Some(description) = &update.description {
            require_text("description", description)?;
        }
        if let Some(cost) = update.default_cost {
            validate_cost("default_cost", cost)?;
        }
        if let Some(currency) = &update.currency {
            require_currency("currency", currency)?;
        }
        if let Some(fields) = &update.input_fields {
            validate_fields(fields)?;
        }

        procedure.apply(update);
        self.db.update_master_procedure(&procedure)?;
        info!(master_procedure_id = %procedure.id, "master procedure updated");
        Ok(procedure)
    }
}

pub(crate) fn validate_cost(field: &str, cost: Decimal) -> CoreResult<()> {
    if cost < Decimal::ZERO {
        return Err(CoreError::validation(field, format!("{cost} must not be negative")));
    }
    Ok(())
}

/// Structural checks only; `validation_rules` payloads are not interpreted.
fn validate_fields(fields: &[NewField]) -> CoreResult<()> {
    let mut names = HashSet::new();
    for (i, field) in fields.iter().enumerate() {
        require_text(&format!("input_fields[{i}].name"), &field.name)?;
        require_text(&format!("input_fields[{i}].label"), &field.label)?;
        if field.field_type.is_choice() && field.options.is_empty() {
            return Err(CoreError::validation(
                format!("input_fields[{i}].options"),
                format!("{} fields need at least one option", field.field_type),
            ));
        }
        if !names.insert(field.name.as_str()) {
            return Err(CoreError::validation(
                format!("input_fields[{i}].name"),
                format!("duplicate field name '{}'", field.name),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldType, ProcedureCategory};

    fn blood_draw() -> NewMasterProcedure {
        NewMasterProcedure {
            name: "Blood Draw".into(),
            category: ProcedureCategory::SampleCollection,
            description: "Submandibular bleed".into(),
            default_cost: Decimal::from(50),
            currency: None,
            parent_id: None,
            input_fields: vec![
                NewField::new("volume", "Volume", FieldType::Number)
                    .mandatory()
                    .with_units("uL"),
                NewField::new("anticoagulant", "Anticoagulant", FieldType::Dropdown)
                    .with_options(["K2EDTA", "Li-Heparin"]),
            ],
        }
    }

    #[test]
    fn test_create_defaults_currency() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);

        let procedure = catalog.create_master_procedure(blood_draw()).unwrap();
        assert_eq!(procedure.currency, "USD");
        assert_eq!(catalog.list_master_procedures().unwrap(), vec![procedure]);
    }

    #[test]
    fn test_configured_default_currency() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db).with_default_currency("CHF");

        let procedure = catalog.create_master_procedure(blood_draw()).unwrap();
        assert_eq!(procedure.currency, "CHF");
    }

    #[test]
    fn test_choice_field_without_options_rejected() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);

        let mut new = blood_draw();
        new.input_fields
            .push(NewField::new("hemolysis", "Hemolysis", FieldType::Radio));
        let err = catalog.create_master_procedure(new).unwrap_err();
        assert_eq!(err.field(), Some("input_fields[2].options"));
        assert!(catalog.list_master_procedures().unwrap().is_empty());
    }

    #[test]
    fn test_negative_cost_rejected() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);

        let mut new = blood_draw();
        new.default_cost = Decimal::from(-1);
        let err = catalog.create_master_procedure(new).unwrap_err();
        assert_eq!(err.field(), Some("default_cost"));

        let mut free = blood_draw();
        free.default_cost = Decimal::ZERO;
        assert!(catalog.create_master_procedure(free).is_ok());
    }

    #[test]
    fn test_blank_label_and_duplicate_names_rejected() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);

        let mut new = blood_draw();
        new.input_fields[0].label = " ".into();
        assert_eq!(
            catalog.create_master_procedure(new).unwrap_err().field(),
            Some("input_fields[0].label")
        );

        let mut new = blood_draw();
        new.input_fields[1].name = "volume".into();
        assert_eq!(
            catalog.create_master_procedure(new).unwrap_err().field(),
            Some("input_fields[1].name")
        );
    }

    #[test]
    fn test_parent_must_exist() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);
        let parent = catalog.create_master_procedure(blood_draw()).unwrap();

        let mut child = blood_draw();
        child.name = "Blood Draw (terminal)".into();
        child.parent_id = Some(parent.id.clone());
        let child = catalog.create_master_procedure(child).unwrap();
        assert_eq!(
            catalog.get_master_procedure(&child.id).unwrap().parent_id,
            Some(parent.id)
        );

        let mut orphan = blood_draw();
        orphan.parent_id = Some("missing".into());
        let err = catalog.create_master_procedure(orphan).unwrap_err();
        assert_eq!(err.field(), Some("parent_id"));
        assert_eq!(catalog.list_master_procedures().unwrap().len(), 2);
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);

        for name in ["Necropsy", "Body Weight", "Blood Draw"] {
            let mut new = blood_draw();
            new.name = name.into();
            catalog.create_master_procedure(new).unwrap();
        }
        let names: Vec<_> = catalog
            .list_master_procedures()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Necropsy", "Body Weight", "Blood Draw"]);
    }

    #[test]
    fn test_update_validates_and_persists() {
        let db = Database::open_in_memory().unwrap();
        let catalog = ProcedureCatalog::new(&db);
        let procedure = catalog.create_master_procedure(blood_draw()).unwrap();

        let bad = MasterProcedureUpdate {
            input_fields: Some(vec![NewField::new("x", "X", FieldType::Checkbox)]),
            ..Default::default()
        };
        assert!(catalog.update_master_procedure(&procedure.id, bad).is_err());

        let updated = catalog
            .update_master_procedure(
                &procedure.id,
                MasterProcedureUpdate {
                    default_cost: Some(Decimal::from(65)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.default_cost, Decimal::from(65));
        assert_eq!(
            catalog.get_master_procedure(&procedure.id).unwrap().default_cost,
            Decimal::from(65)
        );
        assert!(matches!(
            catalog.update_master_procedure("missing", MasterProcedureUpdate::default()),
            Err(CoreError::NotFound { .. })
        ));
    }
}
