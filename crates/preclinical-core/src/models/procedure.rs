//! Master procedure catalog and study procedure snapshot models.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{new_id, now_rfc3339, ParseLabelError};

/// Opaque per-field validation payload, interpreted by presentation layers only.
pub type ValidationRules = serde_json::Map<String, serde_json::Value>;

/// Procedure category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProcedureCategory {
    #[serde(rename = "Sample Collection")]
    SampleCollection,
    #[serde(rename = "In-life Measurement")]
    InLifeMeasurement,
    #[serde(rename = "Terminal Procedure")]
    TerminalProcedure,
    Bioanalysis,
    Observation,
}

impl ProcedureCategory {
    pub const ALL: [ProcedureCategory; 5] = [
        ProcedureCategory::SampleCollection,
        ProcedureCategory::InLifeMeasurement,
        ProcedureCategory::TerminalProcedure,
        ProcedureCategory::Bioanalysis,
        ProcedureCategory::Observation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureCategory::SampleCollection => "Sample Collection",
            ProcedureCategory::InLifeMeasurement => "In-life Measurement",
            ProcedureCategory::TerminalProcedure => "Terminal Procedure",
            ProcedureCategory::Bioanalysis => "Bioanalysis",
            ProcedureCategory::Observation => "Observation",
        }
    }
}

impl fmt::Display for ProcedureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcedureCategory {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ParseLabelError::new("procedure category", s))
    }
}

/// Data-collection input type of a field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    TextArea,
    Number,
    Integer,
    Radio,
    Checkbox,
    Date,
    Time,
    Dropdown,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        FieldType::String,
        FieldType::TextArea,
        FieldType::Number,
        FieldType::Integer,
        FieldType::Radio,
        FieldType::Checkbox,
        FieldType::Date,
        FieldType::Time,
        FieldType::Dropdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::TextArea => "text_area",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Radio => "radio",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Dropdown => "dropdown",
        }
    }

    /// Choice-based types require a non-empty option list.
    pub fn is_choice(&self) -> bool {
        matches!(self, FieldType::Radio | FieldType::Checkbox | FieldType::Dropdown)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field_type| field_type.as_str() == s)
            .ok_or_else(|| ParseLabelError::new("field type", s))
    }
}

/// One input field of a procedure's data-collection schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub id: String,
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub is_mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<ValidationRules>,
}

/// Input for a field; the id is assigned on creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub is_mandatory: bool,
    pub units: Option<String>,
    pub options: Vec<String>,
    pub validation_rules: Option<ValidationRules>,
}

impl NewField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            is_mandatory: false,
            units: None,
            options: Vec::new(),
            validation_rules: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

impl From<NewField> for Field {
    fn from(new: NewField) -> Self {
        Self {
            id: new_id(),
            name: new.name,
            label: new.label,
            field_type: new.field_type,
            is_mandatory: new.is_mandatory,
            units: new.units,
            options: new.options,
            validation_rules: new.validation_rules,
        }
    }
}

/// A reusable, study-independent procedure definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterProcedure {
    pub id: String,
    pub name: String,
    pub category: ProcedureCategory,
    pub description: String,
    pub default_cost: Decimal,
    pub currency: String,
    /// Parent definition for hierarchical procedures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Ordered; order defines display and collection order
    pub input_fields: Vec<Field>,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a master procedure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMasterProcedure {
    pub name: String,
    pub category: ProcedureCategory,
    pub description: String,
    pub default_cost: Decimal,
    /// Falls back to the catalog's default currency
    pub currency: Option<String>,
    /// Must name an existing master procedure
    pub parent_id: Option<String>,
    pub input_fields: Vec<NewField>,
}

/// Partial master procedure update. `input_fields` replaces the whole schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MasterProcedureUpdate {
    pub name: Option<String>,
    pub category: Option<ProcedureCategory>,
    pub description: Option<String>,
    pub default_cost: Option<Decimal>,
    pub currency: Option<String>,
    pub input_fields: Option<Vec<NewField>>,
}

impl MasterProcedure {
    pub fn from_new(new: NewMasterProcedure, currency: String) -> Self {
        let now = now_rfc3339();
        Self {
            id: new_id(),
            name: new.name,
            category: new.category,
            description: new.description,
            default_cost: new.default_cost,
            currency,
            parent_id: new.parent_id,
            input_fields: new.input_fields.into_iter().map(Field::from).collect(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: MasterProcedureUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(cost) = update.default_cost {
            self.default_cost = cost;
        }
        if let Some(currency) = update.currency {
            self.currency = currency;
        }
        if let Some(fields) = update.input_fields {
            self.input_fields = fields.into_iter().map(Field::from).collect();
        }
        self.updated_at = now_rfc3339();
    }
}

/// A procedure imported into a study: a frozen copy of the master definition
/// at import time plus an optional per-study cost override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyProcedure {
    pub id: String,
    pub study_id: String,
    /// Provenance only; never followed for live data
    pub master_procedure_id: String,
    pub name: String,
    pub category: ProcedureCategory,
    pub description: String,
    pub currency: String,
    pub default_cost: Decimal,
    pub input_fields: Vec<Field>,
    /// Override; `Some(0)` is a real override, distinct from `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_specific_cost: Option<Decimal>,
    pub imported_at: String,
}

impl StudyProcedure {
    /// Snapshot a master procedure into a study. Every attribute is cloned,
    /// so later changes to `master` cannot reach the snapshot.
    pub fn snapshot(
        study_id: String,
        master: &MasterProcedure,
        study_specific_cost: Option<Decimal>,
    ) -> Self {
        Self {
            id: new_id(),
            study_id,
            master_procedure_id: master.id.clone(),
            name: master.name.clone(),
            category: master.category,
            description: master.description.clone(),
            currency: master.currency.clone(),
            default_cost: master.default_cost,
            input_fields: master.input_fields.clone(),
            study_specific_cost,
            imported_at: now_rfc3339(),
        }
    }

    pub fn has_cost_override(&self) -> bool {
        self.study_specific_cost.is_some()
    }
}
