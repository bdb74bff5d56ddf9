//! Master procedure and study procedure database operations.

use rusqlite::{params, OptionalExtension};

use super::{decimal_to_sql, map_unique, parse_decimal, parse_label, Database, DbError, DbResult};
use crate::models::{Field, MasterProcedure, StudyProcedure};

const MASTER_COLUMNS: &str = "id, name, category, description, default_cost, currency, \
                              parent_id, input_fields, created_at, updated_at";

const STUDY_PROCEDURE_COLUMNS: &str = "id, study_id, master_procedure_id, name, category, \
                                       description, currency, default_cost, input_fields, \
                                       study_specific_cost, imported_at";

impl Database {
    // =========================================================================
    // Master procedures
    // =========================================================================

    /// Insert a new master procedure.
    pub fn insert_master_procedure(&self, procedure: &MasterProcedure) -> DbResult<()> {
        let fields_json = serde_json::to_string(&procedure.input_fields)?;

        self.conn.execute(
            r#"
            INSERT INTO master_procedures (
                id, name, category, description, default_cost, currency,
                parent_id, input_fields, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                procedure.id,
                procedure.name,
                procedure.category.as_str(),
                procedure.description,
                decimal_to_sql(&procedure.default_cost),
                procedure.currency,
                procedure.parent_id,
                fields_json,
                procedure.created_at,
                procedure.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite a master procedure definition. Imported snapshots live in
    /// their own table and are not touched.
    pub fn update_master_procedure(&self, procedure: &MasterProcedure) -> DbResult<bool> {
        let fields_json = serde_json::to_string(&procedure.input_fields)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE master_procedures SET
                name = ?2,
                category = ?3,
                description = ?4,
                default_cost = ?5,
                currency = ?6,
                input_fields = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                procedure.id,
                procedure.name,
                procedure.category.as_str(),
                procedure.description,
                decimal_to_sql(&procedure.default_cost),
                procedure.currency,
                fields_json,
                procedure.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a master procedure by ID.
    pub fn get_master_procedure(&self, id: &str) -> DbResult<Option<MasterProcedure>> {
        self.conn
            .query_row(
                &format!("SELECT {MASTER_COLUMNS} FROM master_procedures WHERE id = ?"),
                [id],
                MasterRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List the catalog in insertion order.
    pub fn list_master_procedures(&self) -> DbResult<Vec<MasterProcedure>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MASTER_COLUMNS} FROM master_procedures ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([], MasterRow::from_row)?;

        let mut procedures = Vec::new();
        for row in rows {
            procedures.push(row?.try_into()?);
        }
        Ok(procedures)
    }

    // =========================================================================
    // Study procedures
    // =========================================================================

    /// Insert an imported snapshot. A second snapshot of the same
    /// (study, master) pair yields `DbError::Duplicate` and writes nothing.
    pub fn insert_study_procedure(&self, procedure: &StudyProcedure) -> DbResult<()> {
        let fields_json = serde_json::to_string(&procedure.input_fields)?;

        self.conn
            .execute(
                r#"
                INSERT INTO study_procedures (
                    id, study_id, master_procedure_id, name, category, description,
                    currency, default_cost, input_fields, study_specific_cost, imported_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
                params![
                    procedure.id,
                    procedure.study_id,
                    procedure.master_procedure_id,
                    procedure.name,
                    procedure.category.as_str(),
                    procedure.description,
                    procedure.currency,
                    decimal_to_sql(&procedure.default_cost),
                    fields_json,
                    procedure.study_specific_cost.as_ref().map(decimal_to_sql),
                    procedure.imported_at,
                ],
            )
            .map_err(|e| {
                map_unique(
                    e,
                    format!(
                        "master procedure {} already imported into study {}",
                        procedure.master_procedure_id, procedure.study_id
                    ),
                )
            })?;
        Ok(())
    }

    /// Get a study procedure by ID.
    pub fn get_study_procedure(&self, id: &str) -> DbResult<Option<StudyProcedure>> {
        self.conn
            .query_row(
                &format!("SELECT {STUDY_PROCEDURE_COLUMNS} FROM study_procedures WHERE id = ?"),
                [id],
                StudyProcedureRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List procedures imported into a study, in import order.
    pub fn list_study_procedures(&self, study_id: &str) -> DbResult<Vec<StudyProcedure>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STUDY_PROCEDURE_COLUMNS} FROM study_procedures WHERE study_id = ? ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([study_id], StudyProcedureRow::from_row)?;

        let mut procedures = Vec::new();
        for row in rows {
            procedures.push(row?.try_into()?);
        }
        Ok(procedures)
    }

    /// Count procedures imported into a study.
    pub fn count_study_procedures(&self, study_id: &str) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM study_procedures WHERE study_id = ?",
            [study_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Intermediate row struct for database mapping.
struct MasterRow {
    id: String,
    name: String,
    category: String,
    description: String,
    default_cost: String,
    currency: String,
    parent_id: Option<String>,
    input_fields: String,
    created_at: String,
    updated_at: String,
}

impl MasterRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            description: row.get(3)?,
            default_cost: row.get(4)?,
            currency: row.get(5)?,
            parent_id: row.get(6)?,
            input_fields: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<MasterRow> for MasterProcedure {
    type Error = DbError;

    fn try_from(row: MasterRow) -> Result<Self, Self::Error> {
        let input_fields: Vec<Field> = serde_json::from_str(&row.input_fields)?;

        Ok(MasterProcedure {
            id: row.id,
            name: row.name,
            category: parse_label(&row.category)?,
            description: row.description,
            default_cost: parse_decimal(&row.default_cost)?,
            currency: row.currency,
            parent_id: row.parent_id,
            input_fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Intermediate row struct for database mapping.
struct StudyProcedureRow {
    id: String,
    study_id: String,
    master_procedure_id: String,
    name: String,
    category: String,
    description: String,
    currency: String,
    default_cost: String,
    input_fields: String,
    study_specific_cost: Option<String>,
    imported_at: String,
}

impl StudyProcedureRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            study_id: row.get(1)?,
            master_procedure_id: row.get(2)?,
            name: row.get(3)?,
            category: row.get(4)?,
            description: row.get(5)?,
            currency: row.get(6)?,
            default_cost: row.get(7)?,
            input_fields: row.get(8)?,
            study_specific_cost: row.get(9)?,
            imported_at: row.get(10)?,
        })
    }
}

impl TryFrom<StudyProcedureRow> for StudyProcedure {
    type Error = DbError;

    fn try_from(row: StudyProcedureRow) -> Result<Self, Self::Error> {
        let input_fields: Vec<Field> = serde_json::from_str(&row.input_fields)?;

        Ok(StudyProcedure {
            id: row.id,
            study_id: row.study_id,
            master_procedure_id: row.master_procedure_id,
            name: row.name,
            category: parse_label(&row.category)?,
            description: row.description,
            currency: row.currency,
            default_cost: parse_decimal(&row.default_cost)?,
            input_fields,
            study_specific_cost: row
                .study_specific_cost
                .as_deref()
                .map(parse_decimal)
                .transpose()?,
            imported_at: row.imported_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FieldType, MasterProcedureUpdate, NewField, NewMasterProcedure, NewStudy,
        ProcedureCategory, Study,
    };
    use rust_decimal::Decimal;

    fn setup_db() -> (Database, Study) {
        let db = Database::open_in_memory().unwrap();
        let study = Study::from_new(NewStudy {
            name: "PK-2".into(),
            description: "Single dose PK".into(),
            principal_investigator: "Dr. Moreau".into(),
            ..Default::default()
        });
        db.insert_study(&study).unwrap();
        (db, study)
    }

    fn make_master(name: &str, cost: i64) -> MasterProcedure {
        let mut rules = serde_json::Map::new();
        rules.insert("min".into(), serde_json::json!(0));
        let mut volume = NewField::new("volume", "Volume", FieldType::Number).with_units("uL");
        volume.validation_rules = Some(rules);

        MasterProcedure::from_new(
            NewMasterProcedure {
                name: name.into(),
                category: ProcedureCategory::SampleCollection,
                description: "Collect plasma".into(),
                default_cost: Decimal::from(cost),
                currency: None,
                parent_id: None,
                input_fields: vec![
                    volume,
                    NewField::new("tube", "Tube", FieldType::Radio).with_options(["EDTA", "Heparin"]),
                ],
            },
            "USD".into(),
        )
    }

    #[test]
    fn test_master_round_trip() {
        let (db, _) = setup_db();
        let master = make_master("Blood Draw", 50);
        db.insert_master_procedure(&master).unwrap();

        let retrieved = db.get_master_procedure(&master.id).unwrap().unwrap();
        assert_eq!(retrieved, master);
        assert_eq!(retrieved.input_fields[1].options, vec!["EDTA", "Heparin"]);
    }

    #[test]
    fn test_master_update_leaves_snapshot_alone() {
        let (db, study) = setup_db();
        let mut master = make_master("Blood Draw", 50);
        db.insert_master_procedure(&master).unwrap();

        let snapshot = StudyProcedure::snapshot(study.id.clone(), &master, None);
        db.insert_study_procedure(&snapshot).unwrap();

        master.apply(MasterProcedureUpdate {
            default_cost: Some(Decimal::from(99)),
            ..Default::default()
        });
        assert!(db.update_master_procedure(&master).unwrap());

        let stored = db.get_study_procedure(&snapshot.id).unwrap().unwrap();
        assert_eq!(stored.default_cost, Decimal::from(50));
        let stored_master = db.get_master_procedure(&master.id).unwrap().unwrap();
        assert_eq!(stored_master.default_cost, Decimal::from(99));
    }

    #[test]
    fn test_duplicate_import_rejected() {
        let (db, study) = setup_db();
        let master = make_master("Blood Draw", 50);
        db.insert_master_procedure(&master).unwrap();

        let first = StudyProcedure::snapshot(study.id.clone(), &master, None);
        db.insert_study_procedure(&first).unwrap();

        let second = StudyProcedure::snapshot(study.id.clone(), &master, Some(Decimal::from(75)));
        let result = db.insert_study_procedure(&second);
        assert!(matches!(result, Err(DbError::Duplicate(_))));
        assert_eq!(db.count_study_procedures(&study.id).unwrap(), 1);
    }

    #[test]
    fn test_zero_override_persists_as_set() {
        let (db, study) = setup_db();
        let master = make_master("Necropsy", 300);
        db.insert_master_procedure(&master).unwrap();

        let snapshot = StudyProcedure::snapshot(study.id.clone(), &master, Some(Decimal::ZERO));
        db.insert_study_procedure(&snapshot).unwrap();

        let stored = db.get_study_procedure(&snapshot.id).unwrap().unwrap();
        assert_eq!(stored.study_specific_cost, Some(Decimal::ZERO));
    }

    #[test]
    fn test_list_by_study() {
        let (db, study) = setup_db();
        for (name, cost) in [("Blood Draw", 50), ("Body Weight", 5)] {
            let master = make_master(name, cost);
            db.insert_master_procedure(&master).unwrap();
            db.insert_study_procedure(&StudyProcedure::snapshot(study.id.clone(), &master, None))
                .unwrap();
        }
        let names: Vec<_> = db
            .list_study_procedures(&study.id)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Blood Draw", "Body Weight"]);
        assert!(db.list_study_procedures("other").unwrap().is_empty());
    }
}
