//! Study database operations.

use rusqlite::{params, OptionalExtension};

use super::{date_to_sql, parse_date, parse_label, Database, DbError, DbResult};
use crate::models::{Study, StudyStatus};

const STUDY_COLUMNS: &str = "id, name, description, principal_investigator, start_date, end_date, \
                             status, created_at, updated_at";

impl Database {
    /// Insert a new study.
    pub fn insert_study(&self, study: &Study) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO studies (
                id, name, description, principal_investigator, start_date,
                end_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                study.id,
                study.name,
                study.description,
                study.principal_investigator,
                date_to_sql(study.start_date),
                date_to_sql(study.end_date),
                study.status.as_str(),
                study.created_at,
                study.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Get a study by ID.
    pub fn get_study(&self, id: &str) -> DbResult<Option<Study>> {
        self.conn
            .query_row(
                &format!("SELECT {STUDY_COLUMNS} FROM studies WHERE id = ?"),
                [id],
                StudyRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Check whether a study exists.
    pub fn study_exists(&self, id: &str) -> DbResult<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM studies WHERE id = ?", [id], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// List all studies in creation order.
    pub fn list_studies(&self) -> DbResult<Vec<Study>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {STUDY_COLUMNS} FROM studies ORDER BY rowid"))?;
        let rows = stmt.query_map([], StudyRow::from_row)?;

        let mut studies = Vec::new();
        for row in rows {
            studies.push(row?.try_into()?);
        }
        Ok(studies)
    }

    /// Set a study's status.
    pub fn update_study_status(&self, id: &str, status: StudyStatus, updated_at: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE studies SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), updated_at],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct StudyRow {
    id: String,
    name: String,
    description: String,
    principal_investigator: String,
    start_date: Option<String>,
    end_date: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl StudyRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            principal_investigator: row.get(3)?,
            start_date: row.get(4)?,
            end_date: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl TryFrom<StudyRow> for Study {
    type Error = DbError;

    fn try_from(row: StudyRow) -> Result<Self, Self::Error> {
        Ok(Study {
            id: row.id,
            name: row.name,
            description: row.description,
            principal_investigator: row.principal_investigator,
            start_date: parse_date(row.start_date)?,
            end_date: parse_date(row.end_date)?,
            status: parse_label(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewStudy;
    use chrono::NaiveDate;

    fn make_study(name: &str) -> Study {
        Study::from_new(NewStudy {
            name: name.into(),
            description: "Repeat dose toxicity".into(),
            principal_investigator: "Dr. Lindqvist".into(),
            start_date: NaiveDate::from_ymd_opt(2026, 1, 5),
            ..Default::default()
        })
    }

    #[test]
    fn test_insert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let study = make_study("TOX-001");
        db.insert_study(&study).unwrap();

        let retrieved = db.get_study(&study.id).unwrap().unwrap();
        assert_eq!(retrieved, study);
        assert!(db.study_exists(&study.id).unwrap());
        assert!(db.get_study("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        for name in ["B", "A", "C"] {
            db.insert_study(&make_study(name)).unwrap();
        }
        let names: Vec<_> = db.list_studies().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn test_update_status() {
        let db = Database::open_in_memory().unwrap();
        let study = make_study("TOX-001");
        db.insert_study(&study).unwrap();

        assert!(db.update_study_status(&study.id, StudyStatus::OnHold, "later").unwrap());
        let retrieved = db.get_study(&study.id).unwrap().unwrap();
        assert_eq!(retrieved.status, StudyStatus::OnHold);
        assert!(!db.update_study_status("missing", StudyStatus::Active, "later").unwrap());
    }
}
