//! Visit and visit-procedure database operations.

use rusqlite::{params, OptionalExtension};

use super::{date_to_sql, map_unique, parse_date, parse_label, Database, DbError, DbResult};
use crate::models::{Visit, VisitProcedure, VisitStatus};

const VISIT_COLUMNS: &str = "id, study_id, name, label, description, planned_timepoint, \
                             planned_date, actual_date, cohort_ids, status, created_at, updated_at";

impl Database {
    /// Insert a new visit.
    pub fn insert_visit(&self, visit: &Visit) -> DbResult<()> {
        let cohort_ids_json = serde_json::to_string(&visit.cohort_ids)?;

        self.conn.execute(
            r#"
            INSERT INTO visits (
                id, study_id, name, label, description, planned_timepoint,
                planned_date, actual_date, cohort_ids, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                visit.id,
                visit.study_id,
                visit.name,
                visit.label,
                visit.description,
                visit.planned_timepoint,
                date_to_sql(visit.planned_date),
                date_to_sql(visit.actual_date),
                cohort_ids_json,
                visit.status.as_str(),
                visit.created_at,
                visit.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update an existing visit.
    pub fn update_visit(&self, visit: &Visit) -> DbResult<bool> {
        let cohort_ids_json = serde_json::to_string(&visit.cohort_ids)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE visits SET
                name = ?2,
                label = ?3,
                description = ?4,
                planned_timepoint = ?5,
                planned_date = ?6,
                actual_date = ?7,
                cohort_ids = ?8,
                status = ?9,
                updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                visit.id,
                visit.name,
                visit.label,
                visit.description,
                visit.planned_timepoint,
                date_to_sql(visit.planned_date),
                date_to_sql(visit.actual_date),
                cohort_ids_json,
                visit.status.as_str(),
                visit.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Set only the status of a visit.
    pub fn update_visit_status(&self, id: &str, status: VisitStatus, updated_at: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE visits SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), updated_at],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: &str) -> DbResult<Option<Visit>> {
        self.conn
            .query_row(
                &format!("SELECT {VISIT_COLUMNS} FROM visits WHERE id = ?"),
                [id],
                VisitRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List a study's visits in creation order. Timeline ordering is applied
    /// by the scheduler, not here.
    pub fn list_visits_by_study(&self, study_id: &str) -> DbResult<Vec<Visit>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VISIT_COLUMNS} FROM visits WHERE study_id = ? ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([study_id], VisitRow::from_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }

    // =========================================================================
    // Visit procedures
    // =========================================================================

    /// Link a study procedure to a visit. Linking the same pair twice yields
    /// `DbError::Duplicate`.
    pub fn insert_visit_procedure(&self, link: &VisitProcedure) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO visit_procedures (
                    id, visit_id, study_procedure_id, sequence_order, assigned_at
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    link.id,
                    link.visit_id,
                    link.study_procedure_id,
                    link.sequence_order,
                    link.assigned_at,
                ],
            )
            .map_err(|e| {
                map_unique(
                    e,
                    format!(
                        "study procedure {} already assigned to visit {}",
                        link.study_procedure_id, link.visit_id
                    ),
                )
            })?;
        Ok(())
    }

    /// Links of a visit in assignment order.
    pub fn list_visit_procedures(&self, visit_id: &str) -> DbResult<Vec<VisitProcedure>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, visit_id, study_procedure_id, sequence_order, assigned_at
            FROM visit_procedures
            WHERE visit_id = ?
            ORDER BY rowid
            "#,
        )?;
        let rows = stmt.query_map([visit_id], |row| {
            Ok(VisitProcedure {
                id: row.get(0)?,
                visit_id: row.get(1)?,
                study_procedure_id: row.get(2)?,
                sequence_order: row.get(3)?,
                assigned_at: row.get(4)?,
            })
        })?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: String,
    study_id: String,
    name: String,
    label: String,
    description: Option<String>,
    planned_timepoint: String,
    planned_date: Option<String>,
    actual_date: Option<String>,
    cohort_ids: String,
    status: String,
    created_at: String,
    updated_at: String,
}

impl VisitRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            study_id: row.get(1)?,
            name: row.get(2)?,
            label: row.get(3)?,
            description: row.get(4)?,
            planned_timepoint: row.get(5)?,
            planned_date: row.get(6)?,
            actual_date: row.get(7)?,
            cohort_ids: row.get(8)?,
            status: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl TryFrom<VisitRow> for Visit {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        Ok(Visit {
            id: row.id,
            study_id: row.study_id,
            name: row.name,
            label: row.label,
            description: row.description,
            planned_timepoint: row.planned_timepoint,
            planned_date: parse_date(row.planned_date)?,
            actual_date: parse_date(row.actual_date)?,
            cohort_ids: serde_json::from_str(&row.cohort_ids)?,
            status: parse_label(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
