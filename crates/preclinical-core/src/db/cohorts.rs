//! Cohort and membership database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::Cohort;

const COHORT_COLUMNS: &str = "id, study_id, name, description, criteria, planned_animal_count, \
                              created_at, updated_at";

impl Database {
    /// Insert a new cohort. Members are stored separately.
    pub fn insert_cohort(&self, cohort: &Cohort) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO cohorts (
                id, study_id, name, description, criteria,
                planned_animal_count, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                cohort.id,
                cohort.study_id,
                cohort.name,
                cohort.description,
                cohort.criteria,
                cohort.planned_animal_count,
                cohort.created_at,
                cohort.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Update cohort attributes (not membership).
    pub fn update_cohort(&self, cohort: &Cohort) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE cohorts SET
                name = ?2,
                description = ?3,
                criteria = ?4,
                planned_animal_count = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
            params![
                cohort.id,
                cohort.name,
                cohort.description,
                cohort.criteria,
                cohort.planned_animal_count,
                cohort.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a cohort with its members.
    pub fn get_cohort(&self, id: &str) -> DbResult<Option<Cohort>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {COHORT_COLUMNS} FROM cohorts WHERE id = ?"),
                [id],
                CohortRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => {
                let members = self.list_cohort_members(&row.id)?;
                Ok(Some(row.into_cohort(members)?))
            }
            None => Ok(None),
        }
    }

    /// List a study's cohorts in creation order, with members.
    pub fn list_cohorts_by_study(&self, study_id: &str) -> DbResult<Vec<Cohort>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COHORT_COLUMNS} FROM cohorts WHERE study_id = ? ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([study_id], CohortRow::from_row)?;

        let mut cohorts = Vec::new();
        for row in rows {
            let row = row?;
            let members = self.list_cohort_members(&row.id)?;
            cohorts.push(row.into_cohort(members)?);
        }
        Ok(cohorts)
    }

    /// Member animal ids in assignment order.
    pub fn list_cohort_members(&self, cohort_id: &str) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT animal_id FROM cohort_animals WHERE cohort_id = ? ORDER BY rowid")?;
        let rows = stmt.query_map([cohort_id], |row| row.get(0))?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    /// Add an animal to a cohort. Returns `false` if it was already a member.
    pub fn add_cohort_member(&self, cohort_id: &str, animal_id: &str, at: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO cohort_animals (cohort_id, animal_id, assigned_at) VALUES (?1, ?2, ?3)",
            params![cohort_id, animal_id, at],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE cohorts SET updated_at = ?2 WHERE id = ?1",
                params![cohort_id, at],
            )?;
        }
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// Remove an animal from a cohort. Returns `false` if it was not a member.
    pub fn remove_cohort_member(&self, cohort_id: &str, animal_id: &str, at: &str) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute(
            "DELETE FROM cohort_animals WHERE cohort_id = ?1 AND animal_id = ?2",
            params![cohort_id, animal_id],
        )?;
        if removed > 0 {
            tx.execute(
                "UPDATE cohorts SET updated_at = ?2 WHERE id = ?1",
                params![cohort_id, at],
            )?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }
}

/// Intermediate row struct for database mapping.
struct CohortRow {
    id: String,
    study_id: String,
    name: String,
    description: String,
    criteria: Option<String>,
    planned_animal_count: i64,
    created_at: String,
    updated_at: String,
}

impl CohortRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            study_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            criteria: row.get(4)?,
            planned_animal_count: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_cohort(self, animal_ids: Vec<String>) -> DbResult<Cohort> {
        let planned_animal_count = u32::try_from(self.planned_animal_count).map_err(|_| {
            DbError::Decode(format!(
                "planned_animal_count {} out of range",
                self.planned_animal_count
            ))
        })?;

        Ok(Cohort {
            id: self.id,
            study_id: self.study_id,
            name: self.name,
            description: self.description,
            criteria: self.criteria,
            planned_animal_count,
            animal_ids,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Animal, NewAnimal, NewCohort, NewStudy, Sex, Study};

    fn setup_db() -> (Database, Cohort, Vec<Animal>) {
        let db = Database::open_in_memory().unwrap();
        let study = Study::from_new(NewStudy {
            name: "EFF-9".into(),
            description: "Efficacy".into(),
            principal_investigator: "Dr. Ito".into(),
            ..Default::default()
        });
        db.insert_study(&study).unwrap();

        let cohort = Cohort::from_new(
            study.id,
            NewCohort {
                name: "Vehicle".into(),
                description: "Control group".into(),
                criteria: Some("Males 8-10 weeks".into()),
                planned_animal_count: 2,
            },
        );
        db.insert_cohort(&cohort).unwrap();

        let animals: Vec<Animal> = ["A", "B", "C"]
            .iter()
            .map(|label| Animal::from_new(NewAnimal::new(*label, "Mouse", Sex::Male)))
            .collect();
        for animal in &animals {
            db.insert_animal(animal).unwrap();
        }
        (db, cohort, animals)
    }

    #[test]
    fn test_membership_is_a_set() {
        let (db, cohort, animals) = setup_db();

        assert!(db.add_cohort_member(&cohort.id, &animals[0].id, "t1").unwrap());
        assert!(!db.add_cohort_member(&cohort.id, &animals[0].id, "t2").unwrap());
        assert!(db.add_cohort_member(&cohort.id, &animals[1].id, "t3").unwrap());

        let stored = db.get_cohort(&cohort.id).unwrap().unwrap();
        assert_eq!(stored.animal_ids, vec![animals[0].id.clone(), animals[1].id.clone()]);
        assert_eq!(stored.updated_at, "t3");
    }

    #[test]
    fn test_remove_member() {
        let (db, cohort, animals) = setup_db();
        db.add_cohort_member(&cohort.id, &animals[0].id, "t1").unwrap();

        assert!(db.remove_cohort_member(&cohort.id, &animals[0].id, "t2").unwrap());
        assert!(!db.remove_cohort_member(&cohort.id, &animals[0].id, "t3").unwrap());
        assert!(db.list_cohort_members(&cohort.id).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_animal_rejected_by_foreign_key() {
        let (db, cohort, _) = setup_db();
        assert!(db.add_cohort_member(&cohort.id, "ghost", "t1").is_err());
    }

    #[test]
    fn test_list_by_study_includes_members() {
        let (db, cohort, animals) = setup_db();
        db.add_cohort_member(&cohort.id, &animals[2].id, "t1").unwrap();

        let cohorts = db.list_cohorts_by_study(&cohort.study_id).unwrap();
        assert_eq!(cohorts.len(), 1);
        assert_eq!(cohorts[0].animal_ids, vec![animals[2].id.clone()]);
        assert_eq!(cohorts[0].criteria.as_deref(), Some("Males 8-10 weeks"));
    }
}
