//! Animal registry database operations.

use rusqlite::{params, OptionalExtension};

use super::{date_to_sql, map_unique, parse_date, parse_label, Database, DbError, DbResult};
use crate::models::Animal;

const ANIMAL_COLUMNS: &str = "id, animal_id, species, strain, sex, birth_date, weight, created_at";

impl Database {
    /// Insert a new animal. A taken `animal_id` label yields `DbError::Duplicate`.
    pub fn insert_animal(&self, animal: &Animal) -> DbResult<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO animals (
                    id, animal_id, species, strain, sex, birth_date, weight, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    animal.id,
                    animal.animal_id,
                    animal.species,
                    animal.strain,
                    animal.sex.as_str(),
                    date_to_sql(animal.birth_date),
                    animal.weight,
                    animal.created_at,
                ],
            )
            .map_err(|e| map_unique(e, format!("animal_id {}", animal.animal_id)))?;
        Ok(())
    }

    /// Get an animal by internal ID.
    pub fn get_animal(&self, id: &str) -> DbResult<Option<Animal>> {
        self.conn
            .query_row(
                &format!("SELECT {ANIMAL_COLUMNS} FROM animals WHERE id = ?"),
                [id],
                AnimalRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get an animal by its human-facing label.
    pub fn find_animal_by_label(&self, animal_id: &str) -> DbResult<Option<Animal>> {
        self.conn
            .query_row(
                &format!("SELECT {ANIMAL_COLUMNS} FROM animals WHERE animal_id = ?"),
                [animal_id],
                AnimalRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all animals in registration order.
    pub fn list_animals(&self) -> DbResult<Vec<Animal>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ANIMAL_COLUMNS} FROM animals ORDER BY rowid"))?;
        let rows = stmt.query_map([], AnimalRow::from_row)?;

        let mut animals = Vec::new();
        for row in rows {
            animals.push(row?.try_into()?);
        }
        Ok(animals)
    }
}

/// Intermediate row struct for database mapping.
struct AnimalRow {
    id: String,
    animal_id: String,
    species: String,
    strain: Option<String>,
    sex: String,
    birth_date: Option<String>,
    weight: Option<f64>,
    created_at: String,
}

impl AnimalRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            animal_id: row.get(1)?,
            species: row.get(2)?,
            strain: row.get(3)?,
            sex: row.get(4)?,
            birth_date: row.get(5)?,
            weight: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<AnimalRow> for Animal {
    type Error = DbError;

    fn try_from(row: AnimalRow) -> Result<Self, Self::Error> {
        Ok(Animal {
            id: row.id,
            animal_id: row.animal_id,
            species: row.species,
            strain: row.strain,
            sex: parse_label(&row.sex)?,
            birth_date: parse_date(row.birth_date)?,
            weight: row.weight,
            created_at: row.created_at,
        })
    }
}
