//! Database layer for the preclinical core.
//!
//! One `impl Database` block per entity family. Nothing is ever deleted
//! except cohort membership rows.

mod animals;
mod cohorts;
mod procedures;
mod schema;
mod studies;
mod visits;

pub use schema::*;

use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Invalid stored value: {0}")]
    Decode(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Map UNIQUE / PRIMARY KEY violations to `DbError::Duplicate`.
pub(crate) fn map_unique(err: rusqlite::Error, what: impl Into<String>) -> DbError {
    let is_unique = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    );
    if is_unique {
        DbError::Duplicate(what.into())
    } else {
        DbError::Sqlite(err)
    }
}

pub(crate) fn decimal_to_sql(value: &Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn parse_decimal(value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|e| DbError::Decode(format!("decimal {value:?}: {e}")))
}

pub(crate) fn date_to_sql(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

pub(crate) fn parse_date(value: Option<String>) -> DbResult<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|e| DbError::Decode(format!("date {s:?}: {e}")))
        })
        .transpose()
}

pub(crate) fn parse_label<T>(value: &str) -> DbResult<T>
where
    T: FromStr<Err = crate::models::ParseLabelError>,
{
    value.parse().map_err(|e: crate::models::ParseLabelError| DbError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "studies",
            "animals",
            "master_procedures",
            "cohorts",
            "cohort_animals",
            "study_procedures",
            "visits",
            "visit_procedures",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }
    }

    #[test]
    fn test_decimal_codec() {
        let value = Decimal::new(7550, 2);
        assert_eq!(decimal_to_sql(&value), "75.5");
        assert_eq!(parse_decimal("75.5").unwrap(), value);
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_date_codec() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let stored = date_to_sql(Some(date));
        assert_eq!(stored.as_deref(), Some("2026-03-09"));
        assert_eq!(parse_date(stored).unwrap(), Some(date));
        assert_eq!(parse_date(None).unwrap(), None);
        assert!(parse_date(Some("09/03/2026".into())).is_err());
    }
}
