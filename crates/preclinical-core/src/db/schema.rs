//! SQLite schema definition.

/// Complete database schema for the preclinical core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Studies
-- ============================================================================

CREATE TABLE IF NOT EXISTS studies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    principal_investigator TEXT NOT NULL,
    start_date TEXT,                             -- YYYY-MM-DD
    end_date TEXT,                               -- YYYY-MM-DD
    status TEXT NOT NULL DEFAULT 'Planning',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================================================
-- Animal Registry
-- ============================================================================

CREATE TABLE IF NOT EXISTS animals (
    id TEXT PRIMARY KEY,
    animal_id TEXT NOT NULL UNIQUE,              -- human-facing label
    species TEXT NOT NULL,
    strain TEXT,
    sex TEXT NOT NULL CHECK (sex IN ('Male', 'Female')),
    birth_date TEXT,
    weight REAL,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Master Procedure Catalog
-- ============================================================================

CREATE TABLE IF NOT EXISTS master_procedures (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    default_cost TEXT NOT NULL,                  -- decimal as text
    currency TEXT NOT NULL DEFAULT 'USD',
    parent_id TEXT REFERENCES master_procedures(id),
    input_fields TEXT NOT NULL DEFAULT '[]',     -- JSON array of Field, ordered
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- ============================================================================
-- Cohorts
-- ============================================================================

CREATE TABLE IF NOT EXISTS cohorts (
    id TEXT PRIMARY KEY,
    study_id TEXT NOT NULL REFERENCES studies(id),
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    criteria TEXT,
    planned_animal_count INTEGER NOT NULL CHECK (planned_animal_count >= 1),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cohorts_study ON cohorts(study_id);

-- Membership set; the composite key makes assignment idempotent
CREATE TABLE IF NOT EXISTS cohort_animals (
    cohort_id TEXT NOT NULL REFERENCES cohorts(id),
    animal_id TEXT NOT NULL REFERENCES animals(id),
    assigned_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cohort_id, animal_id)
);

-- ============================================================================
-- Study Procedures (Snapshots - Immutable after import)
-- ============================================================================

CREATE TABLE IF NOT EXISTS study_procedures (
    id TEXT PRIMARY KEY,
    study_id TEXT NOT NULL REFERENCES studies(id),
    master_procedure_id TEXT NOT NULL REFERENCES master_procedures(id),
    name TEXT NOT NULL,
    category TEXT NOT NULL,
    description TEXT NOT NULL,
    currency TEXT NOT NULL,
    default_cost TEXT NOT NULL,
    input_fields TEXT NOT NULL DEFAULT '[]',
    study_specific_cost TEXT,                    -- NULL means no override
    imported_at TEXT NOT NULL,
    UNIQUE (study_id, master_procedure_id)
);

CREATE INDEX IF NOT EXISTS idx_study_procedures_study ON study_procedures(study_id);

-- ============================================================================
-- Visits
-- ============================================================================

CREATE TABLE IF NOT EXISTS visits (
    id TEXT PRIMARY KEY,
    study_id TEXT NOT NULL REFERENCES studies(id),
    name TEXT NOT NULL,
    label TEXT NOT NULL,
    description TEXT,
    planned_timepoint TEXT NOT NULL,
    planned_date TEXT,
    actual_date TEXT,
    cohort_ids TEXT NOT NULL DEFAULT '[]',       -- JSON array of cohort ids
    status TEXT NOT NULL DEFAULT 'Scheduled',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_visits_study ON visits(study_id);

CREATE TABLE IF NOT EXISTS visit_procedures (
    id TEXT PRIMARY KEY,
    visit_id TEXT NOT NULL REFERENCES visits(id),
    study_procedure_id TEXT NOT NULL REFERENCES study_procedures(id),
    sequence_order INTEGER,
    assigned_at TEXT NOT NULL,
    UNIQUE (visit_id, study_procedure_id)
);

CREATE INDEX IF NOT EXISTS idx_visit_procedures_visit ON visit_procedures(visit_id);
"#;
