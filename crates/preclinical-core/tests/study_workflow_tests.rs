//! End-to-end study workflow tests against an in-memory database.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use preclinical_core::db::Database;
use preclinical_core::models::{
    MasterProcedureUpdate, NewAnimal, NewCohort, NewMasterProcedure, NewStudy, NewVisit,
    ProcedureCategory, Sex, VisitStatus,
};
use preclinical_core::{
    effective_cost, AnimalRegistry, CohortAssignment, CoreError, CostResolver, ProcedureCatalog,
    ProcedureImporter, StudyRegistry, VisitScheduler,
};

fn make_study(db: &Database, name: &str) -> String {
    StudyRegistry::new(db)
        .create_study(NewStudy {
            name: name.to_string(),
            description: "28-day oral toxicity".to_string(),
            principal_investigator: "Dr. Smith".to_string(),
            ..Default::default()
        })
        .unwrap()
        .id
}

fn make_master(db: &Database, name: &str, cost: &str) -> String {
    ProcedureCatalog::new(db)
        .create_master_procedure(NewMasterProcedure {
            name: name.to_string(),
            category: ProcedureCategory::SampleCollection,
            description: format!("{} procedure", name),
            default_cost: Decimal::from_str(cost).unwrap(),
            currency: Some("USD".to_string()),
            parent_id: None,
            input_fields: vec![],
        })
        .unwrap()
        .id
}

fn make_cohort(db: &Database, study_id: &str, planned: u32) -> String {
    CohortAssignment::new(db)
        .create_cohort(
            study_id,
            NewCohort {
                name: "Group 1".to_string(),
                description: "Control".to_string(),
                criteria: None,
                planned_animal_count: planned,
            },
        )
        .unwrap()
        .id
}

fn make_animal(db: &Database, label: &str) -> String {
    AnimalRegistry::new(db)
        .register_animal(NewAnimal::new(label, "Rat", Sex::Male))
        .unwrap()
        .id
}

#[test]
fn test_blood_draw_import_scenario() {
    let db = Database::open_in_memory().unwrap();
    let study = make_study(&db, "S");
    let master = make_master(&db, "Blood Draw", "50");
    let importer = ProcedureImporter::new(&db);

    let imported = importer.import_procedure(&study, &master, None).unwrap();
    assert_eq!(imported.default_cost, Decimal::from(50));
    assert_eq!(imported.study_specific_cost, None);
    assert_eq!(effective_cost(&imported), Decimal::from(50));

    let again = importer.import_procedure(&study, &master, None);
    assert!(matches!(again, Err(CoreError::Conflict(_))));
    assert_eq!(db.count_study_procedures(&study).unwrap(), 1);

    // A second study imports the same master with an override
    let other = make_study(&db, "S2");
    let overridden = importer
        .import_procedure(&other, &master, Some(Decimal::from(75)))
        .unwrap();
    assert_eq!(effective_cost(&overridden), Decimal::from(75));
    assert_eq!(overridden.default_cost, Decimal::from(50));
}

#[test]
fn test_snapshot_isolation_after_catalog_edit() {
    let db = Database::open_in_memory().unwrap();
    let study = make_study(&db, "S");
    let master = make_master(&db, "Blood Draw", "50");
    let imported = ProcedureImporter::new(&db)
        .import_procedure(&study, &master, None)
        .unwrap();

    ProcedureCatalog::new(&db)
        .update_master_procedure(
            &master,
            MasterProcedureUpdate {
                name: Some("Blood Draw (revised)".to_string()),
                default_cost: Some(Decimal::from(65)),
                ..Default::default()
            },
        )
        .unwrap();

    let reloaded = ProcedureImporter::new(&db)
        .get_study_procedure(&imported.id)
        .unwrap();
    assert_eq!(reloaded.default_cost, Decimal::from(50));
    assert_eq!(reloaded.name, "Blood Draw");
    assert_eq!(reloaded, imported);
}

#[test]
fn test_cohort_over_assignment_scenario() {
    let db = Database::open_in_memory().unwrap();
    let study = make_study(&db, "S");
    let cohort = make_cohort(&db, &study, 2);
    let (a, b, c) = (
        make_animal(&db, "A"),
        make_animal(&db, "B"),
        make_animal(&db, "C"),
    );
    let assignment = CohortAssignment::new(&db);

    assignment.assign_animal(&cohort, &a).unwrap();
    let after_repeat = assignment.assign_animal(&cohort, &a).unwrap();
    assert_eq!(after_repeat.animal_ids, vec![a.clone()]);

    let full = assignment.assign_animal(&cohort, &b).unwrap();
    assert_eq!(full.animal_count(), 2);
    assert_eq!(full.fill_percent_clamped(), 100.0);

    let over = assignment.assign_animal(&cohort, &c).unwrap();
    assert_eq!(over.animal_count(), 3);
    assert_eq!(over.fill_percent_clamped(), 100.0);
    assert_eq!(over.fill_rate(), 1.5);
}

#[test]
fn test_visit_requires_cohorts() {
    let db = Database::open_in_memory().unwrap();
    let study = make_study(&db, "S");
    let result = VisitScheduler::new(&db).create_visit(
        &study,
        NewVisit {
            name: "Baseline".to_string(),
            label: "D0".to_string(),
            planned_timepoint: "Day 0".to_string(),
            cohort_ids: vec![],
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[test]
fn test_full_study_cost() {
    let db = Database::open_in_memory().unwrap();
    let study = make_study(&db, "S");
    let cohort = make_cohort(&db, &study, 3);
    for label in ["R1", "R2", "R3"] {
        let animal = make_animal(&db, label);
        CohortAssignment::new(&db).assign_animal(&cohort, &animal).unwrap();
    }

    let importer = ProcedureImporter::new(&db);
    let bleed = importer
        .import_procedure(&study, &make_master(&db, "Blood Draw", "50"), Some(Decimal::ZERO))
        .unwrap();
    let weight = importer
        .import_procedure(&study, &make_master(&db, "Body Weight", "5.25"), None)
        .unwrap();

    let scheduler = VisitScheduler::new(&db);
    let mut visit_ids = Vec::new();
    for (day, date) in [(28, (2026, 2, 2)), (1, (2026, 1, 6))] {
        let visit = scheduler
            .create_visit(
                &study,
                NewVisit {
                    name: format!("Day {} visit", day),
                    label: format!("D{}", day),
                    planned_timepoint: format!("Day {}", day),
                    planned_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
                    cohort_ids: vec![cohort.clone()],
                    ..Default::default()
                },
            )
            .unwrap();
        scheduler.assign_procedure(&visit.id, &bleed.id, Some(1)).unwrap();
        scheduler.assign_procedure(&visit.id, &weight.id, Some(2)).unwrap();
        visit_ids.push(visit.id);
    }
    scheduler
        .update_status(&visit_ids[0], VisitStatus::Completed)
        .unwrap();

    let resolver = CostResolver::new(&db);
    let visit_cost = resolver.visit_cost(&visit_ids[0]).unwrap();
    assert_eq!(visit_cost.total, Decimal::from_str("5.25").unwrap());
    assert_eq!(visit_cost.projected_total, Decimal::from_str("15.75").unwrap());

    let study_cost = resolver.study_cost(&study).unwrap();
    assert_eq!(study_cost.total, Decimal::from_str("10.50").unwrap());
    assert_eq!(study_cost.projected_total, Decimal::from_str("31.50").unwrap());
    // Timeline order: the Day 1 visit comes first
    assert_eq!(study_cost.visits[0].visit_id, visit_ids[1]);
}
