//! Concurrent calls through a shared, file-backed facade.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use preclinical_core::{
    open_database, FfiNewAnimal, FfiNewCohort, FfiNewMasterProcedure, FfiNewStudy,
    PreclinicalError,
};

const WORKERS: usize = 8;

#[test]
fn test_parallel_assign_and_import_keep_single_rows() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.db").to_string_lossy().to_string();
    let core = open_database(path).unwrap();

    let study = core
        .create_study(FfiNewStudy {
            name: "Shared".to_string(),
            description: "parallel callers".to_string(),
            principal_investigator: "pi".to_string(),
            start_date: None,
            end_date: None,
            status: None,
        })
        .unwrap();
    let cohort = core
        .create_cohort(
            study.id.clone(),
            FfiNewCohort {
                name: "High dose".to_string(),
                description: "100 mg/kg".to_string(),
                criteria: None,
                planned_animal_count: 4,
            },
        )
        .unwrap();
    let animal = core
        .register_animal(FfiNewAnimal {
            animal_id: "R-042".to_string(),
            species: "Rat".to_string(),
            strain: Some("Sprague-Dawley".to_string()),
            sex: "Female".to_string(),
            birth_date: None,
            weight: Some(210.0),
        })
        .unwrap();
    let master = core
        .create_master_procedure(FfiNewMasterProcedure {
            name: "Clinical chemistry".to_string(),
            category: "Terminal Procedure".to_string(),
            description: "Serum panel".to_string(),
            default_cost: "85.50".to_string(),
            currency: None,
            parent_id: None,
            input_fields: vec![],
        })
        .unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let core = Arc::clone(&core);
            let cohort_id = cohort.id.clone();
            let animal_id = animal.id.clone();
            let study_id = study.id.clone();
            let master_id = master.id.clone();
            thread::spawn(move || {
                let assigned = core.assign_animal(cohort_id, animal_id);
                let imported = core.import_procedure(study_id, master_id, None);
                (assigned, imported)
            })
        })
        .collect();

    let mut imports_ok = 0;
    let mut conflicts = 0;
    for handle in handles {
        let (assigned, imported) = handle.join().unwrap();
        assert!(assigned.is_ok(), "assign failed: {assigned:?}");
        match imported {
            Ok(_) => imports_ok += 1,
            Err(PreclinicalError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected import error: {other:?}"),
        }
    }

    assert_eq!(imports_ok, 1);
    assert_eq!(conflicts, WORKERS - 1);

    let cohort = core.get_cohort(cohort.id).unwrap();
    assert_eq!(cohort.animal_ids, vec![animal.id]);
    assert_eq!(core.list_study_procedures(study.id).unwrap().len(), 1);
}
