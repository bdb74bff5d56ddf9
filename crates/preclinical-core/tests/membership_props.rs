//! Property tests for cohort membership.

use proptest::prelude::*;

use preclinical_core::db::Database;
use preclinical_core::models::{NewAnimal, NewCohort, NewStudy, Sex};
use preclinical_core::{AnimalRegistry, CohortAssignment, StudyRegistry};

#[derive(Debug, Clone)]
enum Op {
    Assign(usize),
    Remove(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4).prop_map(Op::Assign),
        (0usize..4).prop_map(Op::Remove),
    ]
}

proptest! {
    #[test]
    fn membership_never_duplicates(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let db = Database::open_in_memory().unwrap();
        let study = StudyRegistry::new(&db)
            .create_study(NewStudy {
                name: "P".to_string(),
                description: "prop".to_string(),
                principal_investigator: "pi".to_string(),
                ..Default::default()
            })
            .unwrap();
        let cohort = CohortAssignment::new(&db)
            .create_cohort(
                &study.id,
                NewCohort {
                    name: "C".to_string(),
                    description: "c".to_string(),
                    criteria: None,
                    planned_animal_count: 2,
                },
            )
            .unwrap();
        let animals: Vec<String> = (0..4)
            .map(|i| {
                AnimalRegistry::new(&db)
                    .register_animal(NewAnimal::new(format!("A{}", i), "Mouse", Sex::Female))
                    .unwrap()
                    .id
            })
            .collect();

        let assignment = CohortAssignment::new(&db);
        let mut expected: Vec<String> = Vec::new();
        for op in ops {
            let current = match op {
                Op::Assign(i) => {
                    if !expected.contains(&animals[i]) {
                        expected.push(animals[i].clone());
                    }
                    assignment.assign_animal(&cohort.id, &animals[i]).unwrap()
                }
                Op::Remove(i) => {
                    expected.retain(|id| id != &animals[i]);
                    assignment.remove_animal(&cohort.id, &animals[i]).unwrap()
                }
            };

            let mut deduped = current.animal_ids.clone();
            deduped.sort();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), current.animal_ids.len());
            prop_assert_eq!(&current.animal_ids, &expected);
            prop_assert!(current.fill_percent_clamped() <= 100.0);
        }
    }
}
