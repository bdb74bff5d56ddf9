//! Preclinical Study Seeder
//!
//! Seeds a database with a small repeat-dose toxicology study: catalog
//! procedures, animals, two dose cohorts, imported procedures and three
//! visits, then prints the resolved study cost.
//!
//! Usage:
//!   `cargo run --bin seed_study -- --db-path preclinical.db --animals 6`
//!
//! Without `--db-path` the path comes from `PRECLINICAL_DB_PATH` (or `.env`).

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;

use preclinical_core::models::{
    FieldType, NewAnimal, NewCohort, NewField, NewMasterProcedure, NewStudy, NewVisit,
    ProcedureCategory, Sex,
};
use preclinical_core::{
    AnimalRegistry, CohortAssignment, CoreConfig, CostResolver, Database, ProcedureCatalog,
    ProcedureImporter, StudyRegistry, VisitScheduler,
};

#[derive(Parser, Debug)]
#[command(name = "seed_study", about = "Seed a demo preclinical study")]
struct Args {
    /// SQLite file to seed (overrides PRECLINICAL_DB_PATH)
    #[arg(long)]
    db_path: Option<String>,

    /// Animals per cohort
    #[arg(long, default_value_t = 4)]
    animals: u32,

    /// Study start date (YYYY-MM-DD)
    #[arg(long, default_value = "2026-01-05")]
    start: NaiveDate,

    /// Print the study cost as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = CoreConfig::from_env().context("reading configuration")?;
    if let Some(path) = args.db_path.clone() {
        config.database_path = path;
    }

    let db = if config.is_in_memory() {
        Database::open_in_memory()
    } else {
        Database::open(&config.database_path)
    }
    .with_context(|| format!("opening {}", config.database_path))?;

    let study_id = seed(&db, &config, &args)?;

    let cost = CostResolver::new(&db)
        .with_default_currency(config.default_currency.as_str())
        .study_cost(&study_id)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&cost)?);
    } else {
        for visit in &cost.visits {
            println!(
                "visit {}: {} {} per animal, {} animals, projected {}",
                visit.visit_id,
                visit.total,
                visit.currency,
                visit.total_animals,
                visit.projected_total
            );
        }
        println!(
            "study {}: {} {} per animal across visits, projected {}",
            cost.study_id, cost.total, cost.currency, cost.projected_total
        );
    }
    Ok(())
}

fn seed(db: &Database, config: &CoreConfig, args: &Args) -> Result<String> {
    let study = StudyRegistry::new(db).create_study(NewStudy {
        name: format!("TOX-{}", args.start.format("%Y%m%d")),
        description: "28-day repeat-dose toxicity study in rats".into(),
        principal_investigator: "Study Director".into(),
        start_date: Some(args.start),
        end_date: Some(args.start + Duration::days(28)),
        status: None,
    })?;
    info!(study_id = %study.id, "seeding study");

    let catalog = ProcedureCatalog::new(db).with_default_currency(config.default_currency.as_str());
    let bleed = catalog.create_master_procedure(NewMasterProcedure {
        name: "Blood Draw".into(),
        category: ProcedureCategory::SampleCollection,
        description: "Tail vein blood collection".into(),
        default_cost: Decimal::from(50),
        currency: None,
        parent_id: None,
        input_fields: vec![
            NewField::new("volume", "Volume", FieldType::Number)
                .mandatory()
                .with_units("mL"),
            NewField::new("site", "Site", FieldType::Dropdown)
                .with_options(["Tail vein", "Saphenous", "Retro-orbital"]),
        ],
    })?;
    let weight = catalog.create_master_procedure(NewMasterProcedure {
        name: "Body Weight".into(),
        category: ProcedureCategory::InLifeMeasurement,
        description: "Body weight measurement".into(),
        default_cost: Decimal::new(550, 2),
        currency: None,
        parent_id: None,
        input_fields: vec![NewField::new("weight", "Weight", FieldType::Number)
            .mandatory()
            .with_units("g")],
    })?;
    let necropsy = catalog.create_master_procedure(NewMasterProcedure {
        name: "Necropsy".into(),
        category: ProcedureCategory::TerminalProcedure,
        description: "Gross necropsy with organ weights".into(),
        default_cost: Decimal::from(300),
        currency: None,
        parent_id: None,
        input_fields: vec![NewField::new("findings", "Findings", FieldType::TextArea)],
    })?;

    let importer = ProcedureImporter::new(db);
    let bleed = importer.import_procedure(&study.id, &bleed.id, None)?;
    let weight = importer.import_procedure(&study.id, &weight.id, None)?;
    let necropsy = importer.import_procedure(&study.id, &necropsy.id, Some(Decimal::from(275)))?;

    let registry = AnimalRegistry::new(db);
    let assignment = CohortAssignment::new(db);
    let mut cohort_ids = Vec::new();
    for (index, (name, dose)) in [("Vehicle", "0 mg/kg"), ("High dose", "100 mg/kg")]
        .into_iter()
        .enumerate()
    {
        let cohort = assignment.create_cohort(
            &study.id,
            NewCohort {
                name: name.into(),
                description: format!("{dose}/day, oral gavage"),
                criteria: Some("Healthy, 8-10 weeks".into()),
                planned_animal_count: args.animals.max(1),
            },
        )?;
        for n in 0..args.animals {
            let sex = if n % 2 == 0 { Sex::Male } else { Sex::Female };
            let label = format!("{}-G{}-{:03}", &study.id[..8], index + 1, n + 1);
            let mut animal = NewAnimal::new(label, "Rat", sex);
            animal.strain = Some("Sprague-Dawley".into());
            let animal = registry.register_animal(animal)?;
            assignment.assign_animal(&cohort.id, &animal.id)?;
        }
        cohort_ids.push(cohort.id);
    }

    let scheduler = VisitScheduler::new(db);
    let plan = [
        ("Baseline", "D1", 0, vec![&weight, &bleed]),
        ("Interim", "D14", 13, vec![&weight]),
        ("Terminal", "D28", 27, vec![&weight, &bleed, &necropsy]),
    ];
    for (name, label, offset, procedures) in plan {
        let visit = scheduler.create_visit(
            &study.id,
            NewVisit {
                name: name.into(),
                label: label.into(),
                description: None,
                planned_timepoint: format!("Day {}", offset + 1),
                planned_date: Some(args.start + Duration::days(offset)),
                cohort_ids: cohort_ids.clone(),
            },
        )?;
        for (order, procedure) in procedures.into_iter().enumerate() {
            scheduler.assign_procedure(&visit.id, &procedure.id, Some(order as i32 + 1))?;
        }
    }

    info!(study_id = %study.id, cohorts = cohort_ids.len(), "study seeded");
    Ok(study.id)
}
