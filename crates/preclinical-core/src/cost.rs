//! Cost resolution for visits and studies.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DEFAULT_CURRENCY;
use crate::db::Database;
use crate::error::{CoreError, CoreResult};
use crate::models::{StudyProcedure, Visit};
use crate::studies::StudyRegistry;

/// Per-animal cost of a study procedure: the study override when set (zero
/// included), else the snapshotted default.
pub fn effective_cost(procedure: &StudyProcedure) -> Decimal {
    procedure.study_specific_cost.unwrap_or(procedure.default_cost)
}

/// Cost breakdown for one visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitCost {
    pub visit_id: String,
    /// Sum of effective costs of the linked procedures
    pub total: Decimal,
    pub currency: String,
    /// Distinct currencies seen, sorted. Amounts are summed without conversion.
    pub currencies: Vec<String>,
    /// All procedure links of the visit, dangling ones included
    pub procedure_count: usize,
    /// Current members summed over the visit's cohorts
    pub total_animals: usize,
    /// `total * total_animals`
    pub projected_total: Decimal,
    /// Linked study procedure ids that no longer resolve
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_procedure_ids: Vec<String>,
}

/// Visit costs rolled up for a whole study.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyCost {
    pub study_id: String,
    pub total: Decimal,
    pub projected_total: Decimal,
    pub currency: String,
    pub currencies: Vec<String>,
    pub visits: Vec<VisitCost>,
}

pub struct CostResolver<'a> {
    db: &'a Database,
    default_currency: String,
}

impl<'a> CostResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Currency reported when a total has no single currency.
    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    /// Sum of effective costs of the procedures linked to a visit.
    ///
    /// Dangling links are skipped and listed in `missing_procedure_ids`.
    pub fn visit_cost(&self, visit_id: &str) -> CoreResult<VisitCost> {
        let visit = self
            .db
            .get_visit(visit_id)?
            .ok_or_else(|| CoreError::not_found("Visit", visit_id))?;
        self.cost_of(&visit)
    }

    /// Roll up every visit of a study, in timeline order.
    pub fn study_cost(&self, study_id: &str) -> CoreResult<StudyCost> {
        StudyRegistry::new(self.db).ensure_exists(study_id)?;
        let mut visits = self.db.list_visits_by_study(study_id)?;
        crate::scheduler::sort_timeline(&mut visits);

        let mut total = Decimal::ZERO;
        let mut projected_total = Decimal::ZERO;
        let mut currencies = BTreeSet::new();
        let mut breakdown = Vec::with_capacity(visits.len());
        for visit in &visits {
            let cost = self.cost_of(visit)?;
            total = checked_sum(total, cost.total, study_id)?;
            projected_total = checked_sum(projected_total, cost.projected_total, study_id)?;
            currencies.extend(cost.currencies.iter().cloned());
            breakdown.push(cost);
        }

        let currencies: Vec<String> = currencies.into_iter().collect();
        let currency = self.report_currency(study_id, &currencies);
        debug!(study_id = %study_id, visits = breakdown.len(), total = %total, "study cost resolved");
        Ok(StudyCost {
            study_id: study_id.to_string(),
            total,
            projected_total,
            currency,
            currencies,
            visits: breakdown,
        })
    }

    fn cost_of(&self, visit: &Visit) -> CoreResult<VisitCost> {
        let mut total = Decimal::ZERO;
        let mut currencies = BTreeSet::new();
        let mut missing_procedure_ids = Vec::new();

        let links = self.db.list_visit_procedures(&visit.id)?;
        let procedure_count = links.len();
        for link in links {
            match self.db.get_study_procedure(&link.study_procedure_id)? {
                Some(procedure) => {
                    total = checked_sum(total, effective_cost(&procedure), &visit.id)?;
                    currencies.insert(procedure.currency);
                }
                None => {
                    warn!(
                        visit_id = %visit.id,
                        study_procedure_id = %link.study_procedure_id,
                        "skipping link to missing study procedure"
                    );
                    missing_procedure_ids.push(link.study_procedure_id);
                }
            }
        }

        let mut total_animals = 0;
        for cohort_id in &visit.cohort_ids {
            match self.db.get_cohort(cohort_id)? {
                Some(cohort) => total_animals += cohort.animal_count(),
                None => warn!(visit_id = %visit.id, cohort_id = %cohort_id, "skipping missing cohort"),
            }
        }

        let currencies: Vec<String> = currencies.into_iter().collect();
        let currency = self.report_currency(&visit.id, &currencies);
        debug!(
            visit_id = %visit.id,
            procedures = procedure_count,
            animals = total_animals,
            total = %total,
            "visit cost resolved"
        );
        Ok(VisitCost {
            visit_id: visit.id.clone(),
            total,
            currency,
            currencies,
            procedure_count,
            total_animals,
            projected_total: total.checked_mul(Decimal::from(total_animals)).ok_or_else(|| {
                CoreError::Overflow(format!(
                    "projected cost of visit {} ({total} x {total_animals} animals)",
                    visit.id
                ))
            })?,
            missing_procedure_ids,
        })
    }

    fn report_currency(&self, owner_id: &str, currencies: &[String]) -> String {
        match currencies {
            [single] => single.clone(),
            [] => self.default_currency.clone(),
            mixed => {
                warn!(id = %owner_id, currencies = ?mixed, "summing amounts in mixed currencies");
                self.default_currency.clone()
            }
        }
    }
}

fn checked_sum(acc: Decimal, amount: Decimal, owner_id: &str) -> CoreResult<Decimal> {
    acc.checked_add(amount)
        .ok_or_else(|| CoreError::Overflow(format!("cost total of {owner_id}")))
}
