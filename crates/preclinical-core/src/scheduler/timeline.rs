//! Timeline ordering for visits and visit procedures.

use std::cmp::Ordering;

use crate::models::{Visit, VisitProcedure};

/// Compare two visits for the study timeline.
///
/// When both visits carry a planned date the dates decide; otherwise the
/// free-text `planned_timepoint` strings are compared lexicographically.
/// Over a mix of dated and undated visits this is not transitive, e.g.
/// `{2026-01-10, "Day 9"}`, `{None, "Day 1"}`, `{2026-01-01, "Day 5"}`.
pub fn compare_visits(a: &Visit, b: &Visit) -> Ordering {
    match (a.planned_date, b.planned_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.planned_timepoint.cmp(&b.planned_timepoint),
    }
}

/// Stable insertion sort of visits by [`compare_visits`].
///
/// `slice::sort_by` may panic when the comparator is not a total order, so
/// this only ever moves an element past neighbours that compare `Greater`.
/// The result is deterministic for a given input order.
pub fn sort_timeline(visits: &mut [Visit]) {
    for i in 1..visits.len() {
        let mut j = i;
        while j > 0 && compare_visits(&visits[j - 1], &visits[j]) == Ordering::Greater {
            visits.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Order links by `sequence_order`, unordered links last, ties in
/// assignment order.
pub fn sort_by_sequence(links: &mut [VisitProcedure]) {
    links.sort_by_key(|link| (link.sequence_order.is_none(), link.sequence_order));
}
