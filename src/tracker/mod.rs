//! Visited / bucket-list partitions and progress percentages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ChecklistItem;
use crate::registry::{MarkerFilter, MarkerRegistry, VisitedFilter};

/// Which slice of the registry the progress bar reports on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ProgressScope {
    #[default]
    All,
    Filter(VisitedFilter),
    Category(String),
}

impl ProgressScope {
    fn as_filter(&self) -> MarkerFilter {
        match self {
            ProgressScope::All => MarkerFilter::default(),
            ProgressScope::Filter(visited) => MarkerFilter {
                visited: *visited,
                category: None,
            },
            ProgressScope::Category(category) => MarkerFilter {
                visited: VisitedFilter::All,
                category: Some(category.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub visited: usize,
    pub total: usize,
    pub percent: u8,
}

impl ProgressSnapshot {
    pub fn from_counts(visited: usize, total: usize) -> Self {
        Self {
            visited,
            total,
            percent: percent(visited, total),
        }
    }
}

/// `visited / total * 100` rounded to the nearest integer; 0 for an empty scope.
pub fn percent(visited: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let ratio = visited.min(total) as f64 / total as f64;
    (ratio * 100.0).round() as u8
}

pub fn progress_snapshot(registry: &MarkerRegistry, scope: &ProgressScope) -> ProgressSnapshot {
    let filter = scope.as_filter();
    let (visited, total) = registry
        .iter_filtered(&filter)
        .fold((0, 0), |(visited, total), entry| {
            (visited + usize::from(entry.visited), total + 1)
        });
    ProgressSnapshot::from_counts(visited, total)
}

/// Progress per category, keyed by the category label as displayed.
pub fn category_breakdown(registry: &MarkerRegistry) -> BTreeMap<String, ProgressSnapshot> {
    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for entry in registry.iter() {
        let slot = counts
            .entry(entry.record.effective_category().to_string())
            .or_default();
        slot.0 += usize::from(entry.visited);
        slot.1 += 1;
    }
    counts
        .into_iter()
        .map(|(category, (visited, total))| (category, ProgressSnapshot::from_counts(visited, total)))
        .collect()
}

/// A non-empty checklist with every task done. Reaching this state visits the
/// place; leaving it never un-visits.
pub fn checklist_complete(checklist: &[ChecklistItem]) -> bool {
    !checklist.is_empty() && checklist.iter().all(|item| item.completed)
}
