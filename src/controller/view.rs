//! Declarative snapshots handed to the rendering layer.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{
    style::color_for, CategoryStyle, Coordinates, Geometry, Identity, MustSee, PointOfInterest,
};
use crate::reconcile::Provenance;
use crate::registry::{MarkerEntry, MarkerFilter, MarkerRegistry, PresentationHandle};
use crate::tracker::{self, ProgressScope, ProgressSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView {
    pub handle: PresentationHandle,
    pub identity: Identity,
    pub name: String,
    pub category: String,
    pub coordinates: Coordinates,
    pub visited: bool,
    pub color: String,
    pub provenance: Provenance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

impl MarkerView {
    pub fn from_entry(entry: &MarkerEntry, styles: &BTreeMap<String, CategoryStyle>) -> Self {
        let category = entry.record.effective_category().to_string();
        Self {
            handle: entry.handle,
            identity: entry.identity.clone(),
            name: entry.record.name.clone(),
            color: color_for(styles, &category),
            category,
            coordinates: entry.record.coordinates,
            visited: entry.visited,
            provenance: entry.provenance.clone(),
            geometry: entry.record.geometry.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub name: String,
    pub color: String,
    pub progress: ProgressSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Markers passing the filter, in registry order.
    pub markers: Vec<MarkerView>,
    /// Identities of `markers`, grouped by category for the side list.
    pub groups: BTreeMap<String, Vec<Identity>>,
    pub scope: ProgressScope,
    pub progress: ProgressSnapshot,
    /// Every category present on the map, filtered or not.
    pub categories: Vec<CategorySummary>,
}

impl ViewState {
    pub fn build(
        registry: &MarkerRegistry,
        styles: &BTreeMap<String, CategoryStyle>,
        filter: &MarkerFilter,
        scope: &ProgressScope,
    ) -> Self {
        let markers = registry
            .iter_filtered(filter)
            .map(|entry| MarkerView::from_entry(entry, styles))
            .collect();

        let groups: BTreeMap<String, Vec<Identity>> = registry
            .grouped_by_category(filter)
            .into_iter()
            .map(|(category, entries)| {
                let identities: Vec<Identity> =
                    entries.iter().map(|entry| entry.identity.clone()).collect();
                (category, identities)
            })
            .collect();

        let categories = tracker::category_breakdown(registry)
            .into_iter()
            .map(|(name, progress)| CategorySummary {
                color: color_for(styles, &name),
                name,
                progress,
            })
            .collect();

        Self {
            markers,
            groups,
            scope: scope.clone(),
            progress: tracker::progress_snapshot(registry, scope),
            categories,
        }
    }
}

/// Everything the detail panel shows for one place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDetails {
    pub handle: PresentationHandle,
    pub identity: Identity,
    pub record: PointOfInterest,
    pub provenance: Provenance,
    pub visited: bool,
    pub color: String,
    pub must_sees: Vec<MustSee>,
    pub checklist_complete: bool,
}

impl RecordDetails {
    pub fn from_entry(
        entry: &MarkerEntry,
        styles: &BTreeMap<String, CategoryStyle>,
        must_sees: &[MustSee],
    ) -> Self {
        Self {
            handle: entry.handle,
            identity: entry.identity.clone(),
            record: entry.record.clone(),
            provenance: entry.provenance.clone(),
            visited: entry.visited,
            color: color_for(styles, entry.record.effective_category()),
            must_sees: must_sees.to_vec(),
            checklist_complete: tracker::checklist_complete(&entry.record.checklist),
        }
    }
}
