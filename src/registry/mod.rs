//! The marker registry: the list of places the map and side panel render.
//!
//! At most one entry exists per identity; inserting a known identity replaces
//! the entry in place and keeps its presentation handle.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Identity, PointOfInterest};
use crate::reconcile::{Provenance, ReconciledRecord};

/// Opaque id the map layer uses to address its marker. Assigned on first
/// insert and stable for the lifetime of the identity in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisitedFilter {
    #[default]
    All,
    Visited,
    BucketList,
}

impl VisitedFilter {
    pub fn matches(&self, visited: bool) -> bool {
        match self {
            VisitedFilter::All => true,
            VisitedFilter::Visited => visited,
            VisitedFilter::BucketList => !visited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFilter {
    #[serde(default)]
    pub visited: VisitedFilter,
    /// Matched case-insensitively against the effective category.
    #[serde(default)]
    pub category: Option<String>,
}

impl MarkerFilter {
    pub fn matches(&self, entry: &MarkerEntry) -> bool {
        self.visited.matches(entry.visited)
            && self.category.as_deref().map_or(true, |category| {
                entry.record.effective_category().eq_ignore_ascii_case(category)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerEntry {
    pub identity: Identity,
    pub record: PointOfInterest,
    pub provenance: Provenance,
    pub visited: bool,
    pub handle: PresentationHandle,
}

#[derive(Debug, Default)]
pub struct MarkerRegistry {
    entries: Vec<MarkerEntry>,
    index: HashMap<Identity, usize>,
    next_handle: u64,
}

impl MarkerRegistry {
    fn allocate_handle(&mut self) -> PresentationHandle {
        self.next_handle += 1;
        PresentationHandle(self.next_handle)
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.identity.clone(), position))
            .collect();
    }

    /// Replaces all entries. Identities that were already present keep their
    /// handles so the map layer can diff instead of redrawing.
    pub fn rebuild(&mut self, records: Vec<ReconciledRecord>) {
        let previous: HashMap<Identity, PresentationHandle> = self
            .entries
            .drain(..)
            .map(|entry| (entry.identity, entry.handle))
            .collect();
        self.index.clear();

        for reconciled in records {
            let identity = reconciled.identity();
            let handle = match previous.get(&identity) {
                Some(handle) => *handle,
                None => self.allocate_handle(),
            };
            self.place(identity, reconciled, handle);
        }
    }

    fn place(&mut self, identity: Identity, reconciled: ReconciledRecord, handle: PresentationHandle) {
        let entry = MarkerEntry {
            identity: identity.clone(),
            record: reconciled.record,
            provenance: reconciled.provenance,
            visited: reconciled.visited,
            handle,
        };
        match self.index.get(&identity) {
            Some(&position) => {
                let kept = self.entries[position].handle;
                self.entries[position] = MarkerEntry { handle: kept, ..entry };
            }
            None => {
                self.index.insert(identity, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Inserts or replaces by identity.
    pub fn upsert(&mut self, reconciled: ReconciledRecord) -> PresentationHandle {
        let identity = reconciled.identity();
        let handle = match self.index.get(&identity) {
            Some(&position) => self.entries[position].handle,
            None => self.allocate_handle(),
        };
        self.place(identity, reconciled, handle);
        handle
    }

    /// Replaces the entry for `previous` with `reconciled`, which may carry a
    /// different identity after a rename. Position and handle are kept; any
    /// other entry already holding the new identity is dropped.
    pub fn replace(&mut self, previous: &Identity, reconciled: ReconciledRecord) -> PresentationHandle {
        let identity = reconciled.identity();
        let Some(&position) = self.index.get(previous) else {
            return self.upsert(reconciled);
        };
        if &identity == previous {
            return self.upsert(reconciled);
        }

        let handle = self.entries[position].handle;
        self.entries[position] = MarkerEntry {
            identity: identity.clone(),
            record: reconciled.record,
            provenance: reconciled.provenance,
            visited: reconciled.visited,
            handle,
        };
        if let Some(&duplicate) = self.index.get(&identity) {
            self.entries.remove(duplicate);
        }
        self.reindex();
        handle
    }

    pub fn remove(&mut self, identity: &Identity) -> Option<MarkerEntry> {
        let position = self.index.remove(identity)?;
        let removed = self.entries.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Updates only the visited flag of `identity`. Returns false if unknown.
    pub fn set_visited(&mut self, identity: &Identity, visited: bool) -> bool {
        match self.index.get(identity) {
            Some(&position) => {
                self.entries[position].visited = visited;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, identity: &Identity) -> Option<&MarkerEntry> {
        self.index.get(identity).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.index.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.entries.iter()
    }

    pub fn iter_filtered(&self, filter: &MarkerFilter) -> impl Iterator<Item = &MarkerEntry> + '_ {
        let filter = filter.clone();
        self.entries.iter().filter(move |entry| filter.matches(entry))
    }

    /// Filtered entries grouped by effective category, for the side list.
    pub fn grouped_by_category(&self, filter: &MarkerFilter) -> BTreeMap<String, Vec<&MarkerEntry>> {
        let mut groups: BTreeMap<String, Vec<&MarkerEntry>> = BTreeMap::new();
        for entry in self.iter_filtered(filter) {
            groups
                .entry(entry.record.effective_category().to_string())
                .or_default()
                .push(entry);
        }
        groups
    }

    /// Identities whose effective category matches `category`, ignoring case.
    pub fn identities_in_category(&self, category: &str) -> Vec<Identity> {
        self.entries
            .iter()
            .filter(|entry| entry.record.effective_category().eq_ignore_ascii_case(category))
            .map(|entry| entry.identity.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn record(name: &str, category: &str, visited: bool) -> ReconciledRecord {
        ReconciledRecord {
            record: PointOfInterest::new(
                name,
                Some(category.into()),
                Coordinates { lat: 1.0, lng: 2.0 },
            ),
            provenance: Provenance::Preset,
            visited,
        }
    }

    fn id(name: &str, category: &str) -> Identity {
        crate::models::identity_of(name, Some(category))
    }

    #[test]
    fn duplicate_identity_replaces() {
        let mut registry = MarkerRegistry::default();
        let first = registry.upsert(record("Zion", "National Park", false));
        let second = registry.upsert(record("Zion", "National Park", true));

        assert_eq!(registry.len(), 1);
        assert_eq!(first, second);
        assert!(registry.get(&id("Zion", "National Park")).unwrap().visited);
    }

    #[test]
    fn rebuild_dedups_and_keeps_handles() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", false),
            record("Lisbon", "City", false),
        ]);
        let zion = registry.get(&id("Zion", "National Park")).unwrap().handle;

        registry.rebuild(vec![
            record("Arches", "National Park", false),
            record("Zion", "National Park", true),
            record("Zion", "National Park", false),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&id("Zion", "National Park")).unwrap().handle, zion);
        assert!(!registry.contains(&id("Lisbon", "City")));
    }

    #[test]
    fn set_visited_touches_only_one_entry() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", false),
            record("Arches", "National Park", false),
        ]);

        assert!(registry.set_visited(&id("Zion", "National Park"), true));
        assert!(!registry.get(&id("Arches", "National Park")).unwrap().visited);
        assert!(!registry.set_visited(&id("Nowhere", "City"), true));
    }

    #[test]
    fn replace_after_rename_keeps_position_and_handle() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", false),
            record("Arches", "National Park", false),
        ]);
        let handle = registry.get(&id("Zion", "National Park")).unwrap().handle;

        let replaced = registry.replace(
            &id("Zion", "National Park"),
            record("Zion Canyon", "Canyon", false),
        );

        assert_eq!(replaced, handle);
        assert!(!registry.contains(&id("Zion", "National Park")));
        let first = registry.iter().next().unwrap();
        assert_eq!(first.identity, id("Zion Canyon", "Canyon"));
    }

    #[test]
    fn replace_onto_existing_identity_keeps_one_entry() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", false),
            record("Arches", "National Park", false),
        ]);

        registry.replace(
            &id("Zion", "National Park"),
            record("Arches", "National Park", true),
        );

        assert_eq!(registry.len(), 1);
        assert!(registry.get(&id("Arches", "National Park")).unwrap().visited);
    }

    #[test]
    fn remove_and_lookup() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", false),
            record("Arches", "National Park", false),
            record("Lisbon", "City", true),
        ]);

        let removed = registry.remove(&id("Arches", "National Park")).unwrap();
        assert_eq!(removed.record.name, "Arches");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&id("Lisbon", "City")).unwrap().record.name, "Lisbon");
        assert!(registry.remove(&id("Arches", "National Park")).is_none());
    }

    #[test]
    fn filtering_and_grouping() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Zion", "National Park", true),
            record("Arches", "National Park", false),
            record("Lisbon", "City", true),
        ]);

        let visited = MarkerFilter {
            visited: VisitedFilter::Visited,
            category: None,
        };
        assert_eq!(registry.iter_filtered(&visited).count(), 2);

        let parks = MarkerFilter {
            visited: VisitedFilter::BucketList,
            category: Some("NATIONAL PARK".into()),
        };
        let names: Vec<_> = registry
            .iter_filtered(&parks)
            .map(|e| e.record.name.as_str())
            .collect();
        assert_eq!(names, vec!["Arches"]);

        let groups = registry.grouped_by_category(&MarkerFilter::default());
        assert_eq!(groups["National Park"].len(), 2);
        assert_eq!(groups["City"].len(), 1);
        assert_eq!(registry.identities_in_category("city").len(), 1);
    }

    #[test]
    fn filtered_entries_outlive_the_filter() {
        let mut registry = MarkerRegistry::default();
        registry.rebuild(vec![
            record("Lisbon", "City", true),
            record("Arches", "National Park", false),
        ]);

        let visited: Vec<&MarkerEntry> = {
            let filter = MarkerFilter {
                visited: VisitedFilter::Visited,
                category: None,
            };
            registry.iter_filtered(&filter).collect()
        };
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].record.name, "Lisbon");

        let groups = {
            let filter = MarkerFilter {
                visited: VisitedFilter::BucketList,
                category: None,
            };
            registry.grouped_by_category(&filter)
        };
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["National Park"]);
    }
}
