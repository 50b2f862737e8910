//! Merges the bundled feeds with everything the user stored into one ordered
//! collection of places.
//!
//! For each feed entry:
//! 1. entries whose identity is in the deletion set are dropped;
//! 2. an override stored under the entry's identity replaces its fields, and
//!    the override keeps a back-reference to that identity;
//! 3. otherwise the entry is used unchanged;
//! 4. the visited flag comes from the stored visited map, falling back to the
//!    record's own signal.
//!
//! Custom records are appended after all feeds.

mod edit;

use serde::Serialize;

use crate::models::{Identity, PointOfInterest};
use crate::store::UserData;

pub use edit::{add_custom_record, delete_record, edit_record, EditOutcome};

/// Where a record comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Provenance {
    Preset,
    #[serde(rename_all = "camelCase")]
    ModifiedPreset { original_identity: Identity },
    DeletedPreset,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledRecord {
    pub record: PointOfInterest,
    pub provenance: Provenance,
    pub visited: bool,
}

impl ReconciledRecord {
    pub fn identity(&self) -> Identity {
        self.record.identity()
    }
}

/// Stored visited flag if any, else the record's own signal.
pub fn resolve_visited(user: &UserData, record: &PointOfInterest) -> bool {
    user.visited
        .get(&record.identity())
        .copied()
        .unwrap_or_else(|| record.signals_visited())
}

/// Classifies a feed entry against the stored deletions and overrides.
pub fn classify(user: &UserData, feed_entry: &PointOfInterest) -> Provenance {
    let identity = feed_entry.identity();
    if user.deleted.contains(&identity) {
        Provenance::DeletedPreset
    } else if user.overrides.contains_key(&identity) {
        Provenance::ModifiedPreset {
            original_identity: identity,
        }
    } else {
        Provenance::Preset
    }
}

/// Builds the display record for `record`, folding in a stored checklist.
fn finish(user: &UserData, mut record: PointOfInterest, provenance: Provenance) -> ReconciledRecord {
    if let Some(checklist) = user.checklists.get(&record.identity()) {
        record.checklist = checklist.clone();
    }
    let visited = resolve_visited(user, &record);
    ReconciledRecord {
        record,
        provenance,
        visited,
    }
}

pub fn reconcile_preset(user: &UserData, feed_entry: &PointOfInterest) -> Option<ReconciledRecord> {
    match classify(user, feed_entry) {
        Provenance::DeletedPreset => None,
        Provenance::ModifiedPreset { original_identity } => {
            let mut record = user.overrides.get(&original_identity)?.clone();
            record.original_identity = Some(original_identity.clone());
            Some(finish(
                user,
                record,
                Provenance::ModifiedPreset { original_identity },
            ))
        }
        provenance => Some(finish(user, feed_entry.clone(), provenance)),
    }
}

/// Reconciles feeds (in the given order) and then custom records.
pub fn reconcile<'a, I>(feeds: I, user: &UserData) -> Vec<ReconciledRecord>
where
    I: IntoIterator<Item = &'a [PointOfInterest]>,
{
    let mut collection: Vec<ReconciledRecord> = feeds
        .into_iter()
        .flat_map(|feed| feed.iter())
        .filter_map(|entry| reconcile_preset(user, entry))
        .collect();

    collection.extend(
        user.custom
            .iter()
            .map(|record| finish(user, record.clone(), Provenance::Custom)),
    );

    collection
}
