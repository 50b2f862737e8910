//! Edits, deletions and additions, applied to the in-memory [`UserData`].
//!
//! Each operation reports which namespaces it touched so the caller can write
//! exactly those back to the store.

use std::collections::BTreeSet;

use anyhow::{anyhow, Result};

use super::{finish, Provenance, ReconciledRecord};
use crate::models::{
    poi::BUCKET_LIST_STATUS, Identity, PoiFields, PointOfInterest, ValidationError, VisitedSignal,
};
use crate::store::{NamespaceKind, UserData};

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub previous_identity: Identity,
    pub record: ReconciledRecord,
    pub changed: BTreeSet<NamespaceKind>,
}

impl EditOutcome {
    pub fn renamed(&self) -> bool {
        self.previous_identity != self.record.identity()
    }
}

/// Moves identity-keyed state from `from` to `to` after a rename.
fn migrate_keyed_state(
    user: &mut UserData,
    from: &Identity,
    to: &Identity,
    changed: &mut BTreeSet<NamespaceKind>,
) {
    if from == to {
        return;
    }
    if let Some(visited) = user.visited.remove(from) {
        user.visited.insert(to.clone(), visited);
        changed.insert(NamespaceKind::Visited);
    }
    if let Some(must_sees) = user.must_sees.remove(from) {
        user.must_sees.insert(to.clone(), must_sees);
        changed.insert(NamespaceKind::MustSees);
    }
    if let Some(checklist) = user.checklists.remove(from) {
        user.checklists.insert(to.clone(), checklist);
        changed.insert(NamespaceKind::Checklists);
    }
}

fn custom_index(user: &UserData, identity: &Identity) -> Option<usize> {
    user.custom
        .iter()
        .position(|record| &record.identity() == identity)
}

fn edit_custom(
    user: &mut UserData,
    identity: &Identity,
    fields: PoiFields,
) -> Result<PointOfInterest> {
    let index = custom_index(user, identity)
        .ok_or_else(|| anyhow!("custom place '{identity}' not found"))?;

    let updated = fields.apply_to(&user.custom[index])?;
    let new_identity = updated.identity();
    if &new_identity != identity && custom_index(user, &new_identity).is_some() {
        return Err(ValidationError::AlreadyExists(updated.name).into());
    }

    user.custom[index] = updated.clone();
    Ok(updated)
}

fn edit_preset(
    user: &mut UserData,
    current: &ReconciledRecord,
    original_identity: &Identity,
    fields: PoiFields,
) -> Result<PointOfInterest> {
    let base = user
        .overrides
        .get(original_identity)
        .cloned()
        .unwrap_or_else(|| current.record.clone());

    let mut updated = fields.apply_to(&base)?;
    updated.original_identity = Some(original_identity.clone());
    user.overrides
        .insert(original_identity.clone(), updated.clone());
    Ok(updated)
}

/// Applies `fields` to `current`.
///
/// Custom records are replaced in place. Presets get an override stored under
/// their original identity: the back-reference if the record is already
/// modified, else its own identity. Renaming a preset any number of times
/// therefore keeps updating the same override. State keyed by identity follows
/// the record when its identity changes.
pub fn edit_record(
    user: &mut UserData,
    current: &ReconciledRecord,
    fields: PoiFields,
) -> Result<EditOutcome> {
    let previous_identity = current.identity();
    let mut changed = BTreeSet::new();
    let checklist_edited = fields.checklist.is_some();

    let (updated, provenance) = match &current.provenance {
        Provenance::Custom => {
            let updated = edit_custom(user, &previous_identity, fields)?;
            changed.insert(NamespaceKind::Custom);
            (updated, Provenance::Custom)
        }
        Provenance::Preset => {
            let original_identity = previous_identity.clone();
            let updated = edit_preset(user, current, &original_identity, fields)?;
            changed.insert(NamespaceKind::Overrides);
            (updated, Provenance::ModifiedPreset { original_identity })
        }
        Provenance::ModifiedPreset { original_identity } => {
            let updated = edit_preset(user, current, original_identity, fields)?;
            changed.insert(NamespaceKind::Overrides);
            (
                updated,
                Provenance::ModifiedPreset {
                    original_identity: original_identity.clone(),
                },
            )
        }
        Provenance::DeletedPreset => {
            return Err(anyhow!("'{previous_identity}' has been deleted"));
        }
    };

    let new_identity = updated.identity();
    migrate_keyed_state(user, &previous_identity, &new_identity, &mut changed);

    // A stored checklist shadows the record's own, so a form edit must land there too.
    if checklist_edited {
        if let Some(stored) = user.checklists.get_mut(&new_identity) {
            *stored = updated.checklist.clone();
            changed.insert(NamespaceKind::Checklists);
        }
    }

    Ok(EditOutcome {
        previous_identity,
        record: finish(user, updated, provenance),
        changed,
    })
}

/// Removes `current`.
///
/// Custom records leave the custom list. Presets are added to the deletion
/// set (under the original identity as well, when renamed) and lose their
/// override. Must-sees and the checklist are purged either way; the visited
/// flag is purged only when `retain_visited` is false.
pub fn delete_record(
    user: &mut UserData,
    current: &ReconciledRecord,
    retain_visited: bool,
) -> Result<BTreeSet<NamespaceKind>> {
    let identity = current.identity();
    let mut changed = BTreeSet::new();

    match &current.provenance {
        Provenance::Custom => {
            let before = user.custom.len();
            user.custom.retain(|record| record.identity() != identity);
            if user.custom.len() == before {
                return Err(anyhow!("custom place '{identity}' not found"));
            }
            changed.insert(NamespaceKind::Custom);
        }
        Provenance::Preset | Provenance::ModifiedPreset { .. } => {
            user.deleted.insert(identity.clone());
            if user.overrides.remove(&identity).is_some() {
                changed.insert(NamespaceKind::Overrides);
            }
            if let Provenance::ModifiedPreset { original_identity } = &current.provenance {
                user.deleted.insert(original_identity.clone());
                if user.overrides.remove(original_identity).is_some() {
                    changed.insert(NamespaceKind::Overrides);
                }
            }
            changed.insert(NamespaceKind::Deleted);
        }
        Provenance::DeletedPreset => return Ok(changed),
    }

    if user.must_sees.remove(&identity).is_some() {
        changed.insert(NamespaceKind::MustSees);
    }
    if user.checklists.remove(&identity).is_some() {
        changed.insert(NamespaceKind::Checklists);
    }
    if !retain_visited && user.visited.remove(&identity).is_some() {
        changed.insert(NamespaceKind::Visited);
    }

    Ok(changed)
}

/// Validates `fields` and appends a new custom record.
pub fn add_custom_record(user: &mut UserData, fields: PoiFields) -> Result<ReconciledRecord> {
    let mut record = fields.into_new_record()?;
    if custom_index(user, &record.identity()).is_some() {
        return Err(ValidationError::AlreadyExists(record.name).into());
    }
    record.visited_signal = Some(VisitedSignal::Status(BUCKET_LIST_STATUS.to_string()));

    user.custom.push(record.clone());
    Ok(finish(user, record, Provenance::Custom))
}
