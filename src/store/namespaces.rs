use std::collections::{BTreeMap, BTreeSet};

use serde::{de::DeserializeOwned, Serialize};

use crate::models::{CategoryStyle, ChecklistItem, Identity, MustSee, PointOfInterest};

/// A named slot in the key-value store holding one JSON document.
pub trait Namespace {
    const KEY: &'static str;
    type Value: Serialize + DeserializeOwned + Default + Send + 'static;
}

pub struct VisitedFlags;
pub struct CustomRecords;
pub struct PresetOverrides;
pub struct DeletedPresets;
pub struct MustSees;
pub struct Checklists;
pub struct CategoryStyles;

impl Namespace for VisitedFlags {
    const KEY: &'static str = "visitedLocations";
    type Value = BTreeMap<Identity, bool>;
}

impl Namespace for CustomRecords {
    const KEY: &'static str = "customLocations";
    type Value = Vec<PointOfInterest>;
}

/// Keyed by the identity of the feed entry being overridden.
impl Namespace for PresetOverrides {
    const KEY: &'static str = "modifiedPresets";
    type Value = BTreeMap<Identity, PointOfInterest>;
}

impl Namespace for DeletedPresets {
    const KEY: &'static str = "deletedPresets";
    type Value = BTreeSet<Identity>;
}

impl Namespace for MustSees {
    const KEY: &'static str = "mustSees";
    type Value = BTreeMap<Identity, Vec<MustSee>>;
}

impl Namespace for Checklists {
    const KEY: &'static str = "checklists";
    type Value = BTreeMap<Identity, Vec<ChecklistItem>>;
}

impl Namespace for CategoryStyles {
    const KEY: &'static str = "categoryColors";
    type Value = BTreeMap<String, CategoryStyle>;
}
