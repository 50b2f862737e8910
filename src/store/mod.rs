//! Typed access to the durable key-value store.
//!
//! Every namespace is one JSON document that is read and written as a whole.
//! Merging happens in memory on [`UserData`] before the write; the store never
//! does partial updates.

mod namespaces;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::db::{Database, NamespaceStamp};
use crate::{log_debug, log_error, log_warn};

pub use namespaces::{
    CategoryStyles, Checklists, CustomRecords, DeletedPresets, MustSees, Namespace,
    PresetOverrides, VisitedFlags,
};

const ENABLE_LOGS: bool = true;

type Value<N> = <N as Namespace>::Value;

/// Names one of the seven namespaces, used to report which ones a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NamespaceKind {
    Visited,
    Custom,
    Overrides,
    Deleted,
    MustSees,
    Checklists,
    Styles,
}

/// In-memory copy of everything the user has stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub visited: Value<VisitedFlags>,
    pub custom: Value<CustomRecords>,
    pub overrides: Value<PresetOverrides>,
    pub deleted: Value<DeletedPresets>,
    pub must_sees: Value<MustSees>,
    pub checklists: Value<Checklists>,
    pub styles: Value<CategoryStyles>,
}

fn encode<N: Namespace>(value: &Value<N>) -> Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize namespace {}", N::KEY))
}

fn entry<N: Namespace>(value: &Value<N>) -> Result<(&'static str, String)> {
    Ok((N::KEY, encode::<N>(value)?))
}

#[derive(Clone)]
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Reads a namespace. Missing, corrupt or unreadable content all yield the
    /// empty default; this never fails.
    pub async fn read<N: Namespace>(&self) -> Value<N> {
        let raw = match self.db.get_raw(N::KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Default::default(),
            Err(err) => {
                log_error!("Failed to read namespace {}: {err:#}", N::KEY);
                return Default::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                log_warn!("Namespace {} is corrupt, treating as empty: {err}", N::KEY);
                Default::default()
            }
        }
    }

    pub async fn write<N: Namespace>(&self, value: &Value<N>) -> Result<()> {
        let serialized = encode::<N>(value)?;
        let bytes = serialized.len();
        self.db.put_raw(N::KEY, serialized).await?;
        log_debug!("Wrote namespace {} ({} bytes)", N::KEY, bytes);
        Ok(())
    }

    pub async fn clear<N: Namespace>(&self) -> Result<()> {
        self.db.delete_raw(N::KEY).await
    }

    pub async fn load_user_data(&self) -> UserData {
        UserData {
            visited: self.read::<VisitedFlags>().await,
            custom: self.read::<CustomRecords>().await,
            overrides: self.read::<PresetOverrides>().await,
            deleted: self.read::<DeletedPresets>().await,
            must_sees: self.read::<MustSees>().await,
            checklists: self.read::<Checklists>().await,
            styles: self.read::<CategoryStyles>().await,
        }
    }

    /// Writes the listed namespaces from `data`, each as a whole-document
    /// replace, in a single transaction.
    pub async fn persist(&self, data: &UserData, kinds: &BTreeSet<NamespaceKind>) -> Result<()> {
        let mut entries = Vec::with_capacity(kinds.len());
        for kind in kinds {
            entries.push(match kind {
                NamespaceKind::Visited => entry::<VisitedFlags>(&data.visited)?,
                NamespaceKind::Custom => entry::<CustomRecords>(&data.custom)?,
                NamespaceKind::Overrides => entry::<PresetOverrides>(&data.overrides)?,
                NamespaceKind::Deleted => entry::<DeletedPresets>(&data.deleted)?,
                NamespaceKind::MustSees => entry::<MustSees>(&data.must_sees)?,
                NamespaceKind::Checklists => entry::<Checklists>(&data.checklists)?,
                NamespaceKind::Styles => entry::<CategoryStyles>(&data.styles)?,
            });
        }
        if entries.is_empty() {
            return Ok(());
        }
        log_debug!("Persisting {:?}", kinds);
        self.db.put_many(entries).await
    }

    pub async fn namespace_stamps(&self) -> Result<Vec<NamespaceStamp>> {
        self.db.namespace_stamps().await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::models::{
        identity_of, CategoryStyle, ChecklistItem, Coordinates, MustSee, PointOfInterest,
        VisitedSignal,
    };

    fn store() -> LocalStore {
        LocalStore::new(Database::in_memory().unwrap())
    }

    fn cove() -> PointOfInterest {
        let mut poi = PointOfInterest::new(
            "Secret Cove",
            Some("Beach".into()),
            Coordinates { lat: 10.0, lng: 20.0 },
        );
        poi.visited_signal = Some(VisitedSignal::Status("bucket_list".into()));
        poi
    }

    #[tokio::test]
    async fn missing_namespaces_read_as_empty() {
        let store = store();
        assert!(store.read::<VisitedFlags>().await.is_empty());
        assert!(store.read::<CustomRecords>().await.is_empty());
        assert_eq!(store.load_user_data().await, UserData::default());
    }

    #[tokio::test]
    async fn corrupt_namespace_reads_as_empty() {
        let store = store();
        store
            .database()
            .put_raw(VisitedFlags::KEY, "not json {".into())
            .await
            .unwrap();
        store
            .database()
            .put_raw(CustomRecords::KEY, "{\"wrong\":\"shape\"}".into())
            .await
            .unwrap();

        assert!(store.read::<VisitedFlags>().await.is_empty());
        assert!(store.read::<CustomRecords>().await.is_empty());
    }

    #[tokio::test]
    async fn every_namespace_round_trips() {
        let store = store();
        let id = identity_of("Yosemite", Some("National Park"));

        let visited = BTreeMap::from([(id.clone(), true)]);
        store.write::<VisitedFlags>(&visited).await.unwrap();
        assert_eq!(store.read::<VisitedFlags>().await, visited);

        let custom = vec![cove()];
        store.write::<CustomRecords>(&custom).await.unwrap();
        assert_eq!(store.read::<CustomRecords>().await, custom);

        let mut renamed = cove();
        renamed.original_identity = Some(id.clone());
        let overrides = BTreeMap::from([(id.clone(), renamed)]);
        store.write::<PresetOverrides>(&overrides).await.unwrap();
        assert_eq!(store.read::<PresetOverrides>().await, overrides);

        let deleted = BTreeSet::from([id.clone()]);
        store.write::<DeletedPresets>(&deleted).await.unwrap();
        assert_eq!(store.read::<DeletedPresets>().await, deleted);

        let must_sees = BTreeMap::from([(
            id.clone(),
            vec![MustSee {
                text: "Tunnel View".into(),
                checked: true,
            }],
        )]);
        store.write::<MustSees>(&must_sees).await.unwrap();
        assert_eq!(store.read::<MustSees>().await, must_sees);

        let checklists = BTreeMap::from([(
            id.clone(),
            vec![ChecklistItem {
                task: "Hike Half Dome".into(),
                completed: false,
            }],
        )]);
        store.write::<Checklists>(&checklists).await.unwrap();
        assert_eq!(store.read::<Checklists>().await, checklists);

        let styles = BTreeMap::from([(
            "Beach".to_string(),
            CategoryStyle {
                color: "#00ffaa".into(),
            },
        )]);
        store.write::<CategoryStyles>(&styles).await.unwrap();
        assert_eq!(store.read::<CategoryStyles>().await, styles);
    }

    #[tokio::test]
    async fn deleted_set_is_stored_as_json_array() {
        let store = store();
        let deleted = BTreeSet::from([identity_of("Zion", Some("National Park"))]);
        store.write::<DeletedPresets>(&deleted).await.unwrap();

        let raw = store
            .database()
            .get_raw(DeletedPresets::KEY)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw, "[\"Zion_National Park\"]");
    }

    #[tokio::test]
    async fn persist_writes_only_listed_namespaces() {
        let store = store();
        let mut data = UserData::default();
        data.visited
            .insert(identity_of("Zion", Some("National Park")), true);
        data.custom.push(cove());

        store
            .persist(&data, &BTreeSet::from([NamespaceKind::Visited]))
            .await
            .unwrap();

        let loaded = store.load_user_data().await;
        assert_eq!(loaded.visited, data.visited);
        assert!(loaded.custom.is_empty());
    }

    #[tokio::test]
    async fn persist_is_all_or_nothing() {
        let store = store();
        store
            .database()
            .execute(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_deleted BEFORE INSERT ON kv_store
                     WHEN NEW.namespace = 'deletedPresets'
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let zion = identity_of("Zion", Some("National Park"));
        let mut data = UserData::default();
        data.overrides.insert(zion.clone(), cove());
        data.deleted.insert(zion);

        let kinds = BTreeSet::from([NamespaceKind::Overrides, NamespaceKind::Deleted]);
        assert!(store.persist(&data, &kinds).await.is_err());
        assert_eq!(store.load_user_data().await, UserData::default());
    }

    #[tokio::test]
    async fn clear_removes_namespace() {
        let store = store();
        store
            .write::<VisitedFlags>(&BTreeMap::from([(identity_of("A", None), true)]))
            .await
            .unwrap();
        store.clear::<VisitedFlags>().await.unwrap();
        assert!(store.read::<VisitedFlags>().await.is_empty());
    }

    #[tokio::test]
    async fn data_survives_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("travel-map.sqlite3");
        let id = identity_of("Secret Cove", Some("Beach"));

        {
            let store = LocalStore::new(Database::new(path.clone()).unwrap());
            store
                .write::<VisitedFlags>(&BTreeMap::from([(id.clone(), true)]))
                .await
                .unwrap();
        }

        let reopened = LocalStore::new(Database::new(path).unwrap());
        assert_eq!(reopened.read::<VisitedFlags>().await.get(&id), Some(&true));
        assert_eq!(reopened.namespace_stamps().await.unwrap().len(), 1);
    }
}
