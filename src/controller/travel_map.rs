use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use anyhow::{anyhow, bail, Result};
use tokio::sync::Mutex;

use crate::{
    db::NamespaceStamp,
    events::{EventBus, Handler, MapEvent, SubscriptionId},
    feeds::{FeedKind, FeedLoader, FeedSource},
    log_info, log_warn,
    models::{
        style::{color_for, set_color},
        validation::{validate_color, validate_text, ValidationError},
        ChecklistItem, Identity, MustSee, PoiFields, PointOfInterest,
    },
    reconcile::{self, ReconciledRecord},
    registry::{MarkerFilter, MarkerRegistry},
    settings::Settings,
    store::{LocalStore, NamespaceKind, UserData},
    tracker::{self, ProgressScope, ProgressSnapshot},
};

use super::view::{RecordDetails, ViewState};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Keep the visited flag of a deleted place so re-adding it restores it.
    pub retain_visited_on_delete: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            retain_visited_on_delete: true,
        }
    }
}

impl From<&Settings> for Options {
    fn from(settings: &Settings) -> Self {
        Self {
            retain_visited_on_delete: settings.retain_visited_on_delete,
        }
    }
}

struct MapState {
    user: UserData,
    feeds: BTreeMap<FeedKind, Vec<PointOfInterest>>,
    registry: MarkerRegistry,
    bus: EventBus<MapEvent>,
    scope: ProgressScope,
}

impl MapState {
    fn rebuild(&mut self) {
        let feeds = FeedKind::ALL
            .iter()
            .filter_map(|kind| self.feeds.get(kind).map(Vec::as_slice));
        let records = reconcile::reconcile(feeds, &self.user);
        self.registry.rebuild(records);
    }

    fn current(&self, identity: &Identity) -> Result<ReconciledRecord> {
        let entry = self
            .registry
            .get(identity)
            .ok_or_else(|| anyhow!("unknown place '{identity}'"))?;
        Ok(ReconciledRecord {
            record: entry.record.clone(),
            provenance: entry.provenance.clone(),
            visited: entry.visited,
        })
    }

    fn details(&self, identity: &Identity) -> Option<RecordDetails> {
        let entry = self.registry.get(identity)?;
        let must_sees = self
            .user
            .must_sees
            .get(identity)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Some(RecordDetails::from_entry(entry, &self.user.styles, must_sees))
    }

    fn progress(&self) -> ProgressSnapshot {
        tracker::progress_snapshot(&self.registry, &self.scope)
    }

    fn publish_progress(&self) -> ProgressSnapshot {
        let snapshot = self.progress();
        self.bus.publish(&MapEvent::ProgressChanged { snapshot });
        snapshot
    }
}

/// Marks `record` visited when its checklist is fully completed. Returns
/// whether the flag changed.
fn visit_if_complete(
    user: &mut UserData,
    record: &mut ReconciledRecord,
    changed: &mut BTreeSet<NamespaceKind>,
) -> bool {
    if record.visited || !tracker::checklist_complete(&record.record.checklist) {
        return false;
    }
    user.visited.insert(record.identity(), true);
    changed.insert(NamespaceKind::Visited);
    record.visited = true;
    true
}

/// The single application-state object. Every mutation runs under one lock:
/// validate, write the touched namespaces, then update the registry and
/// publish. A failed write leaves memory untouched.
#[derive(Clone)]
pub struct TravelMap {
    store: LocalStore,
    state: Arc<Mutex<MapState>>,
    options: Options,
}

impl TravelMap {
    /// Loads the stored user data and shows the custom places. Feeds are
    /// merged in as they arrive.
    pub async fn open(store: LocalStore, options: Options) -> Self {
        let user = store.load_user_data().await;
        let mut state = MapState {
            user,
            feeds: BTreeMap::new(),
            registry: MarkerRegistry::default(),
            bus: EventBus::default(),
            scope: ProgressScope::default(),
        };
        state.rebuild();
        log_info!("Travel map opened with {} stored places", state.registry.len());

        Self {
            store,
            state: Arc::new(Mutex::new(state)),
            options,
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    /// Replaces the records of one feed and rebuilds. Applying the same feed
    /// twice, or feeds in any order, gives the same registry.
    pub async fn apply_feed(&self, kind: FeedKind, records: Vec<PointOfInterest>) {
        let mut state = self.state.lock().await;
        log_info!("Applying {} feed with {} records", kind, records.len());
        state.feeds.insert(kind, records);
        state.rebuild();
        state.bus.publish(&MapEvent::RegistryRebuilt);
        state.publish_progress();
    }

    /// Loads every configured feed concurrently. A feed that fails is logged
    /// and left out; the others still load. Returns the feeds that loaded.
    pub async fn load_feeds(
        &self,
        loader: &FeedLoader,
        sources: &BTreeMap<FeedKind, FeedSource>,
    ) -> Vec<FeedKind> {
        let load = |kind: FeedKind| async move {
            let source = sources.get(&kind)?;
            match loader.load(kind, source).await {
                Ok(records) => {
                    self.apply_feed(kind, records).await;
                    Some(kind)
                }
                Err(err) => {
                    log_warn!("Failed to load {} feed: {:#}", kind, err);
                    None
                }
            }
        };

        let (locations, parks, countries) = tokio::join!(
            load(FeedKind::Locations),
            load(FeedKind::Parks),
            load(FeedKind::Countries)
        );
        [locations, parks, countries].into_iter().flatten().collect()
    }

    /// Re-reads everything from the store and rebuilds.
    pub async fn reload(&self) {
        let user = self.store.load_user_data().await;
        let mut state = self.state.lock().await;
        state.user = user;
        state.rebuild();
        state.bus.publish(&MapEvent::RegistryRebuilt);
        state.publish_progress();
    }

    async fn commit(
        &self,
        state: &mut MapState,
        user: UserData,
        changed: &BTreeSet<NamespaceKind>,
    ) -> Result<()> {
        self.store.persist(&user, changed).await?;
        state.user = user;
        Ok(())
    }

    /// Sets the visited flag of one place and returns progress for the
    /// selected scope.
    pub async fn toggle_visited(&self, identity: &Identity, visited: bool) -> Result<ProgressSnapshot> {
        let mut state = self.state.lock().await;
        if !state.registry.contains(identity) {
            bail!("unknown place '{identity}'");
        }

        let mut user = state.user.clone();
        user.visited.insert(identity.clone(), visited);
        self.commit(&mut state, user, &BTreeSet::from([NamespaceKind::Visited]))
            .await?;

        state.registry.set_visited(identity, visited);
        state.bus.publish(&MapEvent::MarkerUpdated {
            identity: identity.clone(),
        });
        Ok(state.publish_progress())
    }

    pub async fn edit_record(&self, identity: &Identity, fields: PoiFields) -> Result<RecordDetails> {
        let mut state = self.state.lock().await;
        let current = state.current(identity)?;

        let mut user = state.user.clone();
        let mut outcome = reconcile::edit_record(&mut user, &current, fields)?;
        let renamed = outcome.renamed();
        let new_identity = outcome.record.identity();
        if renamed && state.registry.contains(&new_identity) {
            return Err(ValidationError::AlreadyExists(outcome.record.record.name).into());
        }
        let completes = visit_if_complete(&mut user, &mut outcome.record, &mut outcome.changed);
        self.commit(&mut state, user, &outcome.changed).await?;

        state.registry.replace(&outcome.previous_identity, outcome.record);

        if renamed {
            log_info!("Renamed '{}' to '{}'", outcome.previous_identity, new_identity);
            state.bus.publish(&MapEvent::MarkerRemoved {
                identity: outcome.previous_identity,
            });
        }
        if completes {
            log_info!("Checklist for '{}' complete, marking visited", new_identity);
        }
        state.bus.publish(&MapEvent::MarkerUpdated {
            identity: new_identity.clone(),
        });
        state.publish_progress();

        state
            .details(&new_identity)
            .ok_or_else(|| anyhow!("'{new_identity}' vanished after edit"))
    }

    pub async fn delete_record(&self, identity: &Identity) -> Result<ProgressSnapshot> {
        let mut state = self.state.lock().await;
        let current = state.current(identity)?;

        let mut user = state.user.clone();
        let changed = reconcile::delete_record(
            &mut user,
            &current,
            self.options.retain_visited_on_delete,
        )?;
        self.commit(&mut state, user, &changed).await?;

        state.registry.remove(identity);
        log_info!("Deleted '{}'", identity);
        state.bus.publish(&MapEvent::MarkerRemoved {
            identity: identity.clone(),
        });
        Ok(state.publish_progress())
    }

    pub async fn add_custom_record(&self, fields: PoiFields) -> Result<RecordDetails> {
        let mut state = self.state.lock().await;

        let mut user = state.user.clone();
        let mut added = reconcile::add_custom_record(&mut user, fields)?;
        let mut changed = BTreeSet::from([NamespaceKind::Custom]);
        visit_if_complete(&mut user, &mut added, &mut changed);
        self.commit(&mut state, user, &changed).await?;

        let identity = added.identity();
        state.registry.upsert(added);
        log_info!("Added custom place '{}'", identity);
        state.bus.publish(&MapEvent::MarkerUpdated {
            identity: identity.clone(),
        });
        state.publish_progress();

        state
            .details(&identity)
            .ok_or_else(|| anyhow!("'{identity}' vanished after insert"))
    }

    /// Stores `checklist` for `identity` and refreshes the entry. Completing
    /// every item visits the place.
    async fn store_checklist(
        &self,
        state: &mut MapState,
        identity: &Identity,
        checklist: Vec<ChecklistItem>,
    ) -> Result<RecordDetails> {
        let mut current = state.current(identity)?;
        let mut user = state.user.clone();
        let mut changed = BTreeSet::from([NamespaceKind::Checklists]);

        let completes = tracker::checklist_complete(&checklist) && !current.visited;
        if completes {
            user.visited.insert(identity.clone(), true);
            changed.insert(NamespaceKind::Visited);
            current.visited = true;
        }
        user.checklists.insert(identity.clone(), checklist.clone());
        self.commit(state, user, &changed).await?;

        current.record.checklist = checklist;
        state.registry.upsert(current);
        state.bus.publish(&MapEvent::MarkerUpdated {
            identity: identity.clone(),
        });
        if completes {
            log_info!("Checklist for '{}' complete, marking visited", identity);
            state.publish_progress();
        }

        state
            .details(identity)
            .ok_or_else(|| anyhow!("unknown place '{identity}'"))
    }

    pub async fn set_checklist_item(
        &self,
        identity: &Identity,
        index: usize,
        completed: bool,
    ) -> Result<RecordDetails> {
        let mut state = self.state.lock().await;
        let mut checklist = state.current(identity)?.record.checklist;
        let item = checklist
            .get_mut(index)
            .ok_or_else(|| anyhow!("checklist item {index} does not exist"))?;
        item.completed = completed;
        self.store_checklist(&mut state, identity, checklist).await
    }

    pub async fn add_checklist_item(&self, identity: &Identity, task: &str) -> Result<RecordDetails> {
        let task = validate_text(task)?;
        let mut state = self.state.lock().await;
        let mut checklist = state.current(identity)?.record.checklist;
        checklist.push(ChecklistItem {
            task,
            completed: false,
        });
        self.store_checklist(&mut state, identity, checklist).await
    }

    async fn store_must_sees<F>(&self, identity: &Identity, mutate: F) -> Result<Vec<MustSee>>
    where
        F: FnOnce(&mut Vec<MustSee>) -> Result<()>,
    {
        let mut state = self.state.lock().await;
        if !state.registry.contains(identity) {
            bail!("unknown place '{identity}'");
        }

        let mut user = state.user.clone();
        let must_sees = user.must_sees.entry(identity.clone()).or_default();
        mutate(must_sees)?;
        let updated = must_sees.clone();
        if updated.is_empty() {
            user.must_sees.remove(identity);
        }
        self.commit(&mut state, user, &BTreeSet::from([NamespaceKind::MustSees]))
            .await?;
        Ok(updated)
    }

    pub async fn add_must_see(&self, identity: &Identity, text: &str) -> Result<Vec<MustSee>> {
        let text = validate_text(text)?;
        self.store_must_sees(identity, |items| {
            items.push(MustSee {
                text,
                checked: false,
            });
            Ok(())
        })
        .await
    }

    pub async fn set_must_see_checked(
        &self,
        identity: &Identity,
        index: usize,
        checked: bool,
    ) -> Result<Vec<MustSee>> {
        self.store_must_sees(identity, |items| {
            let item = items
                .get_mut(index)
                .ok_or_else(|| anyhow!("must-see {index} does not exist"))?;
            item.checked = checked;
            Ok(())
        })
        .await
    }

    pub async fn remove_must_see(&self, identity: &Identity, index: usize) -> Result<Vec<MustSee>> {
        self.store_must_sees(identity, |items| {
            if index >= items.len() {
                bail!("must-see {index} does not exist");
            }
            items.remove(index);
            Ok(())
        })
        .await
    }

    /// Stores a color for `category` and returns the places that need
    /// restyling.
    pub async fn set_category_color(&self, category: &str, color: &str) -> Result<Vec<Identity>> {
        validate_color(color)?;
        let category = validate_text(category)?;
        let mut state = self.state.lock().await;

        let mut user = state.user.clone();
        set_color(&mut user.styles, &category, color.to_string());
        self.commit(&mut state, user, &BTreeSet::from([NamespaceKind::Styles]))
            .await?;

        let identities = state.registry.identities_in_category(&category);
        state.bus.publish(&MapEvent::CategoryRestyled {
            category,
            color: color.to_string(),
            identities: identities.clone(),
        });
        Ok(identities)
    }

    pub async fn category_color(&self, category: &str) -> String {
        let state = self.state.lock().await;
        color_for(&state.user.styles, category)
    }

    pub async fn select_scope(&self, scope: ProgressScope) -> ProgressSnapshot {
        let mut state = self.state.lock().await;
        state.scope = scope;
        state.publish_progress()
    }

    pub async fn progress(&self) -> ProgressSnapshot {
        self.state.lock().await.progress()
    }

    pub async fn details(&self, identity: &Identity) -> Option<RecordDetails> {
        self.state.lock().await.details(identity)
    }

    pub async fn view_state(&self, filter: &MarkerFilter) -> ViewState {
        let state = self.state.lock().await;
        ViewState::build(&state.registry, &state.user.styles, filter, &state.scope)
    }

    pub async fn subscribe(&self, handler: Handler<MapEvent>) -> SubscriptionId {
        self.state.lock().await.bus.subscribe(handler)
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.lock().await.bus.unsubscribe(id)
    }

    pub async fn namespace_timestamps(&self) -> Result<Vec<NamespaceStamp>> {
        self.store.namespace_stamps().await
    }
}
