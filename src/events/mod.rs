//! Synchronous observer bus between the controller and whatever renders it.
//!
//! Handlers run on the publisher's thread, in subscription order, before
//! `publish` returns.

use serde::Serialize;

use crate::models::Identity;
use crate::tracker::ProgressSnapshot;

/// Events published by the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MapEvent {
    /// The whole registry was rebuilt after a feed arrived.
    RegistryRebuilt,
    MarkerUpdated { identity: Identity },
    MarkerRemoved { identity: Identity },
    ProgressChanged { snapshot: ProgressSnapshot },
    #[serde(rename_all = "camelCase")]
    CategoryRestyled {
        category: String,
        color: String,
        identities: Vec<Identity>,
    },
}

impl MapEvent {
    /// Name used when forwarding to the webview.
    pub fn channel(&self) -> &'static str {
        match self {
            MapEvent::RegistryRebuilt => "registry-rebuilt",
            MapEvent::MarkerUpdated { .. } => "marker-updated",
            MapEvent::MarkerRemoved { .. } => "marker-removed",
            MapEvent::ProgressChanged { .. } => "progress-changed",
            MapEvent::CategoryRestyled { .. } => "category-restyled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

pub type Handler<E> = Box<dyn Fn(&E) + Send + Sync>;

pub struct EventBus<E> {
    handlers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u64,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }
}

impl<E> EventBus<E> {
    pub fn subscribe(&mut self, handler: Handler<E>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.handlers.push((id, handler));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(existing, _)| *existing != id);
        self.handlers.len() != before
    }

    pub fn publish(&self, event: &E) {
        for (_, handler) in &self.handlers {
            handler(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}
