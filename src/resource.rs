//! Resource Modules
//!
//! Generic store module for the CRUD collections mirrored from the master
//! (slaves, targets, users).
//!
//! # Reconciliation rules
//!
//! - fetch replaces the collection with the server's list, in server order
//! - create appends the entity returned by the server
//! - update replaces the entity with the same `ID` in place
//! - delete removes the entity whose `ID` the server confirmed
//!
//! `ID`s stay unique within a collection at all times.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::config::Config;
use crate::http::ApiClient;

// ============================================================================
// Identifiers
// ============================================================================

/// Server-assigned entity identifier, integer or string.
///
/// Two ids are equal when they render the same, so `5` matches `"5"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{}", id),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

impl PartialEq for EntityId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EntityId::Int(a), EntityId::Int(b)) => a == b,
            (EntityId::Text(a), EntityId::Text(b)) => a == b,
            _ => self.to_string() == other.to_string(),
        }
    }
}

impl Eq for EntityId {}

impl Hash for EntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        EntityId::Int(id)
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        EntityId::Int(id.into())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        EntityId::Text(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        EntityId::Text(id)
    }
}

/// Anything stored in a resource collection
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &EntityId;
}

/// Server answer to a delete: the confirmed `ID` plus whatever else it echoed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    #[serde(rename = "ID")]
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

// ============================================================================
// Collection
// ============================================================================

/// Ordered entity list with unique ids
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &EntityId) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Replace everything; later duplicates of an id are dropped
    pub fn replace_all(&mut self, items: Vec<T>) {
        let received = items.len();
        let mut unique: Vec<T> = Vec::with_capacity(received);
        for item in items {
            if !unique.iter().any(|kept| kept.id() == item.id()) {
                unique.push(item);
            }
        }

        if unique.len() != received {
            warn!(
                "Dropped {} entities with duplicate IDs from server list",
                received - unique.len()
            );
        }

        self.items = unique;
    }

    /// Append a new entity; an entity already holding its id is replaced instead
    pub fn append(&mut self, item: T) {
        match self.position(item.id()) {
            Some(idx) => {
                debug!(id = %item.id(), "Created entity already present, replacing");
                self.items[idx] = item;
            }
            None => self.items.push(item),
        }
    }

    /// Replace the entity with the same id; false when none matched
    pub fn replace(&mut self, item: T) -> bool {
        match self.position(item.id()) {
            Some(idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    /// Remove the entity with `id`
    pub fn remove(&mut self, id: &EntityId) -> Option<T> {
        self.position(id).map(|idx| self.items.remove(idx))
    }
}

// ============================================================================
// Fetch sequencing
// ============================================================================

/// Orders wholesale-replacing fetches of one state slice.
///
/// Every fetch takes a ticket before its request goes out. A response is
/// committed only if no newer ticket has been committed yet; the check must
/// run while the slice's write lock is held.
#[derive(Debug)]
pub struct FetchSequencer {
    enabled: bool,
    issued: AtomicU64,
    committed: AtomicU64,
}

impl FetchSequencer {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            issued: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        }
    }

    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Claim the commit for `ticket`; false if a newer fetch already landed
    pub fn try_commit(&self, ticket: u64) -> bool {
        if !self.enabled {
            return true;
        }

        self.committed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (ticket > current).then_some(ticket)
            })
            .is_ok()
    }
}

// ============================================================================
// Resource definition
// ============================================================================

/// Static description of one CRUD resource of the master API
pub trait Resource: Send + Sync + 'static {
    /// Entity mirrored in the collection
    type Entity: Entity;

    /// Payload accepted by `create`
    type Draft: Send + Sync;

    /// Name used in log lines
    const NAME: &'static str;

    /// Path below the API base, e.g. `/slaves`
    const PATH: &'static str;

    /// Re-fetch the whole list after a successful update
    const REFETCH_AFTER_UPDATE: bool = false;

    /// Query parameters carrying a create payload
    fn create_query(draft: &Self::Draft) -> Vec<(&'static str, String)>;

    /// Wire form of an entity sent with an update
    fn prepare_update(entity: &Self::Entity) -> Self::Entity {
        entity.clone()
    }
}

// ============================================================================
// Module
// ============================================================================

/// Store module owning one resource collection
pub struct ResourceModule<R: Resource> {
    api: ApiClient,
    collection: RwLock<Collection<R::Entity>>,
    sequencer: FetchSequencer,
    last_limit: AtomicU32,
    default_limit: u32,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceModule<R> {
    pub fn new(api: ApiClient, config: &Config) -> Self {
        Self {
            api,
            collection: RwLock::new(Collection::new()),
            sequencer: FetchSequencer::new(config.sequenced_fetch),
            last_limit: AtomicU32::new(0),
            default_limit: config.default_limit,
            _resource: PhantomData,
        }
    }

    // ------------------------------------------------------------------
    // Getters
    // ------------------------------------------------------------------

    pub fn items(&self) -> Vec<R::Entity> {
        self.collection.read().items().to_vec()
    }

    pub fn get(&self, id: &EntityId) -> Option<R::Entity> {
        self.collection.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.collection.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.read().is_empty()
    }

    pub fn snapshot(&self) -> Collection<R::Entity> {
        self.collection.read().clone()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn set_items(&self, items: Vec<R::Entity>) {
        self.collection.write().replace_all(items);
    }

    pub fn add_item(&self, item: R::Entity) {
        self.collection.write().append(item);
    }

    pub fn replace_item(&self, item: R::Entity) -> bool {
        self.collection.write().replace(item)
    }

    pub fn remove_item(&self, id: &EntityId) -> Option<R::Entity> {
        self.collection.write().remove(id)
    }

    fn commit_fetch(&self, ticket: u64, items: Vec<R::Entity>) -> bool {
        let mut collection = self.collection.write();
        if !self.sequencer.try_commit(ticket) {
            debug!(resource = R::NAME, ticket, "Discarding stale fetch response");
            return false;
        }
        collection.replace_all(items);
        true
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Replace the collection with up to `limit` entities from the server.
    ///
    /// Returns true when the collection was replaced.
    pub async fn fetch(&self, limit: u32) -> bool {
        let Some(api) = self.api.authorized() else {
            debug!(resource = R::NAME, "Not authorized, skipping fetch");
            return false;
        };

        self.last_limit.store(limit, Ordering::Relaxed);
        let ticket = self.sequencer.ticket();

        // The master encodes an empty list as `null`
        let result = api
            .get::<Option<Vec<R::Entity>>>(R::PATH, &[("limit", limit.to_string())])
            .await;

        match result {
            Ok(items) => {
                let items = items.unwrap_or_default();
                let count = items.len();
                let committed = self.commit_fetch(ticket, items);
                if committed {
                    debug!(resource = R::NAME, count, "Collection replaced");
                }
                committed
            }
            Err(e) => {
                warn!(resource = R::NAME, "Fetch failed: {}", e);
                false
            }
        }
    }

    /// Create an entity and append the server's copy
    pub async fn create(&self, draft: &R::Draft) -> Option<R::Entity> {
        let Some(api) = self.api.authorized() else {
            debug!(resource = R::NAME, "Not authorized, skipping create");
            return None;
        };

        let query = R::create_query(draft);
        match api.post::<R::Entity>(R::PATH, &query).await {
            Ok(created) => {
                debug!(resource = R::NAME, id = %created.id(), "Entity created");
                self.add_item(created.clone());
                Some(created)
            }
            Err(e) => {
                warn!(resource = R::NAME, "Create failed: {}", e);
                None
            }
        }
    }

    /// Submit the full entity and replace the local copy with the server's
    pub async fn update(&self, entity: &R::Entity) -> Option<R::Entity> {
        let Some(api) = self.api.authorized() else {
            debug!(resource = R::NAME, "Not authorized, skipping update");
            return None;
        };

        let body = R::prepare_update(entity);
        let updated = match api.put::<R::Entity, _>(R::PATH, &body).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(resource = R::NAME, id = %entity.id(), "Update failed: {}", e);
                return None;
            }
        };

        if !self.replace_item(updated.clone()) {
            debug!(resource = R::NAME, id = %updated.id(), "Updated entity not in local collection");
        }

        if R::REFETCH_AFTER_UPDATE {
            self.fetch(self.refetch_limit()).await;
        }

        Some(updated)
    }

    /// Delete by id; the entity removed locally is the one the server confirmed
    pub async fn delete(&self, id: impl Into<EntityId>) -> Option<DeleteReceipt> {
        let Some(api) = self.api.authorized() else {
            debug!(resource = R::NAME, "Not authorized, skipping delete");
            return None;
        };

        let id = id.into();
        match api.delete::<DeleteReceipt>(R::PATH, &id.to_string()).await {
            Ok(receipt) => {
                if self.remove_item(&receipt.id).is_none() {
                    debug!(resource = R::NAME, id = %receipt.id, "Deleted entity not in local collection");
                }
                Some(receipt)
            }
            Err(e) => {
                warn!(resource = R::NAME, %id, "Delete failed: {}", e);
                None
            }
        }
    }

    /// Limit of the last fetch, or the configured default
    fn refetch_limit(&self) -> u32 {
        match self.last_limit.load(Ordering::Relaxed) {
            0 => self.default_limit,
            limit => limit,
        }
    }
}
