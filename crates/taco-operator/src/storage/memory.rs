//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use taco_types::{ObjectKey, ResourceVersion, Secret, TacoOrder, TacoOrderStatus};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// In-memory storage for development and testing
///
/// Resource versions come from one store-wide counter, so every write yields
/// a version strictly greater than any earlier one.
#[derive(Debug)]
pub struct InMemoryStorage {
    orders: Arc<RwLock<HashMap<ObjectKey, TacoOrder>>>,
    secrets: Arc<RwLock<HashMap<ObjectKey, Secret>>>,
    version: Arc<AtomicU64>,
    events: broadcast::Sender<WatchEvent>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            secrets: Arc::new(RwLock::new(HashMap::new())),
            version: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    fn next_version(&self) -> ResourceVersion {
        ResourceVersion::new(self.version.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn emit(&self, event: WatchEvent) {
        // No subscribers is fine; the controller may not be running yet.
        let _ = self.events.send(event);
    }
}

impl Storage for InMemoryStorage {
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }
}

#[async_trait]
impl OrderStorage for InMemoryStorage {
    async fn get_order(&self, key: &ObjectKey) -> StorageResult<Option<TacoOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(key).cloned())
    }

    async fn list_orders(&self) -> StorageResult<Vec<TacoOrder>> {
        let orders = self.orders.read().await;
        let mut list: Vec<_> = orders.values().cloned().collect();
        list.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(list)
    }

    async fn create_order(&self, mut order: TacoOrder) -> StorageResult<TacoOrder> {
        order
            .spec
            .validate()
            .map_err(|e| StorageError::Invalid(e.to_string()))?;

        let key = order.key();
        let mut orders = self.orders.write().await;
        if orders.contains_key(&key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        order.metadata.uid = Some(Uuid::new_v4());
        order.metadata.resource_version = self.next_version();
        order.metadata.generation = 1;
        order.metadata.creation_timestamp = Some(chrono::Utc::now());
        order.status = TacoOrderStatus::default();

        orders.insert(key.clone(), order.clone());
        drop(orders);

        tracing::debug!(order = %key, "Order created");
        self.emit(WatchEvent::Applied(key));
        Ok(order)
    }

    async fn update_status(
        &self,
        key: &ObjectKey,
        status: TacoOrderStatus,
        expected: ResourceVersion,
    ) -> StorageResult<TacoOrder> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(key)
            .ok_or_else(|| StorageError::NotFound(format!("TacoOrder {}", key)))?;

        if stored.metadata.resource_version != expected {
            return Err(StorageError::Conflict {
                key: key.clone(),
                expected,
                actual: stored.metadata.resource_version,
            });
        }

        stored.status = status;
        stored.metadata.resource_version = self.next_version();
        let updated = stored.clone();
        drop(orders);

        self.emit(WatchEvent::Applied(key.clone()));
        Ok(updated)
    }

    async fn delete_order(&self, key: &ObjectKey) -> StorageResult<bool> {
        let removed = self.orders.write().await.remove(key).is_some();
        if removed {
            self.emit(WatchEvent::Deleted(key.clone()));
        }
        Ok(removed)
    }
}

#[async_trait]
impl SecretStorage for InMemoryStorage {
    async fn get_secret(&self, key: &ObjectKey) -> StorageResult<Option<Secret>> {
        let secrets = self.secrets.read().await;
        Ok(secrets.get(key).cloned())
    }

    async fn upsert_secret(&self, mut secret: Secret) -> StorageResult<()> {
        secret.metadata.resource_version = self.next_version();
        let mut secrets = self.secrets.write().await;
        secrets.insert(secret.key(), secret);
        Ok(())
    }
}
