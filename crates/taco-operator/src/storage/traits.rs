//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use taco_types::{ObjectKey, ResourceVersion, Secret, TacoOrder, TacoOrderStatus};
use tokio::sync::broadcast;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Change notification emitted by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An order was created or its status changed
    Applied(ObjectKey),

    /// An order was removed
    Deleted(ObjectKey),
}

impl WatchEvent {
    pub fn key(&self) -> &ObjectKey {
        match self {
            WatchEvent::Applied(key) | WatchEvent::Deleted(key) => key,
        }
    }
}

/// Combined storage trait
pub trait Storage: OrderStorage + SecretStorage + Send + Sync {
    /// Subscribe to order change events
    fn subscribe(&self) -> broadcast::Receiver<WatchEvent>;
}

/// Storage for taco orders
#[async_trait]
pub trait OrderStorage: Send + Sync {
    /// Get an order by identity
    async fn get_order(&self, key: &ObjectKey) -> StorageResult<Option<TacoOrder>>;

    /// List all orders
    async fn list_orders(&self) -> StorageResult<Vec<TacoOrder>>;

    /// Create an order; the store assigns uid and version and validates the spec
    async fn create_order(&self, order: TacoOrder) -> StorageResult<TacoOrder>;

    /// Replace an order's status if its version still equals `expected`
    ///
    /// Returns the stored order with its new version.
    async fn update_status(
        &self,
        key: &ObjectKey,
        status: TacoOrderStatus,
        expected: ResourceVersion,
    ) -> StorageResult<TacoOrder>;

    /// Delete an order by identity
    async fn delete_order(&self, key: &ObjectKey) -> StorageResult<bool>;
}

/// Storage for credential secrets
#[async_trait]
pub trait SecretStorage: Send + Sync {
    /// Get a secret by identity
    async fn get_secret(&self, key: &ObjectKey) -> StorageResult<Option<Secret>>;

    /// Create or replace a secret
    async fn upsert_secret(&self, secret: Secret) -> StorageResult<()>;
}
