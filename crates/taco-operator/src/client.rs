//! Resource client used by the reconciler
//!
//! Thin typed layer over [`Storage`]: every call is a direct round trip, and
//! every failure comes back tagged with the reconciliation step it belongs to.

use crate::error::{ReconcileError, Step, StorageError};
use crate::storage::{OrderStorage, SecretStorage, Storage};
use std::sync::Arc;
use taco_types::{
    DeliveryAddress, ObjectKey, PaymentCard, Phase, Secret, TacoOrder, TacoOrderStatus,
};

/// Access to orders and their credential secrets
#[derive(Clone)]
pub struct ResourceClient {
    storage: Arc<dyn Storage>,
}

impl ResourceClient {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Fetch the current order, `None` if it was deleted
    pub async fn get_order(&self, key: &ObjectKey) -> Result<Option<TacoOrder>, ReconcileError> {
        self.storage
            .get_order(key)
            .await
            .map_err(|source| ReconcileError::Storage {
                step: Step::FetchOrder,
                source,
            })
    }

    /// Persist a new phase for `order`
    ///
    /// The write carries the snapshot's resource version and fails with a
    /// conflict if anyone else wrote in between. On success `order` is
    /// replaced by the stored copy so the next write presents the new version.
    pub async fn update_phase(
        &self,
        order: &mut TacoOrder,
        phase: Phase,
        step: Step,
    ) -> Result<(), ReconcileError> {
        let from = order.phase();
        if !from.can_transition_to(phase) {
            return Err(ReconcileError::InvalidTransition {
                step,
                from,
                to: phase,
            });
        }

        let updated = self
            .storage
            .update_status(
                &order.key(),
                TacoOrderStatus::with_phase(phase),
                order.metadata.resource_version,
            )
            .await
            .map_err(|source| ReconcileError::Storage { step, source })?;

        tracing::info!(
            order = %updated.key(),
            from = %from,
            to = %phase,
            resource_version = %updated.metadata.resource_version,
            "Phase updated"
        );

        *order = updated;
        Ok(())
    }

    /// Fetch a secret from the order's namespace
    pub async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
        step: Step,
    ) -> Result<Secret, ReconcileError> {
        let key = ObjectKey::new(namespace, name);
        match self.storage.get_secret(&key).await {
            Ok(Some(secret)) => Ok(secret),
            Ok(None) | Err(StorageError::NotFound(_)) => {
                Err(ReconcileError::SecretNotFound { step, key })
            }
            Err(source) => Err(ReconcileError::Storage { step, source }),
        }
    }

    /// Resolve the payment card referenced by `order`
    pub async fn payment_card(&self, order: &TacoOrder) -> Result<PaymentCard, ReconcileError> {
        let step = Step::ResolvePayment;
        let secret = self
            .get_secret(
                &order.metadata.namespace,
                &order.spec.payment_secret_name,
                step,
            )
            .await?;
        PaymentCard::from_secret(&secret).map_err(|source| ReconcileError::Secret { step, source })
    }

    /// Resolve the delivery address referenced by `order`
    pub async fn delivery_address(
        &self,
        order: &TacoOrder,
    ) -> Result<DeliveryAddress, ReconcileError> {
        let step = Step::ResolveAddress;
        let secret = self
            .get_secret(
                &order.metadata.namespace,
                &order.spec.address_secret_name,
                step,
            )
            .await?;
        DeliveryAddress::from_secret(&secret)
            .map_err(|source| ReconcileError::Secret { step, source })
    }
}

impl std::fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient").finish_non_exhaustive()
    }
}
