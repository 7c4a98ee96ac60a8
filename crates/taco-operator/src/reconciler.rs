//! Order reconciler
//!
//! Drives one `TacoOrder` through its lifecycle:
//!
//! ```text
//! (unset) -> Created -> Paid -> Delivered
//! (unset | Created) -> Canceled
//! ```
//!
//! Each invocation re-reads the order, so it is safe to call repeatedly for
//! the same key. The one exception is an order found at `Created`: search and
//! placement run again. Placement carries an idempotency key derived from the
//! order's uid so a provider that honors it can deduplicate the retry.

use crate::client::ResourceClient;
use crate::error::{ReconcileError, Step};
use std::sync::Arc;
use taco_fulfillment::{FulfillmentApi, FulfillmentError, PlaceOrderRequest};
use taco_types::{ObjectKey, Phase, TacoOrder};
use tokio::sync::watch;
use tracing::instrument;

/// Cooperative cancellation observed between reconciliation steps
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A signal that is never raised
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map_or(false, |rx| *rx.borrow())
    }

    fn check(&self, step: Step) -> Result<(), ReconcileError> {
        if self.is_cancelled() {
            Err(ReconcileError::Cancelled { step })
        } else {
            Ok(())
        }
    }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order no longer exists
    Missing,

    /// The order was already in a terminal phase; nothing was done
    Terminal(Phase),

    /// The order reached `Delivered`
    ///
    /// `order_id` is the provider's order id when this invocation placed it,
    /// `None` when an earlier invocation had already reached `Paid`.
    Delivered { order_id: Option<String> },
}

/// Reconciles taco orders against the fulfillment provider
pub struct OrderReconciler {
    resources: ResourceClient,
    fulfillment: Arc<dyn FulfillmentApi>,
}

impl OrderReconciler {
    pub fn new(resources: ResourceClient, fulfillment: Arc<dyn FulfillmentApi>) -> Self {
        Self {
            resources,
            fulfillment,
        }
    }

    /// Reconcile the order identified by `key`
    #[instrument(skip(self, key, cancel), fields(order = %key))]
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        cancel: &CancelSignal,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        cancel.check(Step::FetchOrder)?;
        let Some(mut order) = self.resources.get_order(key).await? else {
            tracing::debug!("Order not found, nothing to reconcile");
            return Ok(ReconcileOutcome::Missing);
        };

        match order.phase() {
            phase if phase.is_terminal() => {
                tracing::debug!(phase = %phase, "Order is terminal");
                return Ok(ReconcileOutcome::Terminal(phase));
            }
            Phase::Paid => {
                // Placement already succeeded; only the final write is missing.
                cancel.check(Step::MarkDelivered)?;
                self.resources
                    .update_phase(&mut order, Phase::Delivered, Step::MarkDelivered)
                    .await?;
                return Ok(ReconcileOutcome::Delivered { order_id: None });
            }
            _ => {}
        }

        cancel.check(Step::ResolvePayment)?;
        let payment = self.resources.payment_card(&order).await?;

        cancel.check(Step::ResolveAddress)?;
        let address = self.resources.delivery_address(&order).await?.to_string();

        cancel.check(Step::MarkCreated)?;
        self.resources
            .update_phase(&mut order, Phase::Created, Step::MarkCreated)
            .await?;

        cancel.check(Step::SearchRestaurant)?;
        let restaurant = match self
            .fulfillment
            .search_restaurant(&address, &order.spec.variety)
            .await
        {
            Ok(restaurant) => restaurant,
            Err(source) => {
                return Err(self.fail(&mut order, Step::SearchRestaurant, source).await);
            }
        };
        tracing::info!(
            restaurant_id = %restaurant.id,
            restaurant = %restaurant.name,
            distance = restaurant.distance,
            "Restaurant selected"
        );

        cancel.check(Step::PlaceOrder)?;
        let request = PlaceOrderRequest {
            restaurant_id: restaurant.id,
            item_name: order.spec.item_name(),
            quantity: order.spec.quantity,
            delivery_address: address,
            payment,
            idempotency_key: Some(idempotency_key(&order)),
        };
        let placed = match self.fulfillment.place_order(&request).await {
            Ok(placed) => placed,
            Err(source) => return Err(self.fail(&mut order, Step::PlaceOrder, source).await),
        };
        tracing::info!(
            order_id = %placed.order_id,
            status = %placed.status,
            "Fulfillment order placed"
        );

        // The remote order exists now, so both writes run even if cancelled.
        self.resources
            .update_phase(&mut order, Phase::Paid, Step::MarkPaid)
            .await?;
        self.resources
            .update_phase(&mut order, Phase::Delivered, Step::MarkDelivered)
            .await?;

        Ok(ReconcileOutcome::Delivered {
            order_id: Some(placed.order_id),
        })
    }

    /// Turn a fulfillment failure into the error surfaced to the dispatcher
    ///
    /// Permanent failures cancel the order first. Retryable ones leave it at
    /// `Created` for the next delivery.
    async fn fail(
        &self,
        order: &mut TacoOrder,
        step: Step,
        source: FulfillmentError,
    ) -> ReconcileError {
        let err = ReconcileError::Fulfillment { step, source };
        if err.is_retryable() {
            tracing::warn!(error = %err, "Fulfillment call failed, will retry");
            return err;
        }

        match self
            .resources
            .update_phase(order, Phase::Canceled, Step::MarkCanceled)
            .await
        {
            Ok(()) => {
                tracing::warn!(error = %err, "Order canceled");
                err
            }
            Err(write_err) => {
                tracing::error!(
                    error = %err,
                    write_error = %write_err,
                    "Failed to record cancellation"
                );
                write_err
            }
        }
    }
}

/// Stable key identifying one logical placement of `order`
pub fn idempotency_key(order: &TacoOrder) -> String {
    let uid = order
        .metadata
        .uid
        .map(|uid| uid.to_string())
        .unwrap_or_default();
    format!("{}/{}/{}", order.metadata.namespace, order.metadata.name, uid)
}
