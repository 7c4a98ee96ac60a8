//! TacoOrder resource
//!
//! The spec half is written by users; the status half is written only by the
//! controller and records how far the order has progressed.

use crate::error::ValidationError;
use crate::ids::{ObjectKey, ObjectMeta};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declarative taco order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TacoOrder {
    pub metadata: ObjectMeta,

    pub spec: TacoOrderSpec,

    #[serde(default)]
    pub status: TacoOrderStatus,
}

impl TacoOrder {
    pub fn new(metadata: ObjectMeta, spec: TacoOrderSpec) -> Self {
        Self {
            metadata,
            spec,
            status: TacoOrderStatus::default(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        self.metadata.key()
    }

    pub fn phase(&self) -> Phase {
        self.status.phase
    }
}

/// Desired state of a taco order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacoOrderSpec {
    /// Number of tacos to order
    pub quantity: u32,

    /// Kind of taco, e.g. "carnitas" or "al pastor"
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variety: String,

    /// Secret holding `cardNumber`, `cardExpiry` and `cardCvv`
    pub payment_secret_name: String,

    /// Secret holding `street`, `city`, `state` and `zip`
    pub address_secret_name: String,
}

impl TacoOrderSpec {
    /// Schema-level checks applied by the store on create
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity < 1 {
            return Err(ValidationError::QuantityTooLow(self.quantity));
        }
        if self.payment_secret_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("paymentSecretName"));
        }
        if self.address_secret_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("addressSecretName"));
        }
        Ok(())
    }

    /// Line item name sent to the fulfillment API
    pub fn item_name(&self) -> String {
        let variety = self.variety.trim();
        if variety.is_empty() {
            "taco".to_string()
        } else {
            format!("{} taco", variety)
        }
    }
}

/// Observed state of a taco order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacoOrderStatus {
    #[serde(default)]
    pub phase: Phase,
}

impl TacoOrderStatus {
    pub fn with_phase(phase: Phase) -> Self {
        Self { phase }
    }
}

/// Lifecycle phase of a taco order
///
/// Serialized as `""`, `"Created"`, `"Paid"`, `"Delivered"`, `"Canceled"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// No reconciliation step has completed yet
    #[default]
    #[serde(rename = "")]
    Unset,

    /// Credentials resolved, fulfillment about to start
    Created,

    /// Fulfillment order accepted by the provider
    Paid,

    Delivered,

    Canceled,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Unset => "",
            Phase::Created => "Created",
            Phase::Paid => "Paid",
            Phase::Delivered => "Delivered",
            Phase::Canceled => "Canceled",
        }
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Delivered | Phase::Canceled)
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle
    ///
    /// Re-writing `Created` over `Created` is allowed so that a redelivered
    /// reconciliation can restart its pipeline.
    pub fn can_transition_to(&self, next: Phase) -> bool {
        match (self, next) {
            (Phase::Unset | Phase::Created, Phase::Created) => true,
            (Phase::Unset | Phase::Created, Phase::Canceled) => true,
            (Phase::Created, Phase::Paid) => true,
            (Phase::Paid, Phase::Delivered) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Unset => write!(f, "<unset>"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
