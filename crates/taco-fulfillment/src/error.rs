//! Error types for fulfillment API calls

use std::fmt;
use thiserror::Error;

/// Remote operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SearchRestaurants,
    PlaceOrder,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SearchRestaurants => write!(f, "restaurant search"),
            Operation::PlaceOrder => write!(f, "order placement"),
        }
    }
}

/// Fulfillment errors
///
/// Each variant is either retryable (the same request may succeed later) or
/// permanent (repeating it cannot change the answer). See [`is_retryable`].
///
/// [`is_retryable`]: FulfillmentError::is_retryable
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The client could not be built from its configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, timeout, or body transfer failure
    #[error("MealMe {operation} transport error: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a status other than the expected success code
    #[error("MealMe {operation} failed, status code {status}")]
    Status {
        operation: Operation,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("MealMe {operation} returned a malformed response: {source}")]
    Decode {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },

    /// Search succeeded but no candidate is inside the delivery radius
    #[error("no restaurants found within {max_distance} miles")]
    NoRestaurantInRange { max_distance: f64 },

    /// Placement succeeded at the HTTP level but the order was not accepted
    #[error("MealMe order not accepted; status={status}")]
    OrderRejected { order_id: String, status: String },
}

/// Result type for fulfillment operations
pub type FulfillmentResult<T> = Result<T, FulfillmentError>;

impl FulfillmentError {
    pub(crate) fn transport(operation: Operation, source: reqwest::Error) -> Self {
        Self::Transport { operation, source }
    }

    /// Whether a later identical request may succeed
    ///
    /// Transport failures, timeouts, throttling and server errors are
    /// retryable. Client errors, malformed payloads and domain rejections are
    /// permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            FulfillmentError::Transport { .. } => true,
            FulfillmentError::Status { status, .. } => {
                matches!(*status, 408 | 429) || (500..600).contains(status)
            }
            FulfillmentError::Config(_)
            | FulfillmentError::Decode { .. }
            | FulfillmentError::NoRestaurantInRange { .. }
            | FulfillmentError::OrderRejected { .. } => false,
        }
    }
}
