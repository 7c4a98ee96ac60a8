//! MealMe fulfillment adapter
//!
//! Two remote operations back the taco order lifecycle:
//! - restaurant search, accepting the first result within delivery range
//! - order placement, accepting only `ACCEPTED` or `PENDING` outcomes
//!
//! Callers depend on the [`FulfillmentApi`] trait; [`MealMeClient`] is the
//! HTTP implementation.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{FulfillmentApi, MealMeClient};
pub use config::{FulfillmentConfig, MAX_DELIVERY_DISTANCE_MILES};
pub use error::{FulfillmentError, FulfillmentResult, Operation};
pub use types::{PlaceOrderRequest, PlacedOrder, Restaurant};
