//! Taco Operator Types - Resource types for the taco order controller
//!
//! A `TacoOrder` is a declarative resource: the user states what they want
//! (quantity, variety, which secrets hold payment and address data) and the
//! controller drives the order's `status.phase` to a terminal outcome.
//!
//! ## Key Concepts
//!
//! - **ObjectKey**: Namespace + name identity of a stored resource
//! - **ResourceVersion**: Optimistic-concurrency token read with an object
//! - **TacoOrder**: Desired order (spec) plus observed phase (status)
//! - **Phase**: Forward-only lifecycle `"" -> Created -> Paid -> Delivered`,
//!   with `Canceled` as the failure terminal
//! - **Secret**: Namespaced key/value credential blob
//! - **PaymentCard** / **DeliveryAddress**: Typed views over secrets

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod ids;
pub mod order;
pub mod secret;

// Re-export main types
pub use error::{SecretError, ValidationError};
pub use ids::{ObjectKey, ObjectMeta, ResourceVersion, DEFAULT_NAMESPACE};
pub use order::{Phase, TacoOrder, TacoOrderSpec, TacoOrderStatus};
pub use secret::{DeliveryAddress, PaymentCard, Secret};
