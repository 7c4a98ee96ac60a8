//! Reconciliation dispatch

mod controller;
mod queue;

pub use controller::Controller;
pub use queue::WorkQueue;
