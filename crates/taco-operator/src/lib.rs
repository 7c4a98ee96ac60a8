//! Taco operator library
//!
//! This module provides the core components of the taco operator:
//! - Storage interface, in-memory backend and manifest loading
//! - Resource client and order reconciler
//! - Work queue and watch-driven controller
//! - REST API and server lifecycle management

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod reconciler;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use client::ResourceClient;
pub use config::OperatorConfig;
pub use error::{ApiError, OperatorError, ReconcileError, Step, StorageError};
pub use reconciler::{CancelSignal, OrderReconciler, ReconcileOutcome};
pub use scheduler::{Controller, WorkQueue};
pub use server::Server;
pub use storage::{InMemoryStorage, Storage};
