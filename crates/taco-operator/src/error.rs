//! Error types for taco-operator

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use taco_fulfillment::FulfillmentError;
use taco_types::{ObjectKey, Phase, ResourceVersion, SecretError};
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("Server error: {0}")]
    Server(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Manifest could not be read or parsed
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Fulfillment client could not be constructed
    #[error("Fulfillment error: {0}")]
    Fulfillment(#[from] FulfillmentError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Create of an identity that already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Optimistic-concurrency rejection
    #[error("Conflict: {key} is at version {actual}, write expected {expected}")]
    Conflict {
        key: ObjectKey,
        expected: ResourceVersion,
        actual: ResourceVersion,
    },

    /// Rejected by schema validation
    #[error("Invalid data: {0}")]
    Invalid(String),
}

/// Reconciliation step, used to annotate errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    FetchOrder,
    ResolvePayment,
    ResolveAddress,
    MarkCreated,
    SearchRestaurant,
    PlaceOrder,
    MarkPaid,
    MarkDelivered,
    MarkCanceled,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::FetchOrder => "fetch order",
            Step::ResolvePayment => "fetch payment secret",
            Step::ResolveAddress => "fetch address secret",
            Step::MarkCreated => "update phase to Created",
            Step::SearchRestaurant => "restaurant search",
            Step::PlaceOrder => "order placement",
            Step::MarkPaid => "update phase to Paid",
            Step::MarkDelivered => "update phase to Delivered",
            Step::MarkCanceled => "update phase to Canceled",
        };
        f.write_str(name)
    }
}

/// Reconciliation errors, each tagged with the step that failed
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{step} failed: {source}")]
    Storage {
        step: Step,
        #[source]
        source: StorageError,
    },

    #[error("{step} failed: secret {key} not found")]
    SecretNotFound { step: Step, key: ObjectKey },

    #[error("{step} failed: {source}")]
    Secret {
        step: Step,
        #[source]
        source: SecretError,
    },

    #[error("{step} failed: phase cannot move from {from} to {to}")]
    InvalidTransition { step: Step, from: Phase, to: Phase },

    #[error("{step} failed: {source}")]
    Fulfillment {
        step: Step,
        #[source]
        source: FulfillmentError,
    },

    #[error("reconciliation cancelled before {step}")]
    Cancelled { step: Step },
}

impl ReconcileError {
    pub fn step(&self) -> Step {
        match self {
            ReconcileError::Storage { step, .. }
            | ReconcileError::SecretNotFound { step, .. }
            | ReconcileError::Secret { step, .. }
            | ReconcileError::InvalidTransition { step, .. }
            | ReconcileError::Fulfillment { step, .. }
            | ReconcileError::Cancelled { step } => *step,
        }
    }

    /// Whether the dispatcher should redeliver with backoff
    ///
    /// Permanent fulfillment failures have already moved the order to
    /// `Canceled`, and an invalid transition will not fix itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReconcileError::Fulfillment { source, .. } => source.is_retryable(),
            ReconcileError::InvalidTransition { .. } => false,
            ReconcileError::Storage { .. }
            | ReconcileError::SecretNotFound { .. }
            | ReconcileError::Secret { .. }
            | ReconcileError::Cancelled { .. } => true,
        }
    }
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Storage(StorageError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Storage(StorageError::AlreadyExists(_)) => (StatusCode::CONFLICT, "ALREADY_EXISTS"),
            ApiError::Storage(StorageError::Conflict { .. }) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Storage(StorageError::Invalid(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for daemon operations
pub type OperatorResult<T> = Result<T, OperatorError>;
