//! Core error and result types for the engine
//!
//! One central error enum shared by every module; callers match on the
//! variant to distinguish rejected input from infrastructure failure.

use thiserror::Error;
use uuid::Uuid;

use crate::model::AlertStatus;

/// Errors produced by the GeoGuardian engine
#[derive(Debug, Error)]
pub enum GuardianError {
    /// Malformed coordinates, timestamps, or other caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed geofence geometry (bad radius, degenerate ring, ...)
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Attempted alert lifecycle transition that the state machine forbids
    #[error("Invalid alert transition: {from} -> {to}")]
    InvalidAlertTransition { from: AlertStatus, to: AlertStatus },

    /// Alert id does not resolve to a stored alert
    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    /// Persistence layer unavailable or rejected the operation
    #[error("Store unavailable: {0}")]
    Store(String),

    /// Per-recipient delivery failure (recorded on the recipient, never
    /// escalated to fail the alert itself)
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// NATS connection or publish failure
    #[error("NATS error: {0}")]
    Nats(String),

    /// Invariant violation inside the engine
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, GuardianError>;
