//! GeoGuardian Core - geofence evaluation and alert engine
//!
//! The algorithmic heart of the GeoGuardian location-sharing service: given
//! a stream of location updates, determine each user's membership in every
//! applicable geofence, detect enter/exit transitions, and drive the alert
//! pipeline out to guardians.
//!
//! ## Services
//!
//! - **Ingest**: validated, per-user-ordered location intake
//! - **Membership**: per (user, geofence) state tracking and transition detection
//! - **Dispatch**: alert creation, recipient fan-out, delivery retry, lifecycle
//! - **Sweep**: periodic auto-resolution of expired alerts
//! - **Store**: persistence boundary with MongoDB and in-memory backends
//! - **Notify**: delivery boundary with NATS fan-out to guardian subjects

pub mod config;
pub mod db;
pub mod dispatch;
pub mod engine;
pub mod geo;
pub mod guardians;
pub mod ingest;
pub mod logging;
pub mod membership;
pub mod model;
pub mod notify;
pub mod store;
pub mod types;

pub use config::Args;
pub use engine::{Engine, EngineConfig};
pub use types::{GuardianError, Result};
