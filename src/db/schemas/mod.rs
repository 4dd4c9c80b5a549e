//! Document schemas for the GeoGuardian collections
//!
//! Persistence-shaped structs with declared indexes; each converts to and
//! from the domain types in [`crate::model`].

mod alert;
mod geofence;
mod guardian;
mod location;

pub use alert::{AlertDoc, ALERT_COLLECTION};
pub use geofence::{GeofenceDoc, GEOFENCE_COLLECTION};
pub use guardian::{GuardianDoc, GUARDIAN_COLLECTION};
pub use location::{LocationDoc, LOCATION_COLLECTION};

use uuid::Uuid;

use crate::types::{GuardianError, Result};

/// Parse a stored uuid, mapping corruption to a store error.
pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| GuardianError::Store(format!("corrupt document: bad {field} uuid: {e}")))
}
