//! Domain model for the GeoGuardian engine
//!
//! Plain serde types shared by every component. Persistence-shaped document
//! structs live in [`crate::db::schemas`] and convert to/from these.

mod alert;
mod event;
mod geofence;
mod location;

pub use alert::{
    Alert, AlertMetadata, AlertStatus, AlertType, DeliveryMethod, Recipient, RecipientStatus,
    Severity, SosMethod,
};
pub use event::{GeofenceEvent, ManualTrigger, TransitionKind};
pub use geofence::{ActiveHours, AlertSettings, DayOfWeek, Geofence, Geometry, Schedule};
pub use location::{LocationSample, LocationUpdate};
