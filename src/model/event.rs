//! Events flowing from membership evaluation into alert dispatch

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Point;
use crate::model::{AlertType, LocationSample, SosMethod};

/// Direction of a membership transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Enter,
    Exit,
}

/// A detected geofence boundary crossing.
///
/// Carries the triggering sample so dispatch can stamp the alert with the
/// exact position and battery level that caused it.
#[derive(Debug, Clone)]
pub struct GeofenceEvent {
    pub kind: TransitionKind,
    pub user_id: Uuid,
    pub geofence_id: Uuid,
    pub sample: LocationSample,
}

/// A user- or device-initiated alert (SOS button, panic gesture, low
/// battery), as opposed to one derived from movement.
#[derive(Debug, Clone)]
pub struct ManualTrigger {
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub location: Point,
    pub message: Option<String>,
    pub battery_level: Option<u8>,
    pub sos_method: Option<SosMethod>,
    pub auto_resolve: bool,
    pub resolve_after_minutes: Option<i64>,
}

impl ManualTrigger {
    /// An SOS trigger at the user's current position.
    pub fn sos(user_id: Uuid, location: Point, method: SosMethod) -> Self {
        Self {
            user_id,
            alert_type: AlertType::Sos,
            location,
            message: None,
            battery_level: None,
            sos_method: Some(method),
            auto_resolve: false,
            resolve_after_minutes: None,
        }
    }

    /// A panic trigger (silent SOS).
    pub fn panic(user_id: Uuid, location: Point) -> Self {
        Self {
            user_id,
            alert_type: AlertType::Panic,
            location,
            message: None,
            battery_level: None,
            sos_method: None,
            auto_resolve: false,
            resolve_after_minutes: None,
        }
    }

    /// A low-battery warning; auto-resolves after an hour since stale
    /// battery alerts have no ongoing value.
    pub fn low_battery(user_id: Uuid, location: Point, battery_level: u8) -> Self {
        Self {
            user_id,
            alert_type: AlertType::LowBattery,
            location,
            message: None,
            battery_level: Some(battery_level),
            sos_method: None,
            auto_resolve: true,
            resolve_after_minutes: Some(60),
        }
    }
}
