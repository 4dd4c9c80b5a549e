//! Location samples and the raw updates they are built from

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Point;
use crate::types::{GuardianError, Result};

/// Largest accepted device UTC offset, in minutes (UTC+/-15h covers every
/// real timezone with room for oddities)
const MAX_UTC_OFFSET_MINUTES: i32 = 15 * 60;

/// A raw location update as submitted by a device, before it is accepted
/// into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub user_id: Uuid,
    pub coordinates: Point,
    /// Reported GPS accuracy in meters
    pub accuracy: Option<f64>,
    /// Speed in m/s
    pub speed: Option<f64>,
    /// Heading in degrees clockwise from north
    pub heading: Option<f64>,
    /// Altitude in meters
    pub altitude: Option<f64>,
    /// Battery percentage, 0-100
    pub battery: Option<u8>,
    /// Device-reported UTC offset in minutes, drives schedule evaluation
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub captured_at: DateTime<Utc>,
}

impl LocationUpdate {
    /// Reject out-of-range coordinates, battery and offset values.
    pub fn validate(&self) -> Result<()> {
        self.coordinates.validate()?;

        if let Some(battery) = self.battery {
            if battery > 100 {
                return Err(GuardianError::InvalidInput(format!(
                    "battery percentage out of range: {battery}"
                )));
            }
        }

        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(GuardianError::InvalidInput(format!(
                "utc offset out of range: {} minutes",
                self.utc_offset_minutes
            )));
        }

        Ok(())
    }
}

/// An accepted, immutable location sample.
///
/// Append-only; the store retains samples for a bounded window (30 days)
/// and purges them afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSample {
    pub id: Uuid,
    pub user_id: Uuid,
    pub coordinates: Point,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<f64>,
    pub battery: Option<u8>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Build a sample from a validated update, assigning a fresh id.
    pub fn from_update(update: LocationUpdate) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: update.user_id,
            coordinates: update.coordinates,
            accuracy: update.accuracy,
            speed: update.speed,
            heading: update.heading,
            altitude: update.altitude,
            battery: update.battery,
            utc_offset_minutes: update.utc_offset_minutes,
            captured_at: update.captured_at,
        }
    }

    /// The capture time in the device's local timezone.
    ///
    /// Falls back to UTC when the stored offset cannot be represented.
    pub fn local_time(&self) -> NaiveDateTime {
        match FixedOffset::east_opt(self.utc_offset_minutes * 60) {
            Some(offset) => self.captured_at.with_timezone(&offset).naive_local(),
            None => self.captured_at.naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn update(lon: f64, lat: f64) -> LocationUpdate {
        LocationUpdate {
            user_id: Uuid::new_v4(),
            coordinates: Point::new(lon, lat),
            accuracy: Some(5.0),
            speed: None,
            heading: None,
            altitude: None,
            battery: Some(80),
            utc_offset_minutes: 0,
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_valid_update_accepted() {
        assert!(update(-74.0060, 40.7128).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        assert!(update(-190.0, 40.7).validate().is_err());
        assert!(update(-74.0, 95.0).validate().is_err());
    }

    #[test]
    fn test_battery_over_100_rejected() {
        let mut u = update(-74.0, 40.7);
        u.battery = Some(150);
        assert!(u.validate().is_err());
    }

    #[test]
    fn test_local_time_applies_offset() {
        let mut u = update(-74.0, 40.7);
        u.captured_at = "2025-06-01T12:00:00Z".parse().unwrap();
        u.utc_offset_minutes = -300; // UTC-5
        let sample = LocationSample::from_update(u);
        assert_eq!(sample.local_time().hour(), 7);
    }
}
