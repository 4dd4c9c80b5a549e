//! Geofence definitions: geometry, alert settings, and active schedules

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{self, Point};
use crate::model::Severity;
use crate::types::{GuardianError, Result};

/// Minimum circle radius in meters
pub const MIN_RADIUS_M: f64 = 1.0;

/// Maximum circle radius in meters (50 km)
pub const MAX_RADIUS_M: f64 = 50_000.0;

/// Geofence geometry, validated once at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Circle { center: Point, radius_m: f64 },
    Polygon { ring: Vec<Point> },
}

impl Geometry {
    /// Build a circle, checking the center coordinates and radius bounds.
    pub fn circle(center: Point, radius_m: f64) -> Result<Self> {
        center.validate()?;
        if !radius_m.is_finite() || !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&radius_m) {
            return Err(GuardianError::InvalidGeometry(format!(
                "circle radius must be within [{MIN_RADIUS_M}, {MAX_RADIUS_M}] meters, got {radius_m}"
            )));
        }
        Ok(Self::Circle { center, radius_m })
    }

    /// Build a polygon, checking every vertex and ring simplicity.
    ///
    /// The ring is implicitly closed; an explicitly closed ring is
    /// normalized by dropping the duplicate final point.
    pub fn polygon(mut ring: Vec<Point>) -> Result<Self> {
        if ring.len() > 3 && ring.first() == ring.last() {
            ring.pop();
        }
        for p in &ring {
            p.validate()?;
        }
        if !geo::ring_is_simple(&ring)? {
            return Err(GuardianError::InvalidGeometry(
                "polygon ring is self-intersecting".to_string(),
            ));
        }
        Ok(Self::Polygon { ring })
    }

    /// Whether a point falls inside this geometry.
    pub fn contains(&self, p: Point) -> Result<bool> {
        match self {
            Self::Circle { center, radius_m } => Ok(geo::point_in_circle(p, *center, *radius_m)),
            Self::Polygon { ring } => geo::point_in_polygon(p, ring),
        }
    }
}

/// Per-geofence alerting rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSettings {
    /// Fire an alert when a member enters the fence
    pub on_enter: bool,
    /// Fire an alert when a member exits the fence
    pub on_exit: bool,
    /// Fan alerts out to the member's guardians
    pub notify_guardians: bool,
    /// Also push the alert to the member themself
    pub notify_user: bool,
    /// Severity stamped on alerts from this fence
    pub severity: Severity,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            on_enter: true,
            on_exit: true,
            notify_guardians: true,
            notify_user: false,
            severity: Severity::Medium,
        }
    }
}

/// Day of week for schedule windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

impl DayOfWeek {
    /// All seven days
    pub fn every_day() -> HashSet<DayOfWeek> {
        [
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
            Self::Sunday,
        ]
        .into_iter()
        .collect()
    }
}

/// A daily time-of-day window, half-open `[start, end)`.
///
/// `end < start` crosses midnight; `start == end` covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl ActiveHours {
    /// Whether `t` falls within the window.
    pub fn contains(&self, t: NaiveTime) -> bool {
        if self.start == self.end {
            true
        } else if self.start < self.end {
            t >= self.start && t < self.end
        } else {
            t >= self.start || t < self.end
        }
    }
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
        }
    }
}

/// When a geofence's alerting is live.
///
/// Outside the active window the fence behaves as disabled: no transition
/// events, and membership state freezes at its last value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub is_active: bool,
    pub active_days: HashSet<DayOfWeek>,
    pub active_hours: ActiveHours,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            is_active: true,
            active_days: DayOfWeek::every_day(),
            active_hours: ActiveHours::default(),
        }
    }
}

impl Schedule {
    /// Whether the schedule is live at the given device-local time.
    pub fn is_active_at(&self, local: NaiveDateTime) -> bool {
        self.is_active
            && self.active_days.contains(&DayOfWeek::from(local.weekday()))
            && self.active_hours.contains(local.time())
    }
}

/// A named geographic region with enter/exit alerting rules.
///
/// Mutated only by its creator; soft-deactivated (`is_active = false`)
/// rather than hard-deleted while alerts reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geofence {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub creator_id: Uuid,
    /// Users whose movements are evaluated against this fence. The creator
    /// is implicitly included.
    pub member_user_ids: HashSet<Uuid>,
    pub geometry: Geometry,
    pub alert_settings: AlertSettings,
    pub schedule: Schedule,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Geofence {
    /// Create a geofence with validated geometry and default settings.
    pub fn new(name: impl Into<String>, creator_id: Uuid, geometry: Geometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            creator_id,
            member_user_ids: HashSet::new(),
            geometry,
            alert_settings: AlertSettings::default(),
            schedule: Schedule::default(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Whether this fence applies to the given user (member or creator).
    pub fn applies_to(&self, user_id: Uuid) -> bool {
        self.creator_id == user_id || self.member_user_ids.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2025-06-02 is a Monday
    fn monday(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_time(at(h, m))
    }

    #[test]
    fn test_radius_bounds_enforced() {
        let center = Point::new(-74.0060, 40.7128);
        assert!(Geometry::circle(center, 500.0).is_ok());
        assert!(Geometry::circle(center, 0.5).is_err());
        assert!(Geometry::circle(center, 60_000.0).is_err());
    }

    #[test]
    fn test_self_intersecting_polygon_rejected() {
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(matches!(
            Geometry::polygon(bowtie),
            Err(GuardianError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_closed_ring_normalized() {
        let ring = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 0.0),
        ];
        let geom = Geometry::polygon(ring).unwrap();
        match geom {
            Geometry::Polygon { ring } => assert_eq!(ring.len(), 3),
            _ => panic!("expected polygon"),
        }
    }

    #[test]
    fn test_schedule_day_window() {
        let schedule = Schedule {
            is_active: true,
            active_days: [DayOfWeek::Monday].into_iter().collect(),
            active_hours: ActiveHours {
                start: at(9, 0),
                end: at(17, 0),
            },
        };
        assert!(schedule.is_active_at(monday(9, 0)));
        assert!(schedule.is_active_at(monday(16, 59)));
        assert!(!schedule.is_active_at(monday(17, 0))); // half-open
        assert!(!schedule.is_active_at(monday(8, 59)));
        // Tuesday is outside active_days
        let tuesday = monday(12, 0) + chrono::Duration::days(1);
        assert!(!schedule.is_active_at(tuesday));
    }

    #[test]
    fn test_schedule_midnight_wraparound() {
        let schedule = Schedule {
            is_active: true,
            active_days: DayOfWeek::every_day(),
            active_hours: ActiveHours {
                start: at(22, 0),
                end: at(6, 0),
            },
        };
        assert!(schedule.is_active_at(monday(23, 30)));
        assert!(schedule.is_active_at(monday(5, 59)));
        assert!(!schedule.is_active_at(monday(6, 0)));
        assert!(!schedule.is_active_at(monday(12, 0)));
    }

    #[test]
    fn test_schedule_full_day_when_start_equals_end() {
        let schedule = Schedule::default();
        assert!(schedule.is_active_at(monday(0, 0)));
        assert!(schedule.is_active_at(monday(23, 59)));
    }

    #[test]
    fn test_inactive_schedule_never_live() {
        let schedule = Schedule {
            is_active: false,
            ..Schedule::default()
        };
        assert!(!schedule.is_active_at(monday(12, 0)));
    }

    #[test]
    fn test_creator_implicitly_included() {
        let creator = Uuid::new_v4();
        let fence = Geofence::new(
            "Home",
            creator,
            Geometry::circle(Point::new(-74.0, 40.7), 100.0).unwrap(),
        );
        assert!(fence.applies_to(creator));
        assert!(!fence.applies_to(Uuid::new_v4()));
    }
}
