//! Location sample documents
//!
//! Append-only; a TTL index purges samples after 30 days, matching the
//! bounded retention window for raw movement data.

use std::time::Duration;

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Metadata, MutMetadata};
use crate::db::schemas::parse_uuid;
use crate::geo::Point;
use crate::model::LocationSample;
use crate::types::Result;

/// Collection name for location samples
pub const LOCATION_COLLECTION: &str = "locations";

/// Retention window for raw location data
const LOCATION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Location sample document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LocationDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Domain sample id (uuid string)
    pub sample_id: String,

    /// Owning user id (uuid string)
    pub user_id: String,

    pub coordinates: Point,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub altitude: Option<f64>,
    pub battery: Option<u8>,

    #[serde(default)]
    pub utc_offset_minutes: i32,

    pub captured_at: bson::DateTime,
}

impl LocationDoc {
    pub fn from_domain(sample: &LocationSample) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            sample_id: sample.id.to_string(),
            user_id: sample.user_id.to_string(),
            coordinates: sample.coordinates,
            accuracy: sample.accuracy,
            speed: sample.speed,
            heading: sample.heading,
            altitude: sample.altitude,
            battery: sample.battery,
            utc_offset_minutes: sample.utc_offset_minutes,
            captured_at: bson::DateTime::from_chrono(sample.captured_at),
        }
    }

    pub fn into_domain(self) -> Result<LocationSample> {
        Ok(LocationSample {
            id: parse_uuid("sample_id", &self.sample_id)?,
            user_id: parse_uuid("user_id", &self.user_id)?,
            coordinates: self.coordinates,
            accuracy: self.accuracy,
            speed: self.speed,
            heading: self.heading,
            altitude: self.altitude,
            battery: self.battery,
            utc_offset_minutes: self.utc_offset_minutes,
            captured_at: self.captured_at.to_chrono(),
        })
    }
}

impl IntoIndexes for LocationDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-user timeline reads
            (
                doc! { "user_id": 1, "captured_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_captured_at_index".to_string())
                        .build(),
                ),
            ),
            // 30-day retention
            (
                doc! { "captured_at": 1 },
                Some(
                    IndexOptions::builder()
                        .expire_after(LOCATION_TTL)
                        .name("captured_at_ttl".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for LocationDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
