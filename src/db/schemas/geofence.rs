//! Geofence documents

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Metadata, MutMetadata};
use crate::db::schemas::parse_uuid;
use crate::model::{AlertSettings, Geofence, Geometry, Schedule};
use crate::types::Result;

/// Collection name for geofences
pub const GEOFENCE_COLLECTION: &str = "geofences";

/// Geofence document. Geometry, alert settings and schedule embed the
/// domain types directly; only ids and dates are translated.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GeofenceDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Domain geofence id (uuid string)
    pub geofence_id: String,

    pub name: String,
    pub description: Option<String>,

    /// Creator user id (uuid string)
    pub creator_id: String,

    /// Member user ids (uuid strings)
    pub member_user_ids: Vec<String>,

    pub geometry: Geometry,
    pub alert_settings: AlertSettings,
    pub schedule: Schedule,
    pub is_active: bool,
    pub created_at: bson::DateTime,
}

impl GeofenceDoc {
    pub fn from_domain(fence: &Geofence) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            geofence_id: fence.id.to_string(),
            name: fence.name.clone(),
            description: fence.description.clone(),
            creator_id: fence.creator_id.to_string(),
            member_user_ids: fence.member_user_ids.iter().map(|id| id.to_string()).collect(),
            geometry: fence.geometry.clone(),
            alert_settings: fence.alert_settings.clone(),
            schedule: fence.schedule.clone(),
            is_active: fence.is_active,
            created_at: bson::DateTime::from_chrono(fence.created_at),
        }
    }

    pub fn into_domain(self) -> Result<Geofence> {
        let member_user_ids = self
            .member_user_ids
            .iter()
            .map(|id| parse_uuid("member_user_ids", id))
            .collect::<Result<_>>()?;

        Ok(Geofence {
            id: parse_uuid("geofence_id", &self.geofence_id)?,
            name: self.name,
            description: self.description,
            creator_id: parse_uuid("creator_id", &self.creator_id)?,
            member_user_ids,
            geometry: self.geometry,
            alert_settings: self.alert_settings,
            schedule: self.schedule,
            is_active: self.is_active,
            created_at: self.created_at.to_chrono(),
        })
    }
}

impl IntoIndexes for GeofenceDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "geofence_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("geofence_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "creator_id": 1, "is_active": 1 },
                Some(
                    IndexOptions::builder()
                        .name("creator_active_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "member_user_ids": 1, "is_active": 1 },
                Some(
                    IndexOptions::builder()
                        .name("member_active_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for GeofenceDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point;
    use uuid::Uuid;

    #[test]
    fn test_domain_round_trip() {
        let mut fence = Geofence::new(
            "School",
            Uuid::new_v4(),
            Geometry::circle(Point::new(-74.0060, 40.7128), 250.0).unwrap(),
        );
        fence.member_user_ids.insert(Uuid::new_v4());
        fence.description = Some("Pickup zone".to_string());

        let restored = GeofenceDoc::from_domain(&fence).into_domain().unwrap();
        assert_eq!(restored.id, fence.id);
        assert_eq!(restored.name, fence.name);
        assert_eq!(restored.member_user_ids, fence.member_user_ids);
        assert!(matches!(restored.geometry, Geometry::Circle { .. }));
    }
}
