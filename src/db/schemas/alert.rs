//! Alert documents
//!
//! Alerts are never physically deleted; the collection is the audit trail
//! for the whole lifecycle.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Metadata, MutMetadata};
use crate::db::schemas::parse_uuid;
use crate::geo::Point;
use crate::model::{
    Alert, AlertMetadata, AlertStatus, AlertType, DeliveryMethod, Recipient, RecipientStatus,
    Severity,
};
use crate::types::Result;

/// Collection name for alerts
pub const ALERT_COLLECTION: &str = "alerts";

/// Embedded recipient record
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecipientDoc {
    pub guardian_id: String,
    pub method: DeliveryMethod,
    pub status: RecipientStatus,
    pub sent_at: Option<bson::DateTime>,
    pub delivered_at: Option<bson::DateTime>,
    pub acknowledged_at: Option<bson::DateTime>,
}

impl RecipientDoc {
    fn from_domain(recipient: &Recipient) -> Self {
        Self {
            guardian_id: recipient.guardian_id.to_string(),
            method: recipient.method,
            status: recipient.status,
            sent_at: recipient.sent_at.map(bson::DateTime::from_chrono),
            delivered_at: recipient.delivered_at.map(bson::DateTime::from_chrono),
            acknowledged_at: recipient.acknowledged_at.map(bson::DateTime::from_chrono),
        }
    }

    fn into_domain(self) -> Result<Recipient> {
        Ok(Recipient {
            guardian_id: parse_uuid("guardian_id", &self.guardian_id)?,
            method: self.method,
            status: self.status,
            sent_at: self.sent_at.map(|d| d.to_chrono()),
            delivered_at: self.delivered_at.map(|d| d.to_chrono()),
            acknowledged_at: self.acknowledged_at.map(|d| d.to_chrono()),
        })
    }
}

/// Alert document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AlertDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Domain alert id (uuid string)
    pub alert_id: String,

    pub user_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub location: Point,
    pub geofence_id: Option<String>,
    pub recipients: Vec<RecipientDoc>,
    pub status: AlertStatus,
    pub auto_resolve: bool,
    pub resolve_after_minutes: Option<i64>,
    pub created_at: bson::DateTime,
    pub resolved_at: Option<bson::DateTime>,
    pub resolved_by: Option<String>,
    pub alert_metadata: AlertMetadata,
}

impl AlertDoc {
    pub fn from_domain(alert: &Alert) -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            alert_id: alert.id.to_string(),
            user_id: alert.user_id.to_string(),
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            location: alert.location,
            geofence_id: alert.geofence_id.map(|id| id.to_string()),
            recipients: alert.recipients.iter().map(RecipientDoc::from_domain).collect(),
            status: alert.status,
            auto_resolve: alert.auto_resolve,
            resolve_after_minutes: alert.resolve_after_minutes,
            created_at: bson::DateTime::from_chrono(alert.created_at),
            resolved_at: alert.resolved_at.map(bson::DateTime::from_chrono),
            resolved_by: alert.resolved_by.map(|id| id.to_string()),
            alert_metadata: alert.metadata.clone(),
        }
    }

    pub fn into_domain(self) -> Result<Alert> {
        let recipients = self
            .recipients
            .into_iter()
            .map(RecipientDoc::into_domain)
            .collect::<Result<_>>()?;

        let geofence_id = match self.geofence_id {
            Some(id) => Some(parse_uuid("geofence_id", &id)?),
            None => None,
        };
        let resolved_by = match self.resolved_by {
            Some(id) => Some(parse_uuid("resolved_by", &id)?),
            None => None,
        };

        Ok(Alert {
            id: parse_uuid("alert_id", &self.alert_id)?,
            user_id: parse_uuid("user_id", &self.user_id)?,
            alert_type: self.alert_type,
            severity: self.severity,
            title: self.title,
            message: self.message,
            location: self.location,
            geofence_id,
            recipients,
            status: self.status,
            auto_resolve: self.auto_resolve,
            resolve_after_minutes: self.resolve_after_minutes,
            created_at: self.created_at.to_chrono(),
            resolved_at: self.resolved_at.map(|d| d.to_chrono()),
            resolved_by,
            metadata: self.alert_metadata,
        })
    }
}

impl IntoIndexes for AlertDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "alert_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("alert_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_created_at_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1, "created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("status_created_at_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for AlertDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_domain_round_trip_preserves_recipients() {
        let guardian = Uuid::new_v4();
        let mut alert = Alert::new(
            Uuid::new_v4(),
            AlertType::GeofenceExit,
            Severity::High,
            "Left School",
            "Dependent left the School zone",
            Point::new(-74.0060, 40.7128),
            Some(Uuid::new_v4()),
            vec![Recipient::new(guardian, DeliveryMethod::Sms)],
        );
        alert.recipients[0].status = RecipientStatus::Sent;

        let restored = AlertDoc::from_domain(&alert).into_domain().unwrap();
        assert_eq!(restored.id, alert.id);
        assert_eq!(restored.recipients.len(), 1);
        assert_eq!(restored.recipients[0].guardian_id, guardian);
        assert_eq!(restored.recipients[0].status, RecipientStatus::Sent);
        assert_eq!(restored.status, AlertStatus::Active);
    }
}
