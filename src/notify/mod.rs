//! Notification delivery boundary
//!
//! The engine hands a serialized [`AlertNotification`] to a
//! [`NotificationSender`] and records the outcome on the recipient.
//! Providers (SMS gateway, push service, voice dialer) sit behind the
//! sender; the retry policy lives in [`crate::dispatch`], not here.

mod nats;

pub use nats::{NatsClient, NatsSender};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::geo::Point;
use crate::model::{AlertType, DeliveryMethod, Severity};

/// Where a notification is going
#[derive(Debug, Clone, Copy)]
pub struct RecipientContact {
    pub guardian_id: Uuid,
    pub method: DeliveryMethod,
}

/// Result of a single delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Provider accepted the notification
    Accepted,
    /// Worth retrying (connection refused, timeout, throttled)
    Transient(String),
    /// Never retry (unknown recipient, unsupported method)
    Permanent(String),
}

/// The notification payload fanned out to recipients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotification {
    pub alert_id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub location: Point,
    pub created_at: DateTime<Utc>,
}

impl AlertNotification {
    /// Subject a guardian's devices subscribe to for a delivery method.
    pub fn subject(contact: &RecipientContact) -> String {
        format!(
            "ALERT.{}.{}",
            contact.method.as_str().to_uppercase(),
            contact.guardian_id
        )
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<bytes::Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Into::into)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Black-box delivery provider boundary.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Attempt one delivery. Infallible at the Rust level; failures are
    /// expressed through the outcome so the dispatcher can apply its
    /// retry policy uniformly.
    async fn send(&self, contact: &RecipientContact, payload: &AlertNotification)
        -> DeliveryOutcome;
}

/// Sender that only logs; used in development mode.
#[derive(Default)]
pub struct NoopSender;

impl NoopSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for NoopSender {
    async fn send(
        &self,
        contact: &RecipientContact,
        payload: &AlertNotification,
    ) -> DeliveryOutcome {
        info!(
            guardian_id = %contact.guardian_id,
            method = contact.method.as_str(),
            alert_id = %payload.alert_id,
            "NoopSender: dropping notification"
        );
        DeliveryOutcome::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_round_trip() {
        let payload = AlertNotification {
            alert_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            alert_type: AlertType::Sos,
            severity: Severity::Critical,
            title: "SOS".to_string(),
            message: "Emergency alert".to_string(),
            location: Point::new(-74.0060, 40.7128),
            created_at: Utc::now(),
        };

        let bytes = payload.to_bytes().unwrap();
        let restored = AlertNotification::from_bytes(&bytes).unwrap();
        assert_eq!(restored.alert_id, payload.alert_id);
        assert_eq!(restored.severity, Severity::Critical);
    }

    #[test]
    fn test_subject_includes_method_and_guardian() {
        let guardian_id = Uuid::new_v4();
        let contact = RecipientContact {
            guardian_id,
            method: DeliveryMethod::Push,
        };
        assert_eq!(
            AlertNotification::subject(&contact),
            format!("ALERT.PUSH.{guardian_id}")
        );
    }
}
