//! Alert records, recipients, and their lifecycle state machines
//!
//! Status fields are enums with explicit legal-transition tables; an
//! illegal transition is rejected before any state is touched.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Point;
use crate::types::{GuardianError, Result};

/// Kind of alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Sos,
    GeofenceEnter,
    GeofenceExit,
    LowBattery,
    SpeedLimit,
    Panic,
    Custom,
}

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    /// `resolved` and `dismissed` are terminal; nothing leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Dismissed)
    }

    /// Legal transition table:
    /// `active -> {acknowledged, resolved, dismissed}`,
    /// `acknowledged -> {resolved, dismissed}`.
    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, next),
            (Active, Acknowledged)
                | (Active, Resolved)
                | (Active, Dismissed)
                | (Acknowledged, Resolved)
                | (Acknowledged, Dismissed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a notification reaches a recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Sms,
    Email,
    Push,
    Call,
}

impl DeliveryMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Push => "push",
            Self::Call => "call",
        }
    }
}

/// Per-recipient delivery status, one-way progression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Acknowledged,
}

impl RecipientStatus {
    /// One-way progression: `pending -> sent -> delivered -> acknowledged`,
    /// with `failed` reachable from `pending`/`sent` and acknowledgement
    /// allowed from any non-failed state (a guardian may acknowledge from
    /// the dashboard before the provider confirms delivery).
    pub fn can_progress_to(self, next: RecipientStatus) -> bool {
        use RecipientStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Pending, Acknowledged)
                | (Sent, Delivered)
                | (Sent, Failed)
                | (Sent, Acknowledged)
                | (Delivered, Acknowledged)
        )
    }
}

/// How an SOS was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SosMethod {
    Button,
    Voice,
    Gesture,
    Automatic,
}

/// One guardian's delivery record for one alert.
///
/// Owned exclusively by the parent alert; mutated only through the
/// dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub guardian_id: Uuid,
    pub method: DeliveryMethod,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Recipient {
    pub fn new(guardian_id: Uuid, method: DeliveryMethod) -> Self {
        Self {
            guardian_id,
            method,
            status: RecipientStatus::Pending,
            sent_at: None,
            delivered_at: None,
            acknowledged_at: None,
        }
    }
}

/// Additional data attached to an alert depending on its type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertMetadata {
    pub battery_level: Option<u8>,
    pub speed: Option<f64>,
    pub sos_method: Option<SosMethod>,
}

/// A safety alert. Never physically deleted; the full lifecycle stays in
/// the store as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub user_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub location: Point,
    pub geofence_id: Option<Uuid>,
    pub recipients: Vec<Recipient>,
    pub status: AlertStatus,
    pub auto_resolve: bool,
    /// Minutes after creation at which an auto-resolving alert expires
    pub resolve_after_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Uuid>,
    pub metadata: AlertMetadata,
}

impl Alert {
    /// Create a new active alert with all recipients pending.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        alert_type: AlertType,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
        location: Point,
        geofence_id: Option<Uuid>,
        recipients: Vec<Recipient>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            location,
            geofence_id,
            recipients,
            status: AlertStatus::Active,
            auto_resolve: false,
            resolve_after_minutes: None,
            created_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
            metadata: AlertMetadata::default(),
        }
    }

    /// Find the recipient record for a guardian.
    pub fn recipient_mut(&mut self, guardian_id: Uuid) -> Option<&mut Recipient> {
        self.recipients
            .iter_mut()
            .find(|r| r.guardian_id == guardian_id)
    }

    /// Apply a lifecycle transition, rejecting anything the table forbids.
    pub fn transition(&mut self, next: AlertStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(GuardianError::InvalidAlertTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Whether the auto-resolve sweep should resolve this alert at `now`.
    pub fn eligible_for_auto_resolve(&self, now: DateTime<Utc>) -> bool {
        if !self.auto_resolve || self.status.is_terminal() {
            return false;
        }
        match self.resolve_after_minutes {
            Some(minutes) => now > self.created_at + Duration::minutes(minutes),
            None => false,
        }
    }
}
