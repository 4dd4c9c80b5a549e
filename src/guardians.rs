//! Guardian relationship directory
//!
//! "Who guards whom" lives outside this engine; dispatch only ever reads
//! it through [`GuardianDirectory`] to resolve alert recipients.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::doc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::schemas::{GuardianDoc, GUARDIAN_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::model::DeliveryMethod;
use crate::types::Result;

/// Lifecycle of a guardian relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardianStatus {
    Pending,
    Accepted,
    Declined,
    Blocked,
}

/// What a guardian is allowed to do for their dependent
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GuardianPermissions {
    pub view_location: bool,
    pub receive_alerts: bool,
    pub create_geofences: bool,
    pub send_messages: bool,
}

impl Default for GuardianPermissions {
    fn default() -> Self {
        Self {
            view_location: true,
            receive_alerts: true,
            create_geofences: true,
            send_messages: true,
        }
    }
}

/// One guardian edge as seen from the guarded user
#[derive(Debug, Clone)]
pub struct GuardianLink {
    pub guardian_id: Uuid,
    pub status: GuardianStatus,
    /// How this guardian prefers to be notified
    pub preferred_method: DeliveryMethod,
    pub permissions: GuardianPermissions,
}

impl GuardianLink {
    /// Create an accepted link with default permissions.
    pub fn accepted(guardian_id: Uuid, preferred_method: DeliveryMethod) -> Self {
        Self {
            guardian_id,
            status: GuardianStatus::Accepted,
            preferred_method,
            permissions: GuardianPermissions::default(),
        }
    }

    /// Only accepted guardians who opted into alerts become recipients.
    pub fn should_receive_alerts(&self) -> bool {
        self.status == GuardianStatus::Accepted && self.permissions.receive_alerts
    }
}

/// Read-only directory of guardian relationships.
#[async_trait]
pub trait GuardianDirectory: Send + Sync {
    /// All guardian links for a user, regardless of status; callers filter
    /// with [`GuardianLink::should_receive_alerts`].
    async fn guardians_of(&self, user_id: Uuid) -> Result<Vec<GuardianLink>>;
}

/// In-memory directory for tests and single-node development.
#[derive(Default)]
pub struct MemoryGuardianDirectory {
    links: RwLock<HashMap<Uuid, Vec<GuardianLink>>>,
}

impl MemoryGuardianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_link(&self, user_id: Uuid, link: GuardianLink) {
        self.links.write().await.entry(user_id).or_default().push(link);
    }
}

#[async_trait]
impl GuardianDirectory for MemoryGuardianDirectory {
    async fn guardians_of(&self, user_id: Uuid) -> Result<Vec<GuardianLink>> {
        Ok(self
            .links
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Directory backed by the guardians collection.
pub struct MongoGuardianDirectory {
    guardians: MongoCollection<GuardianDoc>,
}

impl MongoGuardianDirectory {
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            guardians: client.collection(GUARDIAN_COLLECTION).await?,
        })
    }
}

#[async_trait]
impl GuardianDirectory for MongoGuardianDirectory {
    async fn guardians_of(&self, user_id: Uuid) -> Result<Vec<GuardianLink>> {
        let docs = self
            .guardians
            .find_many(doc! { "user_id": user_id.to_string() })
            .await?;

        docs.into_iter().map(GuardianDoc::into_link).collect()
    }
}
