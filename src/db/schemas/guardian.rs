//! Guardian relationship documents
//!
//! Written by the account/invitation CRUD layer; this engine only reads
//! them through [`MongoGuardianDirectory`](crate::guardians::MongoGuardianDirectory).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, Metadata, MutMetadata};
use crate::db::schemas::parse_uuid;
use crate::guardians::{GuardianLink, GuardianPermissions, GuardianStatus};
use crate::model::DeliveryMethod;
use crate::types::Result;

/// Collection name for guardian relationships
pub const GUARDIAN_COLLECTION: &str = "guardians";

/// Guardian relationship document
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GuardianDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Guardian user id (uuid string)
    pub guardian_id: String,

    /// Guarded user id (uuid string)
    pub user_id: String,

    pub status: GuardianStatus,
    pub preferred_method: DeliveryMethod,
    pub permissions: GuardianPermissions,

    pub invited_at: Option<bson::DateTime>,
    pub accepted_at: Option<bson::DateTime>,
}

impl GuardianDoc {
    /// Project the document into the directory's link type.
    pub fn into_link(self) -> Result<GuardianLink> {
        Ok(GuardianLink {
            guardian_id: parse_uuid("guardian_id", &self.guardian_id)?,
            status: self.status,
            preferred_method: self.preferred_method,
            permissions: self.permissions,
        })
    }
}

impl IntoIndexes for GuardianDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // One relationship per (guardian, user) pair
            (
                doc! { "guardian_id": 1, "user_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("guardian_user_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user_id": 1, "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for GuardianDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
