//! MongoDB-backed store

use async_trait::async_trait;
use bson::doc;
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::db::schemas::{
    AlertDoc, GeofenceDoc, LocationDoc, ALERT_COLLECTION, GEOFENCE_COLLECTION, LOCATION_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::model::{Alert, AlertStatus, Geofence, LocationSample};
use crate::store::Store;
use crate::types::{GuardianError, Result};

/// Production store over the GeoGuardian MongoDB collections.
pub struct MongoStore {
    locations: MongoCollection<LocationDoc>,
    geofences: MongoCollection<GeofenceDoc>,
    alerts: MongoCollection<AlertDoc>,
}

impl MongoStore {
    /// Open collections on an established client, applying indexes.
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            locations: client.collection(LOCATION_COLLECTION).await?,
            geofences: client.collection(GEOFENCE_COLLECTION).await?,
            alerts: client.collection(ALERT_COLLECTION).await?,
        })
    }

    /// Connect and open collections in one step.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = MongoClient::new(uri, db_name).await?;
        Self::new(&client).await
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn save_location(&self, sample: &LocationSample) -> Result<()> {
        self.locations
            .insert_one(LocationDoc::from_domain(sample))
            .await?;
        Ok(())
    }

    async fn load_recent_samples(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LocationSample>> {
        let filter = doc! {
            "user_id": user_id.to_string(),
            "metadata.is_deleted": doc! { "$ne": true },
        };

        let mut cursor = self
            .locations
            .inner()
            .find(filter)
            .sort(doc! { "captured_at": -1 })
            .limit(limit as i64)
            .await
            .map_err(|e| GuardianError::Store(format!("Find failed: {e}")))?;

        let mut samples = Vec::new();
        while let Some(doc) = cursor
            .try_next()
            .await
            .map_err(|e| GuardianError::Store(format!("Cursor read failed: {e}")))?
        {
            samples.push(doc.into_domain()?);
        }

        Ok(samples)
    }

    async fn load_active_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>> {
        let uid = user_id.to_string();
        let docs = self
            .geofences
            .find_many(doc! {
                "is_active": true,
                "$or": [
                    { "creator_id": &uid },
                    { "member_user_ids": &uid },
                ],
            })
            .await?;

        docs.into_iter().map(GeofenceDoc::into_domain).collect()
    }

    async fn save_alert(&self, alert: &Alert) -> Result<()> {
        self.alerts.insert_one(AlertDoc::from_domain(alert)).await?;
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<()> {
        let result = self
            .alerts
            .replace_one(
                doc! { "alert_id": alert.id.to_string() },
                AlertDoc::from_domain(alert),
            )
            .await?;

        if result.matched_count == 0 {
            return Err(GuardianError::Store(format!(
                "cannot update unknown alert {}",
                alert.id
            )));
        }

        Ok(())
    }

    async fn load_alert(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let doc = self
            .alerts
            .find_one(doc! { "alert_id": alert_id.to_string() })
            .await?;

        doc.map(AlertDoc::into_domain).transpose()
    }

    async fn load_active_alerts(&self) -> Result<Vec<Alert>> {
        let docs = self
            .alerts
            .find_many(doc! {
                "status": doc! { "$in": [
                    AlertStatus::Active.as_str(),
                    AlertStatus::Acknowledged.as_str(),
                ] },
            })
            .await?;

        docs.into_iter().map(AlertDoc::into_domain).collect()
    }
}
