//! In-memory store for tests and single-node development

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::{Alert, Geofence, LocationSample};
use crate::store::Store;
use crate::types::{GuardianError, Result};

/// RwLock-backed tables mirroring the MongoDB collections.
#[derive(Default)]
pub struct MemoryStore {
    locations: RwLock<HashMap<Uuid, Vec<LocationSample>>>,
    geofences: RwLock<HashMap<Uuid, Geofence>>,
    alerts: RwLock<HashMap<Uuid, Alert>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a geofence definition (test/dev setup path; the
    /// production CRUD layer writes geofences through its own routes).
    pub async fn upsert_geofence(&self, fence: Geofence) {
        self.geofences.write().await.insert(fence.id, fence);
    }

    /// Soft-deactivate a geofence.
    pub async fn deactivate_geofence(&self, geofence_id: Uuid) {
        if let Some(fence) = self.geofences.write().await.get_mut(&geofence_id) {
            fence.is_active = false;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn save_location(&self, sample: &LocationSample) -> Result<()> {
        let mut locations = self.locations.write().await;
        locations
            .entry(sample.user_id)
            .or_default()
            .push(sample.clone());
        Ok(())
    }

    async fn load_recent_samples(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<LocationSample>> {
        let locations = self.locations.read().await;
        let mut samples = locations.get(&user_id).cloned().unwrap_or_default();
        samples.sort_by_key(|s| std::cmp::Reverse(s.captured_at));
        samples.truncate(limit);
        Ok(samples)
    }

    async fn load_active_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>> {
        let geofences = self.geofences.read().await;
        Ok(geofences
            .values()
            .filter(|f| f.is_active && f.applies_to(user_id))
            .cloned()
            .collect())
    }

    async fn save_alert(&self, alert: &Alert) -> Result<()> {
        self.alerts.write().await.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn update_alert(&self, alert: &Alert) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        if !alerts.contains_key(&alert.id) {
            return Err(GuardianError::Store(format!(
                "cannot update unknown alert {}",
                alert.id
            )));
        }
        alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn load_alert(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        Ok(self.alerts.read().await.get(&alert_id).cloned())
    }

    async fn load_active_alerts(&self) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut active: Vec<Alert> = alerts
            .values()
            .filter(|a| !a.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|a| a.created_at);
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point;
    use crate::model::{LocationUpdate, Severity};
    use chrono::{Duration, Utc};

    fn sample_at(user: Uuid, minutes_ago: i64) -> LocationSample {
        LocationSample::from_update(LocationUpdate {
            user_id: user,
            coordinates: Point::new(-74.0, 40.7),
            accuracy: None,
            speed: None,
            heading: None,
            altitude: None,
            battery: None,
            utc_offset_minutes: 0,
            captured_at: Utc::now() - Duration::minutes(minutes_ago),
        })
    }

    #[tokio::test]
    async fn test_recent_samples_newest_first() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();

        store.save_location(&sample_at(user, 10)).await.unwrap();
        store.save_location(&sample_at(user, 1)).await.unwrap();
        store.save_location(&sample_at(user, 5)).await.unwrap();

        let recent = store.load_recent_samples(user, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].captured_at > recent[1].captured_at);
    }

    #[tokio::test]
    async fn test_update_unknown_alert_fails() {
        let store = MemoryStore::new();
        let alert = crate::model::Alert::new(
            Uuid::new_v4(),
            crate::model::AlertType::Sos,
            Severity::Critical,
            "SOS",
            "help",
            Point::new(-74.0, 40.7),
            None,
            vec![],
        );
        assert!(store.update_alert(&alert).await.is_err());
        store.save_alert(&alert).await.unwrap();
        assert!(store.update_alert(&alert).await.is_ok());
    }
}
