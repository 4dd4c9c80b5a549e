//! Location ingestion - the engine's write-side entry point
//!
//! The only component that persists locations. Each user's
//! persist -> evaluate -> dispatch sequence runs under a per-user lock so
//! samples are processed in submission order; different users proceed in
//! parallel.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::AlertDispatcher;
use crate::membership::MembershipTracker;
use crate::model::{LocationSample, LocationUpdate, ManualTrigger};
use crate::store::Store;
use crate::types::Result;

/// Ingestion policy knobs
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Samples older than the user's last stored sample by more than this
    /// are dropped (logged, not failed)
    pub clock_skew_tolerance_secs: i64,
    /// Battery percentage at or below which a low-battery alert fires;
    /// zero disables the feature
    pub low_battery_threshold: u8,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            clock_skew_tolerance_secs: 30,
            low_battery_threshold: 15,
        }
    }
}

/// Outcome of one ingest call.
///
/// `sample_id` is `None` when the sample was dropped as stale.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub sample_id: Option<Uuid>,
    pub alerts_created: Vec<Uuid>,
}

/// Accepts location updates and drives evaluation and dispatch.
pub struct LocationIngestor {
    store: Arc<dyn Store>,
    tracker: Arc<MembershipTracker>,
    dispatcher: AlertDispatcher,
    config: IngestorConfig,
    /// Per-user serialization of the ingest pipeline
    user_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl LocationIngestor {
    pub fn new(
        store: Arc<dyn Store>,
        tracker: Arc<MembershipTracker>,
        dispatcher: AlertDispatcher,
        config: IngestorConfig,
    ) -> Self {
        Self {
            store,
            tracker,
            dispatcher,
            config,
            user_locks: DashMap::new(),
        }
    }

    /// Ingest one location update.
    ///
    /// Store failures abort the call before any alert side effects; a
    /// fault while dispatching one event is logged and never blocks the
    /// remaining events.
    pub async fn ingest(&self, update: LocationUpdate) -> Result<IngestResult> {
        update.validate()?;

        let lock = self.user_lock(update.user_id);
        let _guard = lock.lock().await;

        let previous = self
            .store
            .load_recent_samples(update.user_id, 1)
            .await?
            .into_iter()
            .next();

        if let Some(ref prev) = previous {
            let tolerance = Duration::seconds(self.config.clock_skew_tolerance_secs);
            if update.captured_at < prev.captured_at - tolerance {
                warn!(
                    user_id = %update.user_id,
                    captured_at = %update.captured_at,
                    last_seen = %prev.captured_at,
                    "Dropping stale location sample"
                );
                return Ok(IngestResult {
                    sample_id: None,
                    alerts_created: Vec::new(),
                });
            }
        }

        let sample = LocationSample::from_update(update);
        self.store.save_location(&sample).await?;

        let fences = self.store.load_active_geofences(sample.user_id).await?;
        let events = self.tracker.evaluate(&sample, &fences);

        let mut alerts_created = Vec::new();
        for event in events {
            let Some(fence) = fences.iter().find(|f| f.id == event.geofence_id) else {
                continue;
            };
            match self.dispatcher.handle(event, fence).await {
                Ok(Some(alert)) => alerts_created.push(alert.id),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        user_id = %sample.user_id,
                        geofence_id = %fence.id,
                        "Alert dispatch failed for geofence event: {e}"
                    );
                }
            }
        }

        if let Some(alert_id) = self.check_low_battery(&sample, previous.as_ref()).await {
            alerts_created.push(alert_id);
        }

        debug!(
            user_id = %sample.user_id,
            sample_id = %sample.id,
            alerts = alerts_created.len(),
            "Sample ingested"
        );

        Ok(IngestResult {
            sample_id: Some(sample.id),
            alerts_created,
        })
    }

    /// Fire a low-battery alert when the battery level crosses the
    /// threshold downwards. Edge-triggered: a device sitting at 10% does
    /// not re-alert on every sample.
    async fn check_low_battery(
        &self,
        sample: &LocationSample,
        previous: Option<&LocationSample>,
    ) -> Option<Uuid> {
        let threshold = self.config.low_battery_threshold;
        if threshold == 0 {
            return None;
        }

        let battery = sample.battery?;
        if battery > threshold {
            return None;
        }

        // Only fire on the crossing sample
        if let Some(prev_battery) = previous.and_then(|p| p.battery) {
            if prev_battery <= threshold {
                return None;
            }
        }

        let trigger =
            ManualTrigger::low_battery(sample.user_id, sample.coordinates, battery);
        match self.dispatcher.trigger(trigger).await {
            Ok(alert) => Some(alert.id),
            Err(e) => {
                warn!(user_id = %sample.user_id, "Low-battery alert dispatch failed: {e}");
                None
            }
        }
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
