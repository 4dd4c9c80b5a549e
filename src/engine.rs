//! Engine composition root
//!
//! Wires the store, guardian directory, notification sender, membership
//! tracker, dispatcher, ingestor, and background sweeper together and
//! exposes the operations the surrounding API layer calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use crate::config::Args;
use crate::dispatch::{AlertDispatcher, AutoResolveSweeper, DispatcherConfig};
use crate::guardians::{GuardianDirectory, MemoryGuardianDirectory, MongoGuardianDirectory};
use crate::ingest::{IngestResult, IngestorConfig, LocationIngestor};
use crate::membership::{MembershipStatus, MembershipTracker};
use crate::model::{Alert, LocationUpdate, ManualTrigger};
use crate::notify::{NatsClient, NatsSender, NoopSender, NotificationSender};
use crate::store::{MemoryStore, MongoStore, Store};
use crate::types::Result;
use crate::db::MongoClient;

/// Tunables for every engine component
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub dispatcher: DispatcherConfig,
    pub ingestor: IngestorConfig,
    pub sweep_interval: SweepInterval,
}

/// Interval wrapper so `EngineConfig` can derive `Default`
#[derive(Debug, Clone)]
pub struct SweepInterval(pub Duration);

impl Default for SweepInterval {
    fn default() -> Self {
        Self(Duration::from_secs(60))
    }
}

/// The assembled GeoGuardian engine.
pub struct Engine {
    tracker: Arc<MembershipTracker>,
    dispatcher: AlertDispatcher,
    ingestor: LocationIngestor,
    sweeper: Arc<AutoResolveSweeper>,
}

impl Engine {
    /// Assemble an engine from explicit collaborators.
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn GuardianDirectory>,
        sender: Arc<dyn NotificationSender>,
        config: EngineConfig,
    ) -> Self {
        let tracker = Arc::new(MembershipTracker::new());
        let dispatcher =
            AlertDispatcher::new(store.clone(), directory, sender, config.dispatcher);
        let ingestor = LocationIngestor::new(
            store,
            tracker.clone(),
            dispatcher.clone(),
            config.ingestor,
        );
        let sweeper = Arc::new(AutoResolveSweeper::new(
            dispatcher.clone(),
            config.sweep_interval.0,
        ));

        Self {
            tracker,
            dispatcher,
            ingestor,
            sweeper,
        }
    }

    /// Build an engine from parsed configuration: MongoDB store and NATS
    /// sender, or in-memory store and no-op sender in dev mode.
    pub async fn from_args(args: &Args) -> Result<Self> {
        let config = EngineConfig {
            dispatcher: DispatcherConfig {
                max_attempts: args.delivery_max_attempts,
                initial_backoff: Duration::from_millis(args.delivery_backoff_ms),
                attempt_timeout: Duration::from_millis(args.delivery_timeout_ms),
            },
            ingestor: IngestorConfig {
                clock_skew_tolerance_secs: args.clock_skew_tolerance_secs,
                low_battery_threshold: args.low_battery_threshold,
            },
            sweep_interval: SweepInterval(Duration::from_secs(args.sweep_interval_secs)),
        };

        if args.dev_mode {
            info!("Dev mode: in-memory store, no-op notification sender");
            return Ok(Self::new(
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryGuardianDirectory::new()),
                Arc::new(NoopSender::new()),
                config,
            ));
        }

        let mongo = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
        let store = Arc::new(MongoStore::new(&mongo).await?);
        let directory = Arc::new(MongoGuardianDirectory::new(&mongo).await?);
        let nats = NatsClient::new(&args.nats, "geoguardian-engine").await?;
        let sender = Arc::new(NatsSender::new(nats));

        Ok(Self::new(store, directory, sender, config))
    }

    /// Ingest a location update (per-user ordered).
    pub async fn ingest(&self, update: LocationUpdate) -> Result<IngestResult> {
        self.ingestor.ingest(update).await
    }

    /// Fire a manual trigger (SOS, panic, low battery).
    pub async fn trigger(&self, trigger: ManualTrigger) -> Result<Alert> {
        self.dispatcher.trigger(trigger).await
    }

    /// Record a guardian's acknowledgement of an alert.
    pub async fn acknowledge(&self, alert_id: Uuid, guardian_id: Uuid) -> Result<Alert> {
        self.dispatcher.acknowledge(alert_id, guardian_id).await
    }

    /// Explicitly resolve an alert.
    pub async fn resolve(&self, alert_id: Uuid, by: Option<Uuid>) -> Result<Alert> {
        self.dispatcher.resolve(alert_id, by).await
    }

    /// Dismiss an alert.
    pub async fn dismiss(&self, alert_id: Uuid, by: Option<Uuid>) -> Result<Alert> {
        self.dispatcher.dismiss(alert_id, by).await
    }

    /// Record a provider delivery receipt.
    pub async fn mark_delivered(&self, alert_id: Uuid, guardian_id: Uuid) -> Result<()> {
        self.dispatcher.mark_delivered(alert_id, guardian_id).await
    }

    /// Current geofence membership rows for a user.
    pub fn membership_status(&self, user_id: Uuid) -> Vec<MembershipStatus> {
        self.tracker.status_for(user_id)
    }

    /// Start the background auto-resolve sweeper.
    pub async fn start_sweeper(&self) {
        self.sweeper.clone().start().await;
    }

    /// Stop background work and wait for in-flight deliveries.
    pub async fn shutdown(&self) {
        self.sweeper.stop().await;
        self.dispatcher.await_deliveries().await;
        info!("Engine shut down");
    }
}
