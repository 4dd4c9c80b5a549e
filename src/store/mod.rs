//! Persistence boundary
//!
//! The engine talks to storage exclusively through the [`Store`] trait.
//! Two implementations ship with the crate: [`MongoStore`] for production
//! and [`MemoryStore`] for tests and single-node development.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{Alert, Geofence, LocationSample};
use crate::types::Result;

/// Storage operations the engine depends on.
///
/// Every method maps failure to [`GuardianError::Store`]; ingestion
/// surfaces that to the caller rather than silently dropping data.
///
/// [`GuardianError::Store`]: crate::types::GuardianError::Store
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a location sample.
    async fn save_location(&self, sample: &LocationSample) -> Result<()>;

    /// The user's most recent samples, newest first.
    async fn load_recent_samples(&self, user_id: Uuid, limit: usize)
        -> Result<Vec<LocationSample>>;

    /// All active geofences applicable to the user (member or creator).
    async fn load_active_geofences(&self, user_id: Uuid) -> Result<Vec<Geofence>>;

    /// Persist a freshly created alert.
    async fn save_alert(&self, alert: &Alert) -> Result<()>;

    /// Replace a stored alert with an updated copy.
    async fn update_alert(&self, alert: &Alert) -> Result<()>;

    /// Fetch one alert by id.
    async fn load_alert(&self, alert_id: Uuid) -> Result<Option<Alert>>;

    /// All non-terminal alerts (status `active` or `acknowledged`).
    async fn load_active_alerts(&self) -> Result<Vec<Alert>>;
}
