//! Alert creation, recipient fan-out, and lifecycle management
//!
//! The dispatcher is the only writer of Alert and Recipient records.
//! Every mutation goes through a per-alert lock, so concurrent
//! acknowledgements, delivery updates, and sweeps never lose writes.

mod delivery;
mod sweep;

pub use sweep::AutoResolveSweeper;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::guardians::GuardianDirectory;
use crate::model::{
    Alert, AlertStatus, AlertType, DeliveryMethod, Geofence, GeofenceEvent, ManualTrigger,
    Recipient, RecipientStatus, Severity, TransitionKind,
};
use crate::notify::{AlertNotification, NotificationSender, RecipientContact};
use crate::store::Store;
use crate::types::{GuardianError, Result};

/// Delivery retry policy
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Attempts per recipient before marking failed
    pub max_attempts: u32,
    /// First retry delay; doubles per attempt, with jitter
    pub initial_backoff: Duration,
    /// Timeout for a single send; timing out counts as transient failure
    pub attempt_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// Turns membership events and manual triggers into alerts and drives
/// per-recipient delivery.
///
/// Cheap to clone; clones share the per-alert locks and the outstanding
/// delivery task list.
#[derive(Clone)]
pub struct AlertDispatcher {
    store: Arc<dyn Store>,
    directory: Arc<dyn GuardianDirectory>,
    sender: Arc<dyn NotificationSender>,
    config: DispatcherConfig,
    /// Serializes mutations per alert id
    alert_locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    /// Outstanding delivery tasks, awaited on shutdown
    deliveries: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AlertDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn GuardianDirectory>,
        sender: Arc<dyn NotificationSender>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            directory,
            sender,
            config,
            alert_locks: Arc::new(DashMap::new()),
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle a geofence transition, creating and fanning out an alert.
    ///
    /// Returns `None` when the fence has alerting disabled for this
    /// direction.
    pub async fn handle(&self, event: GeofenceEvent, fence: &Geofence) -> Result<Option<Alert>> {
        let settings = &fence.alert_settings;
        let (alert_type, title) = match event.kind {
            TransitionKind::Enter => {
                if !settings.on_enter {
                    return Ok(None);
                }
                (AlertType::GeofenceEnter, format!("Entered {}", fence.name))
            }
            TransitionKind::Exit => {
                if !settings.on_exit {
                    return Ok(None);
                }
                (AlertType::GeofenceExit, format!("Left {}", fence.name))
            }
        };

        let message = match event.kind {
            TransitionKind::Enter => format!("Tracked user entered the \"{}\" zone", fence.name),
            TransitionKind::Exit => format!("Tracked user left the \"{}\" zone", fence.name),
        };

        let recipients = self
            .resolve_recipients(event.user_id, settings.notify_guardians, settings.notify_user)
            .await?;

        let mut alert = Alert::new(
            event.user_id,
            alert_type,
            settings.severity,
            title,
            message,
            event.sample.coordinates,
            Some(fence.id),
            recipients,
        );
        alert.metadata.battery_level = event.sample.battery;
        alert.metadata.speed = event.sample.speed;

        self.store.save_alert(&alert).await?;
        self.spawn_deliveries(&alert).await;

        Ok(Some(alert))
    }

    /// Handle a user- or device-initiated trigger (SOS, panic, low
    /// battery).
    pub async fn trigger(&self, trigger: ManualTrigger) -> Result<Alert> {
        let severity = match trigger.alert_type {
            AlertType::Sos | AlertType::Panic => Severity::Critical,
            AlertType::SpeedLimit => Severity::High,
            _ => Severity::Medium,
        };

        let title = match trigger.alert_type {
            AlertType::Sos => "SOS".to_string(),
            AlertType::Panic => "Panic alert".to_string(),
            AlertType::LowBattery => "Low battery".to_string(),
            AlertType::SpeedLimit => "Speed limit exceeded".to_string(),
            _ => "Alert".to_string(),
        };

        let message = trigger.message.clone().unwrap_or_else(|| match trigger.alert_type {
            AlertType::Sos | AlertType::Panic => {
                "Emergency alert - please check on your dependent".to_string()
            }
            AlertType::LowBattery => match trigger.battery_level {
                Some(level) => format!("Device battery is at {level}%"),
                None => "Device battery is low".to_string(),
            },
            _ => title.clone(),
        });

        let recipients = self.resolve_recipients(trigger.user_id, true, false).await?;

        let mut alert = Alert::new(
            trigger.user_id,
            trigger.alert_type,
            severity,
            title,
            message,
            trigger.location,
            None,
            recipients,
        );
        alert.auto_resolve = trigger.auto_resolve;
        alert.resolve_after_minutes = trigger.resolve_after_minutes;
        alert.metadata.battery_level = trigger.battery_level;
        alert.metadata.sos_method = trigger.sos_method;

        self.store.save_alert(&alert).await?;
        self.spawn_deliveries(&alert).await;

        Ok(alert)
    }

    /// Record a guardian's acknowledgement. The first acknowledgement
    /// moves the alert itself to `acknowledged`.
    pub async fn acknowledge(&self, alert_id: Uuid, guardian_id: Uuid) -> Result<Alert> {
        let lock = self.alert_lock(alert_id);
        let _guard = lock.lock().await;

        let mut alert = self.load_required(alert_id).await?;
        if alert.status.is_terminal() {
            return Err(GuardianError::InvalidAlertTransition {
                from: alert.status,
                to: AlertStatus::Acknowledged,
            });
        }

        let recipient = alert.recipient_mut(guardian_id).ok_or_else(|| {
            GuardianError::InvalidInput(format!(
                "guardian {guardian_id} is not a recipient of alert {alert_id}"
            ))
        })?;

        if recipient.status.can_progress_to(RecipientStatus::Acknowledged) {
            recipient.status = RecipientStatus::Acknowledged;
            recipient.acknowledged_at = Some(Utc::now());
        }

        if alert.status == AlertStatus::Active {
            alert.transition(AlertStatus::Acknowledged)?;
        }

        self.store.update_alert(&alert).await?;
        Ok(alert)
    }

    /// Explicitly resolve an alert.
    pub async fn resolve(&self, alert_id: Uuid, by: Option<Uuid>) -> Result<Alert> {
        self.finalize(alert_id, AlertStatus::Resolved, by).await
    }

    /// Dismiss an alert (false alarm).
    pub async fn dismiss(&self, alert_id: Uuid, by: Option<Uuid>) -> Result<Alert> {
        self.finalize(alert_id, AlertStatus::Dismissed, by).await
    }

    /// Record a provider delivery receipt for a recipient.
    pub async fn mark_delivered(&self, alert_id: Uuid, guardian_id: Uuid) -> Result<()> {
        self.update_recipient(alert_id, guardian_id, RecipientStatus::Delivered)
            .await
    }

    /// Resolve every expired auto-resolving alert. Idempotent: a second
    /// sweep at the same instant finds nothing left to do.
    pub async fn auto_resolve_sweep(&self, now: DateTime<Utc>) -> Result<usize> {
        let candidates = self.store.load_active_alerts().await?;
        let mut resolved = 0;

        for candidate in candidates {
            if !candidate.eligible_for_auto_resolve(now) {
                continue;
            }

            let lock = self.alert_lock(candidate.id);
            let _guard = lock.lock().await;

            // Re-read under the lock; an acknowledgement or explicit
            // resolve may have landed since the scan
            let Some(mut alert) = self.store.load_alert(candidate.id).await? else {
                continue;
            };
            if !alert.eligible_for_auto_resolve(now) {
                continue;
            }

            alert.transition(AlertStatus::Resolved)?;
            alert.resolved_at = Some(now);
            self.store.update_alert(&alert).await?;
            resolved += 1;

            debug!(alert_id = %alert.id, "Alert auto-resolved");
        }

        if resolved > 0 {
            info!(count = resolved, "Auto-resolve sweep finished");
        }

        Ok(resolved)
    }

    /// Wait for all outstanding delivery tasks (shutdown and tests).
    pub async fn await_deliveries(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut deliveries = self.deliveries.lock().await;
            deliveries.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Delivery task panicked: {e}");
            }
        }
    }

    async fn finalize(&self, alert_id: Uuid, status: AlertStatus, by: Option<Uuid>) -> Result<Alert> {
        let lock = self.alert_lock(alert_id);
        let _guard = lock.lock().await;

        let mut alert = self.load_required(alert_id).await?;
        alert.transition(status)?;
        alert.resolved_at = Some(Utc::now());
        alert.resolved_by = by;

        self.store.update_alert(&alert).await?;
        Ok(alert)
    }

    async fn resolve_recipients(
        &self,
        user_id: Uuid,
        notify_guardians: bool,
        notify_user: bool,
    ) -> Result<Vec<Recipient>> {
        let mut recipients = Vec::new();

        if notify_guardians {
            for link in self.directory.guardians_of(user_id).await? {
                if link.should_receive_alerts() {
                    recipients.push(Recipient::new(link.guardian_id, link.preferred_method));
                }
            }
        }

        if notify_user {
            recipients.push(Recipient::new(user_id, DeliveryMethod::Push));
        }

        if recipients.is_empty() {
            info!(user_id = %user_id, "Alert has no recipients; creating without delivery");
        }

        Ok(recipients)
    }

    /// Spawn one independent delivery task per recipient.
    async fn spawn_deliveries(&self, alert: &Alert) {
        if alert.recipients.is_empty() {
            return;
        }

        let payload = AlertNotification {
            alert_id: alert.id,
            user_id: alert.user_id,
            alert_type: alert.alert_type,
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            location: alert.location,
            created_at: alert.created_at,
        };

        let mut handles = self.deliveries.lock().await;
        for recipient in &alert.recipients {
            let dispatcher = self.clone();
            let contact = RecipientContact {
                guardian_id: recipient.guardian_id,
                method: recipient.method,
            };
            let payload = payload.clone();
            let alert_id = alert.id;

            handles.push(tokio::spawn(async move {
                delivery::deliver(dispatcher, alert_id, contact, payload).await;
            }));
        }
    }

    /// Progress a recipient's delivery status, stamping the matching
    /// timestamp. Out-of-order updates (e.g. a delivery receipt after an
    /// acknowledgement) are skipped, not errors.
    async fn update_recipient(
        &self,
        alert_id: Uuid,
        guardian_id: Uuid,
        next: RecipientStatus,
    ) -> Result<()> {
        let lock = self.alert_lock(alert_id);
        let _guard = lock.lock().await;

        let mut alert = self.load_required(alert_id).await?;
        let Some(recipient) = alert.recipient_mut(guardian_id) else {
            return Err(GuardianError::InvalidInput(format!(
                "guardian {guardian_id} is not a recipient of alert {alert_id}"
            )));
        };

        if !recipient.status.can_progress_to(next) {
            debug!(
                alert_id = %alert_id,
                guardian_id = %guardian_id,
                ?next,
                current = ?recipient.status,
                "Skipping out-of-order recipient update"
            );
            return Ok(());
        }

        recipient.status = next;
        let now = Utc::now();
        match next {
            RecipientStatus::Sent => recipient.sent_at = Some(now),
            RecipientStatus::Delivered => recipient.delivered_at = Some(now),
            RecipientStatus::Acknowledged => recipient.acknowledged_at = Some(now),
            _ => {}
        }

        self.store.update_alert(&alert).await
    }

    async fn load_required(&self, alert_id: Uuid) -> Result<Alert> {
        self.store
            .load_alert(alert_id)
            .await?
            .ok_or(GuardianError::AlertNotFound(alert_id))
    }

    fn alert_lock(&self, alert_id: Uuid) -> Arc<Mutex<()>> {
        self.alert_locks
            .entry(alert_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Point;
    use crate::guardians::{GuardianLink, MemoryGuardianDirectory};
    use crate::model::{Geometry, LocationSample, LocationUpdate, SosMethod};
    use crate::notify::DeliveryOutcome;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sender whose outcomes are scripted ahead of time; counts attempts.
    struct ScriptedSender {
        outcomes: Mutex<VecDeque<DeliveryOutcome>>,
        attempts: AtomicUsize,
    }

    impl ScriptedSender {
        fn new(outcomes: Vec<DeliveryOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: AtomicUsize::new(0),
            }
        }

        fn always_ok() -> Self {
            Self::new(vec![])
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl crate::notify::NotificationSender for ScriptedSender {
        async fn send(
            &self,
            _contact: &RecipientContact,
            _payload: &AlertNotification,
        ) -> DeliveryOutcome {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .await
                .pop_front()
                .unwrap_or(DeliveryOutcome::Accepted)
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        directory: Arc<MemoryGuardianDirectory>,
        sender: Arc<ScriptedSender>,
        dispatcher: AlertDispatcher,
    }

    fn fixture_with(sender: ScriptedSender, config: DispatcherConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = Arc::new(MemoryGuardianDirectory::new());
        let sender = Arc::new(sender);
        let dispatcher = AlertDispatcher::new(
            store.clone(),
            directory.clone(),
            sender.clone(),
            config,
        );
        Fixture {
            store,
            directory,
            sender,
            dispatcher,
        }
    }

    fn fast_config() -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            attempt_timeout: Duration::from_millis(100),
        }
    }

    fn sample_for(user: Uuid) -> LocationSample {
        LocationSample::from_update(LocationUpdate {
            user_id: user,
            coordinates: Point::new(-74.0060, 40.7128),
            accuracy: None,
            speed: None,
            heading: None,
            altitude: None,
            battery: Some(64),
            utc_offset_minutes: 0,
            captured_at: Utc::now(),
        })
    }

    fn fence_for(user: Uuid) -> Geofence {
        Geofence::new(
            "Home",
            user,
            Geometry::circle(Point::new(-74.0060, 40.7128), 500.0).unwrap(),
        )
    }

    fn enter_event(user: Uuid, fence: &Geofence) -> GeofenceEvent {
        GeofenceEvent {
            kind: TransitionKind::Enter,
            user_id: user,
            geofence_id: fence.id,
            sample: sample_for(user),
        }
    }

    #[tokio::test]
    async fn test_enter_event_creates_alert_with_guardian_recipients() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Sms))
            .await;

        let fence = fence_for(user);
        let alert = fx
            .dispatcher
            .handle(enter_event(user, &fence), &fence)
            .await
            .unwrap()
            .expect("alerting enabled");

        assert_eq!(alert.alert_type, AlertType::GeofenceEnter);
        assert_eq!(alert.severity, fence.alert_settings.severity);
        assert_eq!(alert.recipients.len(), 1);
        assert_eq!(alert.recipients[0].guardian_id, guardian);
        assert_eq!(alert.geofence_id, Some(fence.id));

        fx.dispatcher.await_deliveries().await;
        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Sent);
        assert!(stored.recipients[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_disabled_direction_produces_no_alert() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let mut fence = fence_for(user);
        fence.alert_settings.on_enter = false;

        let result = fx
            .dispatcher
            .handle(enter_event(user, &fence), &fence)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_sos_with_no_guardians_creates_bare_alert() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::sos(
                user,
                Point::new(-74.0060, 40.7128),
                SosMethod::Button,
            ))
            .await
            .unwrap();

        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.recipients.is_empty());

        fx.dispatcher.await_deliveries().await;
        assert_eq!(fx.sender.attempts(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_retry_then_succeed() {
        let fx = fixture_with(
            ScriptedSender::new(vec![
                DeliveryOutcome::Transient("connection refused".into()),
                DeliveryOutcome::Accepted,
            ]),
            fast_config(),
        );
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Push))
            .await;

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        fx.dispatcher.await_deliveries().await;
        assert_eq!(fx.sender.attempts(), 2);
        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Sent);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_marks_failed() {
        let fx = fixture_with(
            ScriptedSender::new(vec![
                DeliveryOutcome::Transient("down".into()),
                DeliveryOutcome::Transient("down".into()),
                DeliveryOutcome::Transient("down".into()),
            ]),
            fast_config(),
        );
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Sms))
            .await;

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        fx.dispatcher.await_deliveries().await;
        assert_eq!(fx.sender.attempts(), 3);
        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Failed);
    }

    #[tokio::test]
    async fn test_permanent_failure_stops_immediately() {
        let fx = fixture_with(
            ScriptedSender::new(vec![DeliveryOutcome::Permanent("unknown number".into())]),
            fast_config(),
        );
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Call))
            .await;

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        fx.dispatcher.await_deliveries().await;
        assert_eq!(fx.sender.attempts(), 1);
        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Failed);
    }

    #[tokio::test]
    async fn test_first_acknowledgement_wins() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let g1 = Uuid::new_v4();
        let g2 = Uuid::new_v4();
        for g in [g1, g2] {
            fx.directory
                .add_link(user, GuardianLink::accepted(g, DeliveryMethod::Push))
                .await;
        }

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();
        fx.dispatcher.await_deliveries().await;

        let after_first = fx.dispatcher.acknowledge(alert.id, g1).await.unwrap();
        assert_eq!(after_first.status, AlertStatus::Acknowledged);

        // Second acknowledgement records the recipient but leaves the
        // alert where the first one put it
        let after_second = fx.dispatcher.acknowledge(alert.id, g2).await.unwrap();
        assert_eq!(after_second.status, AlertStatus::Acknowledged);
        assert!(after_second
            .recipients
            .iter()
            .all(|r| r.status == RecipientStatus::Acknowledged));
    }

    #[tokio::test]
    async fn test_acknowledge_resolved_alert_rejected_unchanged() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Sms))
            .await;

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();
        fx.dispatcher.await_deliveries().await;
        fx.dispatcher.resolve(alert.id, None).await.unwrap();

        let err = fx.dispatcher.acknowledge(alert.id, guardian).await.unwrap_err();
        assert!(matches!(
            err,
            GuardianError::InvalidAlertTransition {
                from: AlertStatus::Resolved,
                ..
            }
        ));

        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert!(stored
            .recipients
            .iter()
            .all(|r| r.status != RecipientStatus::Acknowledged));
    }

    #[tokio::test]
    async fn test_acknowledge_by_non_recipient_rejected() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        let err = fx
            .dispatcher
            .acknowledge(alert.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, GuardianError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_dismiss_then_resolve_rejected() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        fx.dispatcher.dismiss(alert.id, Some(user)).await.unwrap();
        let err = fx.dispatcher.resolve(alert.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            GuardianError::InvalidAlertTransition {
                from: AlertStatus::Dismissed,
                to: AlertStatus::Resolved,
            }
        ));
    }

    #[tokio::test]
    async fn test_sweep_is_idempotent() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();

        let mut trigger = ManualTrigger::panic(user, Point::new(-74.0, 40.7));
        trigger.auto_resolve = true;
        trigger.resolve_after_minutes = Some(5);
        let alert = fx.dispatcher.trigger(trigger).await.unwrap();

        let later = alert.created_at + chrono::Duration::minutes(10);
        assert_eq!(fx.dispatcher.auto_resolve_sweep(later).await.unwrap(), 1);
        assert_eq!(fx.dispatcher.auto_resolve_sweep(later).await.unwrap(), 0);

        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AlertStatus::Resolved);
        assert_eq!(stored.resolved_at, Some(later));
    }

    #[tokio::test]
    async fn test_sweep_skips_non_expiring_alerts() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();

        let later = alert.created_at + chrono::Duration::hours(24);
        assert_eq!(fx.dispatcher.auto_resolve_sweep(later).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_mark_delivered_progresses_recipient() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let guardian = Uuid::new_v4();
        fx.directory
            .add_link(user, GuardianLink::accepted(guardian, DeliveryMethod::Push))
            .await;

        let alert = fx
            .dispatcher
            .trigger(ManualTrigger::panic(user, Point::new(-74.0, 40.7)))
            .await
            .unwrap();
        fx.dispatcher.await_deliveries().await;

        fx.dispatcher.mark_delivered(alert.id, guardian).await.unwrap();
        let stored = fx.store.load_alert(alert.id).await.unwrap().unwrap();
        assert_eq!(stored.recipients[0].status, RecipientStatus::Delivered);
        assert!(stored.recipients[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_notify_user_adds_push_recipient() {
        let fx = fixture_with(ScriptedSender::always_ok(), fast_config());
        let user = Uuid::new_v4();
        let mut fence = fence_for(user);
        fence.alert_settings.notify_user = true;
        fence.alert_settings.notify_guardians = false;

        let alert = fx
            .dispatcher
            .handle(enter_event(user, &fence), &fence)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(alert.recipients.len(), 1);
        assert_eq!(alert.recipients[0].guardian_id, user);
        assert_eq!(alert.recipients[0].method, DeliveryMethod::Push);
        fx.dispatcher.await_deliveries().await;
    }
}
