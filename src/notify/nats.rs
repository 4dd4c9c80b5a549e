//! NATS client wrapper and notification sender
//!
//! Alerts fan out on per-guardian subjects (`ALERT.<METHOD>.<guardian>`);
//! provider bridges subscribe and relay to SMS/push/voice gateways.

use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::NatsArgs;
use crate::notify::{AlertNotification, DeliveryOutcome, NotificationSender, RecipientContact};
use crate::types::{GuardianError, Result};

/// Default ping interval for keep-alive
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// NATS client wrapper
#[derive(Clone)]
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to NATS. Fails fast when the server is unreachable;
    /// reconnection is handled by the underlying client afterwards.
    pub async fn new(args: &NatsArgs, name: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", args.nats_url);

        let mut options = ConnectOptions::new()
            .name(name)
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(Duration::from_secs(5));

        if let (Some(user), Some(pass)) = (&args.nats_user, &args.nats_password) {
            options = options.user_and_password(user.clone(), pass.clone());
        }

        let client = options
            .connect(&args.nats_url)
            .await
            .map_err(|e| GuardianError::Nats(format!("Failed to connect: {e}")))?;

        info!("Connected to NATS at {}", args.nats_url);

        Ok(Self { client })
    }

    /// Publish a message to a subject.
    pub async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        self.client
            .publish(subject, payload)
            .await
            .map_err(|e| GuardianError::Nats(format!("Publish failed: {e}")))
    }

    /// Underlying NATS client.
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Sender publishing alert notifications over NATS.
pub struct NatsSender {
    nats: NatsClient,
}

impl NatsSender {
    pub fn new(nats: NatsClient) -> Self {
        Self { nats }
    }
}

#[async_trait]
impl NotificationSender for NatsSender {
    async fn send(
        &self,
        contact: &RecipientContact,
        payload: &AlertNotification,
    ) -> DeliveryOutcome {
        // A payload that cannot serialize will never succeed; don't retry
        let bytes = match payload.to_bytes() {
            Ok(b) => b,
            Err(e) => return DeliveryOutcome::Permanent(format!("serialization failed: {e}")),
        };

        let subject = AlertNotification::subject(contact);
        match self.nats.publish(subject.clone(), bytes).await {
            Ok(()) => {
                debug!(subject = subject, alert_id = %payload.alert_id, "Alert published");
                DeliveryOutcome::Accepted
            }
            // Publish failures are connectivity problems; the broker may
            // come back before the retry budget runs out
            Err(e) => DeliveryOutcome::Transient(e.to_string()),
        }
    }
}
