//! Per-recipient delivery with timeout, retry, and backoff
//!
//! One task per recipient; a failure here is recorded on the recipient
//! record and never surfaces to the ingestion path.

use std::time::Duration;

use rand::Rng;
use tokio::time::timeout;
use tracing::{error, warn};
use uuid::Uuid;

use crate::dispatch::AlertDispatcher;
use crate::model::RecipientStatus;
use crate::notify::{AlertNotification, DeliveryOutcome, RecipientContact};

/// Run the delivery state machine for one recipient.
pub(super) async fn deliver(
    dispatcher: AlertDispatcher,
    alert_id: Uuid,
    contact: RecipientContact,
    payload: AlertNotification,
) {
    let config = dispatcher.config.clone();
    let mut backoff = config.initial_backoff;

    for attempt in 1..=config.max_attempts {
        let outcome = match timeout(
            config.attempt_timeout,
            dispatcher.sender.send(&contact, &payload),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => DeliveryOutcome::Transient("delivery attempt timed out".to_string()),
        };

        match outcome {
            DeliveryOutcome::Accepted => {
                record(&dispatcher, alert_id, &contact, RecipientStatus::Sent).await;
                return;
            }
            DeliveryOutcome::Permanent(reason) => {
                warn!(
                    alert_id = %alert_id,
                    guardian_id = %contact.guardian_id,
                    method = contact.method.as_str(),
                    "Permanent delivery failure: {reason}"
                );
                record(&dispatcher, alert_id, &contact, RecipientStatus::Failed).await;
                return;
            }
            DeliveryOutcome::Transient(reason) => {
                warn!(
                    alert_id = %alert_id,
                    guardian_id = %contact.guardian_id,
                    attempt,
                    max_attempts = config.max_attempts,
                    "Transient delivery failure: {reason}"
                );
                if attempt < config.max_attempts {
                    tokio::time::sleep(with_jitter(backoff)).await;
                    backoff *= 2;
                }
            }
        }
    }

    warn!(
        alert_id = %alert_id,
        guardian_id = %contact.guardian_id,
        "Retry budget exhausted, marking recipient failed"
    );
    record(&dispatcher, alert_id, &contact, RecipientStatus::Failed).await;
}

/// Add up to 50% random jitter so simultaneous retries fan out.
fn with_jitter(backoff: Duration) -> Duration {
    let half = backoff.as_millis() as u64 / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    backoff + Duration::from_millis(jitter)
}

async fn record(
    dispatcher: &AlertDispatcher,
    alert_id: Uuid,
    contact: &RecipientContact,
    status: RecipientStatus,
) {
    if let Err(e) = dispatcher
        .update_recipient(alert_id, contact.guardian_id, status)
        .await
    {
        error!(
            alert_id = %alert_id,
            guardian_id = %contact.guardian_id,
            "Failed to record delivery status: {e}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_within_half_backoff() {
        let backoff = Duration::from_millis(100);
        for _ in 0..50 {
            let jittered = with_jitter(backoff);
            assert!(jittered >= backoff);
            assert!(jittered <= backoff + Duration::from_millis(50));
        }
    }
}
