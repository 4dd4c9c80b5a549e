//! Periodic auto-resolve sweeper
//!
//! Runs [`AlertDispatcher::auto_resolve_sweep`] on an interval. The sweep
//! re-evaluates absolute time each tick, so a missed tick changes nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::dispatch::AlertDispatcher;

/// Background task resolving expired auto-resolve alerts.
pub struct AutoResolveSweeper {
    dispatcher: AlertDispatcher,
    interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl AutoResolveSweeper {
    pub fn new(dispatcher: AlertDispatcher, interval: Duration) -> Self {
        Self {
            dispatcher,
            interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the sweep loop.
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Auto-resolve sweeper already running");
                return;
            }
            *running = true;
        }

        info!(interval = ?self.interval, "Starting auto-resolve sweeper");

        let sweeper = Arc::clone(&self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweeper.interval);

            loop {
                interval.tick().await;

                if !*sweeper.running.read().await {
                    info!("Auto-resolve sweeper stopped");
                    break;
                }

                if let Err(e) = sweeper.dispatcher.auto_resolve_sweep(Utc::now()).await {
                    error!("Auto-resolve sweep failed: {e}");
                }
            }
        });
    }

    /// Stop the sweep loop at the next tick.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Stopping auto-resolve sweeper");
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
