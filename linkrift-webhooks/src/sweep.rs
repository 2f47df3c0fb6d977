//! The retry sweep: every 30 s, pick up pending deliveries whose backoff
//! window has elapsed and attempt them again. Deliveries belonging to
//! disabled subscriptions are terminally closed instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use linkrift_shared::errors::AppResult;

use crate::dispatcher;
use crate::services::webhook_service;
use crate::WorkerState;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const SWEEP_BATCH: i64 = 100;
/// Terminal deliveries are purged roughly once an hour.
const PURGE_EVERY_TICKS: u32 = 120;

pub async fn run(state: Arc<WorkerState>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tracing::info!("webhook retry sweep started");

    let mut ticks: u32 = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match process_once(&state).await {
                    Ok(0) => {}
                    Ok(retried) => tracing::info!(retried, "retry sweep completed"),
                    Err(e) => tracing::error!(error = %e, "retry sweep failed"),
                }

                ticks = ticks.wrapping_add(1);
                if ticks % PURGE_EVERY_TICKS == 0 {
                    let horizon = Utc::now()
                        - chrono::Duration::days(state.config.delivery_retention_days);
                    match webhook_service::purge_terminal(&state.db, horizon) {
                        Ok(0) => {}
                        Ok(purged) => tracing::info!(purged, "terminal deliveries purged"),
                        Err(e) => tracing::error!(error = %e, "delivery purge failed"),
                    }
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
    tracing::info!("webhook retry sweep stopped");
}

/// One pass over due deliveries. Returns how many were attempted.
pub async fn process_once(state: &Arc<WorkerState>) -> AppResult<usize> {
    let due = webhook_service::pending_due(&state.db, Utc::now(), SWEEP_BATCH)?;
    let mut retried = 0;

    for (delivery, webhook) in due {
        if !webhook.is_active {
            webhook_service::close_disabled(&state.db, delivery.id)?;
            continue;
        }
        dispatcher::attempt_and_record(state, &webhook, &delivery).await;
        retried += 1;
    }

    Ok(retried)
}
