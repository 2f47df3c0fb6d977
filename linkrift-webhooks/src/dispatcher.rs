//! The producer side of delivery: consume the event topic, fan out one
//! delivery row per matching subscription, and perform the first attempt
//! inline. Retries belong to the sweep.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use lapin::options::BasicAckOptions;
use metrics::counter;
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use linkrift_shared::errors::AppResult;
use linkrift_shared::license::Feature;
use linkrift_shared::types::Event;

use crate::delivery;
use crate::models::{Webhook, WebhookDelivery};
use crate::services::webhook_service;
use crate::WorkerState;

/// Outbound body shape: `{"event","workspace_id","timestamp","data"}`.
#[derive(Debug, Serialize)]
struct OutboundPayload<'a> {
    event: &'a str,
    workspace_id: Uuid,
    timestamp: DateTime<Utc>,
    data: &'a serde_json::Value,
}

pub async fn run(state: Arc<WorkerState>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut consumer = match state
        .rabbitmq
        .subscribe("linkrift-webhooks.events", &["#"])
        .await
    {
        Ok(consumer) => consumer,
        Err(e) => {
            tracing::error!(error = %e, "webhook event subscription failed");
            return;
        }
    };

    tracing::info!("webhook dispatcher started");
    loop {
        let next = tokio::select! {
            next = consumer.next() => next,
            _ = shutdown_rx.changed() => break,
        };

        let Some(message) = next else {
            tracing::warn!("webhook event stream closed");
            break;
        };

        match message {
            Ok(message) => {
                if let Err(e) = handle_message(&state, &message.data).await {
                    tracing::error!(error = %e, "webhook event handling failed");
                }
                let _ = message.ack(BasicAckOptions::default()).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "webhook consumer error");
            }
        }
    }
    tracing::info!("webhook dispatcher stopped");
}

async fn handle_message(state: &Arc<WorkerState>, data: &[u8]) -> AppResult<()> {
    let envelope: Event<serde_json::Value> = serde_json::from_slice(data).map_err(|e| {
        linkrift_shared::errors::AppError::internal(format!("event decode failed: {e}"))
    })?;
    publish_event(state, &envelope).await
}

/// Fan an event out to every matching active subscription: one delivery
/// row each (`attempts = 0`, `max_attempts = 5`), first attempt inline.
pub async fn publish_event(
    state: &Arc<WorkerState>,
    envelope: &Event<serde_json::Value>,
) -> AppResult<()> {
    if !state.license.has_feature(Feature::Webhooks) {
        tracing::debug!(event = %envelope.event_type, "webhooks not licensed, event skipped");
        return Ok(());
    }

    let subscriptions =
        webhook_service::find_matching(&state.db, envelope.workspace_id, &envelope.event_type)?;
    if subscriptions.is_empty() {
        return Ok(());
    }

    let payload = serde_json::to_string(&OutboundPayload {
        event: &envelope.event_type,
        workspace_id: envelope.workspace_id,
        timestamp: envelope.timestamp,
        data: &envelope.data,
    })
    .map_err(|e| {
        linkrift_shared::errors::AppError::internal(format!("payload serialization failed: {e}"))
    })?;

    for webhook in subscriptions {
        let delivery = webhook_service::create_delivery(
            &state.db,
            webhook.id,
            &envelope.event_type,
            &payload,
        )?;
        attempt_and_record(state, &webhook, &delivery).await;
    }

    Ok(())
}

/// One attempt against one subscription, with the outcome recorded on the
/// delivery row and the subscription's failure window.
pub async fn attempt_and_record(
    state: &Arc<WorkerState>,
    webhook: &Webhook,
    delivery: &WebhookDelivery,
) {
    let outcome = delivery::attempt(
        &state.http,
        webhook,
        delivery.id,
        &delivery.event,
        &delivery.payload,
    )
    .await;

    if outcome.success {
        counter!("webhook_deliveries_total", "outcome" => "success").increment(1);
        tracing::info!(
            webhook_id = %webhook.id,
            delivery_id = %delivery.id,
            status = outcome.status,
            attempt = delivery.attempts + 1,
            "webhook delivered"
        );
        if let Err(e) =
            webhook_service::record_success(&state.db, delivery, outcome.status.unwrap_or(0) as i32, &outcome.body)
        {
            tracing::error!(delivery_id = %delivery.id, error = %e, "failed to record delivery success");
        }
        return;
    }

    counter!("webhook_deliveries_total", "outcome" => "failure").increment(1);
    tracing::warn!(
        webhook_id = %webhook.id,
        delivery_id = %delivery.id,
        status = ?outcome.status,
        attempt = delivery.attempts + 1,
        "webhook delivery failed"
    );

    let failed_attempts = (delivery.attempts + 1).max(1) as u32;
    let next_attempt_at =
        Utc::now() + chrono::Duration::from_std(state.retry.delay_after(failed_attempts))
            .unwrap_or_else(|_| chrono::Duration::seconds(30));

    if let Err(e) = webhook_service::record_failure(
        &state.db,
        delivery,
        outcome.status.map(|s| s as i32),
        &outcome.body,
        next_attempt_at,
    ) {
        tracing::error!(delivery_id = %delivery.id, error = %e, "failed to record delivery failure");
    }

    match webhook_service::bump_failure_window(&state.db, webhook) {
        Ok(true) => {
            counter!("webhooks_auto_disabled_total").increment(1);
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!(webhook_id = %webhook.id, error = %e, "failed to update failure window");
        }
    }
}
