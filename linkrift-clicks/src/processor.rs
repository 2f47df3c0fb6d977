//! The consumer loop: drain `clicks:queue`, enrich, persist, fan out.
//!
//! One event at a time, blocking pop with a short timeout. Individual
//! event failures log and drop; only a cancellation stops the loop.

use std::sync::Arc;

use metrics::counter;
use socketioxide::SocketIo;
use tokio::sync::watch;

use linkrift_shared::botdetect;
use linkrift_shared::license::Feature;
use linkrift_shared::types::{
    resolve_cache_key, ClickEvent, CLICK_QUEUE_KEY, LINK_INVALIDATE_CHANNEL,
};

use crate::events::publisher;
use crate::models::{NewClick, RealtimeClick};
use crate::realtime;
use crate::services::click_service;
use crate::{uaparse, WorkerState};

const POP_TIMEOUT_SECS: f64 = 2.0;

pub async fn run(state: Arc<WorkerState>, io: SocketIo, mut shutdown_rx: watch::Receiver<bool>) {
    tracing::info!("click processor started");
    loop {
        let popped = tokio::select! {
            popped = state.redis.blpop(CLICK_QUEUE_KEY, POP_TIMEOUT_SECS) => popped,
            _ = shutdown_rx.changed() => break,
        };

        match popped {
            Ok(Some(raw)) => {
                if let Err(e) = process_event(&state, &io, &raw).await {
                    counter!("clicks_failed_total").increment(1);
                    tracing::warn!(error = %e, "click event dropped");
                }
            }
            Ok(None) => {
                // Queue idle; loop back into the blocking pop.
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "click queue pop failed");
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
    tracing::info!("click processor stopped");
}

async fn process_event(state: &Arc<WorkerState>, io: &SocketIo, raw: &str) -> anyhow::Result<()> {
    let event: ClickEvent = serde_json::from_str(raw)
        .map_err(|e| anyhow::anyhow!("click event decode failed: {e}"))?;

    // Producer-side classification is re-checked: events outlive restarts
    // and pattern sets move.
    let is_bot = botdetect::is_bot(&event.user_agent);
    let ua = uaparse::parse(&event.user_agent);
    let geo = state.geo.lookup(&event.ip);

    let Some(link) = click_service::get_link_meta(&state.db, event.link_id)? else {
        tracing::warn!(link_id = %event.link_id, short_code = %event.short_code, "link vanished before click persisted");
        return Ok(());
    };

    let record = NewClick {
        link_id: event.link_id,
        workspace_id: link.workspace_id,
        short_code: event.short_code.clone(),
        ip: event.ip.clone(),
        user_agent: event.user_agent.clone(),
        referer: event.referer.clone(),
        is_bot,
        browser_name: ua.browser_name,
        browser_version: ua.browser_version,
        os_name: ua.os_name,
        os_version: ua.os_version,
        device_type: ua.device_type.as_str().to_string(),
        country_code: geo.country_code,
        region: geo.region,
        city: geo.city,
        clicked_at: event.timestamp,
    };

    // Persist first; a failed insert drops the event without moving the
    // counter.
    click_service::insert_click(&state.db, &record)?;

    if !is_bot {
        click_service::increment_total_clicks(&state.db, event.link_id)?;
        // The resolver re-reads the bumped counter on its next miss; this
        // is how max_clicks becomes visible to the redirect plane. The
        // pub/sub message evicts every replica's L1, the DEL guarantees L2.
        if let Err(e) = state.redis.del(&resolve_cache_key(&event.short_code)).await {
            tracing::warn!(short_code = %event.short_code, error = %e, "resolve cache invalidation failed");
        }
        if let Err(e) = state
            .redis
            .publish(LINK_INVALIDATE_CHANNEL, &event.short_code)
            .await
        {
            tracing::warn!(short_code = %event.short_code, error = %e, "invalidation publish failed");
        }
    }

    counter!("clicks_processed_total").increment(1);

    if state.license.has_feature(Feature::RealtimeEvents) {
        realtime::emit_click(
            io,
            link.workspace_id,
            &RealtimeClick {
                link_id: record.link_id,
                short_code: record.short_code.clone(),
                is_bot: record.is_bot,
                country_code: record.country_code.clone(),
                device_type: record.device_type.clone(),
                browser_name: record.browser_name.clone(),
                clicked_at: record.clicked_at,
            },
        );
    }

    if let Some(sink) = &state.analytics {
        if state.license.has_feature(Feature::AnalyticsExport) {
            if let Err(e) = sink.insert_click(&record).await {
                tracing::warn!(error = %e, "analytics sink insert failed");
            }
        }
    }

    if state.license.has_feature(Feature::Webhooks) {
        publisher::publish_link_clicked(
            &state.rabbitmq,
            link.workspace_id,
            &link.destination_url,
            &record,
        )
        .await;
    }

    Ok(())
}
