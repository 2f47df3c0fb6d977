use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use linkrift_shared::clients::db::DbPool;
use linkrift_shared::errors::AppResult;

use crate::models::{NewWebhookDelivery, Webhook, WebhookDelivery};
use crate::schema::{webhook_deliveries, webhooks};

/// The trailing window and threshold for auto-disable.
const FAILURE_WINDOW_HOURS: i64 = 24;
const FAILURE_DISABLE_THRESHOLD: i32 = 10;

fn get_conn(
    pool: &DbPool,
) -> AppResult<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>>
{
    pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })
}

/// Active subscriptions in the workspace that selected this event name.
pub fn find_matching(
    pool: &DbPool,
    workspace_id: Uuid,
    event_name: &str,
) -> AppResult<Vec<Webhook>> {
    let mut conn = get_conn(pool)?;

    let subscriptions = webhooks::table
        .filter(webhooks::workspace_id.eq(workspace_id))
        .filter(webhooks::is_active.eq(true))
        .filter(webhooks::events.contains(vec![event_name.to_string()]))
        .select(Webhook::as_select())
        .load::<Webhook>(&mut conn)?;

    Ok(subscriptions)
}

/// Create the delivery row before the first attempt; it persists whatever
/// the attempt's outcome.
pub fn create_delivery(
    pool: &DbPool,
    webhook_id: Uuid,
    event: &str,
    payload: &str,
) -> AppResult<WebhookDelivery> {
    let mut conn = get_conn(pool)?;

    let delivery = diesel::insert_into(webhook_deliveries::table)
        .values(&NewWebhookDelivery {
            webhook_id,
            event: event.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            max_attempts: 5,
            next_attempt_at: Utc::now(),
        })
        .get_result::<WebhookDelivery>(&mut conn)?;

    Ok(delivery)
}

/// Record a 2xx outcome: status/body, completion, and the subscription's
/// `last_triggered_at`.
pub fn record_success(
    pool: &DbPool,
    delivery: &WebhookDelivery,
    status: i32,
    body: &str,
) -> AppResult<()> {
    let mut conn = get_conn(pool)?;

    diesel::update(webhook_deliveries::table.find(delivery.id))
        .set((
            webhook_deliveries::attempts.eq(delivery.attempts + 1),
            webhook_deliveries::response_status.eq(Some(status)),
            webhook_deliveries::response_body.eq(Some(body)),
            webhook_deliveries::completed_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)?;

    diesel::update(webhooks::table.find(delivery.webhook_id))
        .set(webhooks::last_triggered_at.eq(Some(Utc::now())))
        .execute(&mut conn)?;

    Ok(())
}

/// Record a failed attempt. Exhausting `max_attempts` closes the delivery;
/// otherwise the next attempt is scheduled.
pub fn record_failure(
    pool: &DbPool,
    delivery: &WebhookDelivery,
    status: Option<i32>,
    body: &str,
    next_attempt_at: DateTime<Utc>,
) -> AppResult<()> {
    let mut conn = get_conn(pool)?;

    let attempts = delivery.attempts + 1;
    let completed_at = (attempts >= delivery.max_attempts).then(Utc::now);

    diesel::update(webhook_deliveries::table.find(delivery.id))
        .set((
            webhook_deliveries::attempts.eq(attempts),
            webhook_deliveries::response_status.eq(status),
            webhook_deliveries::response_body.eq(Some(body)),
            webhook_deliveries::next_attempt_at.eq(next_attempt_at),
            webhook_deliveries::completed_at.eq(completed_at),
        ))
        .execute(&mut conn)?;

    Ok(())
}

/// Bump the subscription's trailing failure window; disable at the
/// threshold. Returns whether the subscription was just disabled.
///
/// The window restarts when the first recorded failure ages past 24 h, so
/// slow trickles of failures never accumulate to a disable.
pub fn bump_failure_window(pool: &DbPool, webhook: &Webhook) -> AppResult<bool> {
    let mut conn = get_conn(pool)?;

    let now = Utc::now();
    let window_start = now - Duration::hours(FAILURE_WINDOW_HOURS);
    let window_expired = webhook
        .first_failed_at
        .map(|at| at < window_start)
        .unwrap_or(true);

    let failure_count = if window_expired {
        1
    } else {
        webhook.failure_count + 1
    };
    let first_failed_at = if window_expired {
        now
    } else {
        webhook.first_failed_at.unwrap_or(now)
    };
    let disable = failure_count >= FAILURE_DISABLE_THRESHOLD;

    diesel::update(webhooks::table.find(webhook.id))
        .set((
            webhooks::failure_count.eq(failure_count),
            webhooks::first_failed_at.eq(Some(first_failed_at)),
            webhooks::is_active.eq(webhook.is_active && !disable),
        ))
        .execute(&mut conn)?;

    if disable {
        tracing::warn!(
            webhook_id = %webhook.id,
            failure_count,
            "webhook disabled after sustained failures"
        );
    }

    Ok(disable)
}

/// Pending deliveries whose retry window has elapsed, joined with their
/// subscription (active or not -- the sweep closes deliveries of disabled
/// subscriptions).
pub fn pending_due(
    pool: &DbPool,
    now: DateTime<Utc>,
    limit: i64,
) -> AppResult<Vec<(WebhookDelivery, Webhook)>> {
    let mut conn = get_conn(pool)?;

    let due = webhook_deliveries::table
        .inner_join(webhooks::table)
        .filter(webhook_deliveries::completed_at.is_null())
        .filter(webhook_deliveries::attempts.lt(webhook_deliveries::max_attempts))
        .filter(webhook_deliveries::next_attempt_at.le(now))
        .order(webhook_deliveries::next_attempt_at.asc())
        .limit(limit)
        .select((WebhookDelivery::as_select(), Webhook::as_select()))
        .load::<(WebhookDelivery, Webhook)>(&mut conn)?;

    Ok(due)
}

/// Drop terminal deliveries past the retention horizon.
pub fn purge_terminal(pool: &DbPool, older_than: DateTime<Utc>) -> AppResult<usize> {
    let mut conn = get_conn(pool)?;

    let purged = diesel::delete(
        webhook_deliveries::table
            .filter(webhook_deliveries::completed_at.is_not_null())
            .filter(webhook_deliveries::completed_at.lt(older_than)),
    )
    .execute(&mut conn)?;

    Ok(purged)
}

/// Terminally close a pending delivery whose subscription was disabled.
pub fn close_disabled(pool: &DbPool, delivery_id: Uuid) -> AppResult<()> {
    let mut conn = get_conn(pool)?;

    diesel::update(webhook_deliveries::table.find(delivery_id))
        .set((
            webhook_deliveries::response_body.eq(Some("webhook disabled")),
            webhook_deliveries::completed_at.eq(Some(Utc::now())),
        ))
        .execute(&mut conn)?;

    Ok(())
}
