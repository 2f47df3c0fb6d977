use diesel::prelude::*;
use uuid::Uuid;

use linkrift_shared::clients::db::DbPool;
use linkrift_shared::errors::AppResult;

use crate::models::{LinkMeta, NewClick};
use crate::schema::{clicks, links};

/// The link fields the processor needs for enrichment and fan-out.
pub fn get_link_meta(pool: &DbPool, link_id: Uuid) -> AppResult<Option<LinkMeta>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })?;

    let meta = links::table
        .find(link_id)
        .select((links::workspace_id, links::destination_url))
        .first::<LinkMeta>(&mut conn)
        .optional()?;

    Ok(meta)
}

/// Persist one enriched click record.
pub fn insert_click(pool: &DbPool, record: &NewClick) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })?;

    diesel::insert_into(clicks::table)
        .values(record)
        .execute(&mut conn)?;

    Ok(())
}

/// Atomically bump the authoritative counter. Only human clicks reach
/// here; bots never move it.
pub fn increment_total_clicks(pool: &DbPool, link_id: Uuid) -> AppResult<()> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })?;

    diesel::update(links::table.find(link_id))
        .set(links::total_clicks.eq(links::total_clicks + 1))
        .execute(&mut conn)?;

    Ok(())
}
