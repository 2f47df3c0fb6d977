use diesel::prelude::*;

use linkrift_shared::clients::db::DbPool;
use linkrift_shared::errors::AppResult;
use linkrift_shared::types::LinkSnapshot;

use crate::models::{Link, LinkRule};
use crate::schema::{link_rules, links};

/// Authoritative read of a link by short code.
pub fn get_link_by_code(pool: &DbPool, short_code: &str) -> AppResult<Option<Link>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })?;

    let link = links::table
        .filter(links::short_code.eq(short_code))
        .select(Link::as_select())
        .first::<Link>(&mut conn)
        .optional()?;

    Ok(link)
}

/// Active rules for a link, in evaluation order.
pub fn get_active_rules(pool: &DbPool, link: &Link) -> AppResult<Vec<LinkRule>> {
    let mut conn = pool.get().map_err(|e| {
        tracing::error!(error = %e, "failed to get db connection");
        linkrift_shared::errors::AppError::internal("database connection error")
    })?;

    let rules = link_rules::table
        .filter(link_rules::link_id.eq(link.id))
        .filter(link_rules::is_active.eq(true))
        .order((link_rules::priority.asc(), link_rules::created_at.asc()))
        .select(LinkRule::as_select())
        .load::<LinkRule>(&mut conn)?;

    Ok(rules)
}

/// Build the resolver snapshot: the link row plus its active rules.
///
/// Returns `None` for unknown short codes; the resolver turns that into the
/// "Link Not Found" page without caching the miss.
pub fn build_snapshot(pool: &DbPool, short_code: &str) -> AppResult<Option<LinkSnapshot>> {
    let Some(link) = get_link_by_code(pool, short_code)? else {
        return Ok(None);
    };
    let rules = get_active_rules(pool, &link)?;
    Ok(Some(link.into_snapshot(rules)))
}
