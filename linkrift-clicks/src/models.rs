use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::clicks;

/// Enriched click record, immutable once inserted.
#[derive(Debug, Clone, Insertable, Serialize)]
#[diesel(table_name = clicks)]
pub struct NewClick {
    pub link_id: Uuid,
    pub workspace_id: Uuid,
    pub short_code: String,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub is_bot: bool,
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub device_type: String,
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub clicked_at: DateTime<Utc>,
}

/// The slice of the link row the processor needs for fan-out.
#[derive(Debug, Clone, Queryable)]
pub struct LinkMeta {
    pub workspace_id: Uuid,
    pub destination_url: String,
}

/// Realtime message emitted to `workspace:<id>` Socket.IO rooms.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeClick {
    pub link_id: Uuid,
    pub short_code: String,
    pub is_bot: bool,
    pub country_code: String,
    pub device_type: String,
    pub browser_name: String,
    pub clicked_at: DateTime<Utc>,
}
