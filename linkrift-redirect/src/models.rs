use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use linkrift_shared::types::{LinkSnapshot, RuleSnapshot, RuleType};

use crate::schema::{link_rules, links};

/// Authoritative link row. The redirect plane only reads it; writes come
/// from the management plane and the click processor's counter updates.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = links)]
pub struct Link {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub short_code: String,
    pub destination_url: String,
    pub is_active: bool,
    pub has_password: bool,
    pub password_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i32>,
    pub total_clicks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = link_rules)]
pub struct LinkRule {
    pub id: Uuid,
    pub link_id: Uuid,
    pub rule_type: String,
    pub condition_value: String,
    pub destination_url: String,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Build the resolver snapshot from the row plus its active rules
    /// (already ordered by priority, then creation order).
    pub fn into_snapshot(self, rules: Vec<LinkRule>) -> LinkSnapshot {
        let rules = rules
            .into_iter()
            .filter_map(|rule| {
                let rule_type = RuleType::parse(&rule.rule_type)?;
                Some(RuleSnapshot {
                    rule_type,
                    condition_value: rule.condition_value,
                    destination_url: rule.destination_url,
                    priority: rule.priority,
                })
            })
            .collect();

        LinkSnapshot {
            id: self.id,
            workspace_id: self.workspace_id,
            short_code: self.short_code,
            destination_url: self.destination_url,
            is_active: self.is_active,
            has_password: self.has_password,
            password_hash: self.password_hash,
            expires_at: self.expires_at,
            max_clicks: self.max_clicks,
            total_clicks: self.total_clicks,
            rules,
        }
    }
}

/// Form body for `POST /{short_code}/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    pub password: String,
}

/// Response for `GET /{short_code}/preview`.
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub short_code: String,
    pub destination_url: String,
    pub is_active: bool,
    pub has_password: bool,
    pub is_expired: bool,
}
