use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{webhook_deliveries, webhooks};

/// A webhook subscription. The management plane creates these; the
/// delivery engine reads, counts failures, and may auto-disable.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = webhooks)]
pub struct Webhook {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub url: String,
    pub secret: String,
    pub events: Vec<String>,
    pub is_active: bool,
    pub failure_count: i32,
    pub first_failed_at: Option<DateTime<Utc>>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One (subscription, event) outbound lifecycle, retries included.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = webhook_deliveries)]
pub struct WebhookDelivery {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event: String,
    /// The exact bytes POSTed and signed; stored so every retry signs the
    /// same message.
    pub payload: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl WebhookDelivery {
    /// Pending while unfinished and attempts remain; terminal otherwise.
    pub fn is_pending(&self) -> bool {
        self.completed_at.is_none() && self.attempts < self.max_attempts
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = webhook_deliveries)]
pub struct NewWebhookDelivery {
    pub webhook_id: Uuid,
    pub event: String,
    pub payload: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery(attempts: i32, completed: bool) -> WebhookDelivery {
        WebhookDelivery {
            id: Uuid::nil(),
            webhook_id: Uuid::nil(),
            event: "link.clicked".into(),
            payload: "{}".into(),
            attempts,
            max_attempts: 5,
            response_status: None,
            response_body: None,
            next_attempt_at: Utc::now(),
            completed_at: completed.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_requires_attempts_left_and_no_completion() {
        assert!(delivery(0, false).is_pending());
        assert!(delivery(4, false).is_pending());
        assert!(!delivery(5, false).is_pending());
        assert!(!delivery(1, true).is_pending());
    }
}
