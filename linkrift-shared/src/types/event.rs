use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ event envelope wrapping the webhook event topic.
///
/// Routing key = the event name, e.g. `link.clicked`. Consumers receive the
/// full envelope; the webhook engine turns it into the outbound payload
/// `{"event","workspace_id","timestamp","data"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub workspace_id: Uuid,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        workspace_id: Uuid,
        data: T,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            workspace_id,
            data,
        }
    }
}

/// Webhook-visible event names.
pub mod event_names {
    /// Emitted by the click processor for every human click.
    pub const LINK_CLICKED: &str = "link.clicked";

    // Emitted by the management plane; listed here because subscriptions
    // filter on them and the delivery engine treats them uniformly.
    pub const LINK_CREATED: &str = "link.created";
    pub const LINK_UPDATED: &str = "link.updated";
    pub const LINK_DELETED: &str = "link.deleted";
    pub const LINK_EXPIRED: &str = "link.expired";
}

/// Event data payloads produced by the core.
pub mod payloads {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct LinkClicked {
        pub link_id: Uuid,
        pub short_code: String,
        pub destination_url: String,
        pub country_code: String,
        pub device_type: String,
        pub browser_name: String,
        pub os_name: String,
        pub referer: String,
        pub clicked_at: DateTime<Utc>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_json_carries_the_routing_fields() {
        let event = Event::new(
            "linkrift-clicks",
            event_names::LINK_CLICKED,
            Uuid::nil(),
            serde_json::json!({"short_code": "abc"}),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event_type":"link.clicked""#));
        assert!(json.contains(r#""source":"linkrift-clicks""#));
    }
}
