use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Redis list the redirect servers feed and the click processors drain.
pub const CLICK_QUEUE_KEY: &str = "clicks:queue";

/// One in-flight visit, produced by the redirect server and pushed as JSON
/// onto the `clicks:queue` list. The field set is the queue wire contract;
/// enrichment (bot flag, UA breakdown, geo) happens in the click processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub link_id: Uuid,
    pub short_code: String,
    pub ip: String,
    pub user_agent: String,
    pub referer: String,
    pub timestamp: DateTime<Utc>,
}

/// Device class derived from the User-Agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_event_wire_format_keeps_the_queue_contract() {
        let event = ClickEvent {
            link_id: Uuid::nil(),
            short_code: "abc".into(),
            ip: "203.0.113.9".into(),
            user_agent: "Mozilla/5.0".into(),
            referer: "".into(),
            timestamp: Utc::now(),
        };
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        for key in ["link_id", "short_code", "ip", "user_agent", "referer", "timestamp"] {
            assert!(object.contains_key(key), "missing queue field {key}");
        }
    }
}
