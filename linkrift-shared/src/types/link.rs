use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// L2 cache key for a resolved snapshot; shared between the resolver
/// (read/write) and the click processor (invalidate on counter bump).
pub fn resolve_cache_key(short_code: &str) -> String {
    format!("link:resolve:{short_code}")
}

/// Pub/sub channel carrying short codes whose snapshots must be dropped.
/// Writers (the click processor, the management plane) publish here so
/// every redirect replica evicts its L1 entry, not just the shared L2.
pub const LINK_INVALIDATE_CHANNEL: &str = "link:invalidate";

/// Kind of condition a redirect rule matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    Device,
    Browser,
    Os,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Browser => "browser",
            Self::Os => "os",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "device" => Some(Self::Device),
            "browser" => Some(Self::Browser),
            "os" => Some(Self::Os),
            _ => None,
        }
    }
}

/// A conditional-redirect rule as cached inside the snapshot.
///
/// `condition_value` is kept raw (either `{"value":"..."}` JSON or a bare
/// string); the rule engine normalises it at evaluation time so a malformed
/// condition skips the rule instead of poisoning the cache entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub rule_type: RuleType,
    pub condition_value: String,
    pub destination_url: String,
    pub priority: i32,
}

/// The resolver's read-only view of a link.
///
/// Built from the authoritative `links` row on a cache miss, serialised as
/// JSON into the L2 cache under `link:resolve:<short_code>`, and invalidated
/// whenever the management plane updates the row or the click processor
/// bumps the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub short_code: String,
    pub destination_url: String,
    pub is_active: bool,
    pub has_password: bool,
    /// Argon2id PHC string; present iff `has_password`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_clicks: Option<i32>,
    pub total_clicks: i64,
    /// Active rules in evaluation order (ascending priority, then creation
    /// order), cached alongside the snapshot so the hot path makes no extra
    /// relational read.
    #[serde(default)]
    pub rules: Vec<RuleSnapshot>,
}

impl LinkSnapshot {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }

    pub fn is_over_limit(&self) -> bool {
        self.max_clicks
            .map(|max| self.total_clicks >= max as i64)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot() -> LinkSnapshot {
        LinkSnapshot {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            short_code: "abc".into(),
            destination_url: "https://example.com/x".into(),
            is_active: true,
            has_password: false,
            password_hash: None,
            expires_at: None,
            max_clicks: None,
            total_clicks: 0,
            rules: vec![],
        }
    }

    #[test]
    fn expiry_boundary_treats_the_exact_instant_as_expired() {
        let now = Utc::now();
        let mut s = snapshot();
        s.expires_at = Some(now);
        assert!(s.is_expired(now));
        assert!(!s.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn limit_boundary_counts_equal_as_over() {
        let mut s = snapshot();
        s.max_clicks = Some(10);
        s.total_clicks = 9;
        assert!(!s.is_over_limit());
        s.total_clicks = 10;
        assert!(s.is_over_limit());
    }

    #[test]
    fn snapshot_roundtrips_through_cache_json() {
        let mut s = snapshot();
        s.rules.push(RuleSnapshot {
            rule_type: RuleType::Device,
            condition_value: r#"{"value":"mobile"}"#.into(),
            destination_url: "https://m.example.com".into(),
            priority: 1,
        });
        let json = serde_json::to_string(&s).unwrap();
        let back: LinkSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.short_code, "abc");
        assert_eq!(back.rules.len(), 1);
        assert_eq!(back.rules[0].rule_type, RuleType::Device);
    }
}
