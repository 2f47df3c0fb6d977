//! Conditional-redirect rule evaluation.
//!
//! Rules arrive ordered (ascending priority, then creation order); the
//! first match wins and its destination replaces the snapshot's. A rule
//! whose condition fails to parse is skipped, never an error.

use linkrift_shared::types::{RuleSnapshot, RuleType};

/// Return the destination of the first matching rule, if any.
pub fn apply_rules<'a>(rules: &'a [RuleSnapshot], user_agent: &str) -> Option<&'a str> {
    let ua = user_agent.to_ascii_lowercase();
    rules
        .iter()
        .find(|rule| rule_matches(rule, &ua))
        .map(|rule| rule.destination_url.as_str())
}

fn rule_matches(rule: &RuleSnapshot, ua_lower: &str) -> bool {
    let Some(value) = parse_condition(&rule.condition_value) else {
        return false;
    };
    let value = value.to_ascii_lowercase();

    match rule.rule_type {
        RuleType::Device => match value.as_str() {
            "mobile" => is_mobile(ua_lower),
            "tablet" => is_tablet(ua_lower),
            "desktop" => !is_mobile(ua_lower) && !is_tablet(ua_lower),
            _ => false,
        },
        RuleType::Browser => match value.as_str() {
            "chrome" => ua_lower.contains("chrome") && !ua_lower.contains("edg"),
            "firefox" => ua_lower.contains("firefox"),
            "safari" => ua_lower.contains("safari") && !ua_lower.contains("chrome"),
            "edge" => ua_lower.contains("edg"),
            _ => false,
        },
        RuleType::Os => match value.as_str() {
            "windows" => ua_lower.contains("windows"),
            "macos" | "mac" => ua_lower.contains("macintosh") || ua_lower.contains("mac os"),
            "linux" => ua_lower.contains("linux") && !ua_lower.contains("android"),
            "ios" => ua_lower.contains("iphone") || ua_lower.contains("ipad"),
            "android" => ua_lower.contains("android"),
            _ => false,
        },
    }
}

fn is_mobile(ua: &str) -> bool {
    ua.contains("mobile") || ua.contains("android") || ua.contains("iphone")
}

fn is_tablet(ua: &str) -> bool {
    ua.contains("tablet") || ua.contains("ipad")
}

/// Normalise a rule condition: either `{"value":"..."}` JSON or a bare
/// string. Anything else is malformed and skips the rule.
fn parse_condition(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
        return value.get("value")?.as_str().map(|s| s.trim().to_string());
    }
    if trimmed.starts_with('"') {
        return serde_json::from_str::<String>(trimmed).ok();
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const DESKTOP_CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

    fn rule(rule_type: RuleType, condition: &str, destination: &str, priority: i32) -> RuleSnapshot {
        RuleSnapshot {
            rule_type,
            condition_value: condition.to_string(),
            destination_url: destination.to_string(),
            priority,
        }
    }

    #[test]
    fn mobile_rule_matches_iphone_but_not_desktop() {
        let rules = vec![rule(RuleType::Device, r#"{"value":"mobile"}"#, "https://m.example.com", 1)];
        assert_eq!(apply_rules(&rules, IPHONE_UA), Some("https://m.example.com"));
        assert_eq!(apply_rules(&rules, DESKTOP_CHROME_UA), None);
    }

    #[test]
    fn bare_string_condition_is_accepted() {
        let rules = vec![rule(RuleType::Device, "tablet", "https://t.example.com", 1)];
        assert_eq!(apply_rules(&rules, IPAD_UA), Some("https://t.example.com"));
    }

    #[test]
    fn desktop_means_neither_mobile_nor_tablet() {
        let rules = vec![rule(RuleType::Device, "desktop", "https://d.example.com", 1)];
        assert_eq!(apply_rules(&rules, DESKTOP_CHROME_UA), Some("https://d.example.com"));
        assert_eq!(apply_rules(&rules, IPHONE_UA), None);
        assert_eq!(apply_rules(&rules, IPAD_UA), None);
    }

    #[test]
    fn edge_is_not_chrome() {
        let chrome = vec![rule(RuleType::Browser, "chrome", "https://c.example.com", 1)];
        assert_eq!(apply_rules(&chrome, EDGE_UA), None);
        assert_eq!(apply_rules(&chrome, DESKTOP_CHROME_UA), Some("https://c.example.com"));

        let edge = vec![rule(RuleType::Browser, "edge", "https://e.example.com", 1)];
        assert_eq!(apply_rules(&edge, EDGE_UA), Some("https://e.example.com"));
    }

    #[test]
    fn safari_excludes_chrome() {
        let rules = vec![rule(RuleType::Browser, "safari", "https://s.example.com", 1)];
        assert_eq!(apply_rules(&rules, IPHONE_UA), Some("https://s.example.com"));
        assert_eq!(apply_rules(&rules, DESKTOP_CHROME_UA), None);
    }

    #[test]
    fn os_predicates() {
        let ios = vec![rule(RuleType::Os, "ios", "https://ios.example.com", 1)];
        assert_eq!(apply_rules(&ios, IPHONE_UA), Some("https://ios.example.com"));

        let windows = vec![rule(RuleType::Os, "windows", "https://w.example.com", 1)];
        assert_eq!(apply_rules(&windows, DESKTOP_CHROME_UA), Some("https://w.example.com"));

        let linux_ua = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
        let android_ua = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
        let linux = vec![rule(RuleType::Os, "linux", "https://l.example.com", 1)];
        assert_eq!(apply_rules(&linux, linux_ua), Some("https://l.example.com"));
        assert_eq!(apply_rules(&linux, android_ua), None);
    }

    #[test]
    fn first_match_by_order_wins() {
        let rules = vec![
            rule(RuleType::Os, "windows", "https://first.example.com", 1),
            rule(RuleType::Browser, "chrome", "https://second.example.com", 2),
        ];
        assert_eq!(apply_rules(&rules, DESKTOP_CHROME_UA), Some("https://first.example.com"));
    }

    #[test]
    fn malformed_conditions_are_skipped() {
        let rules = vec![
            rule(RuleType::Device, r#"{"value":}"#, "https://bad.example.com", 1),
            rule(RuleType::Device, r#"{"other":"mobile"}"#, "https://bad2.example.com", 2),
            rule(RuleType::Device, "", "https://bad3.example.com", 3),
            rule(RuleType::Device, "mobile", "https://good.example.com", 4),
        ];
        assert_eq!(apply_rules(&rules, IPHONE_UA), Some("https://good.example.com"));
    }

    #[test]
    fn unknown_condition_value_never_matches() {
        let rules = vec![rule(RuleType::Device, "smartwatch", "https://x.example.com", 1)];
        assert_eq!(apply_rules(&rules, IPHONE_UA), None);
    }
}
