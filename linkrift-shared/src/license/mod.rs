//! License verification and the feature/limit gate shared by every
//! Linkrift process.
//!
//! A license key is a base64 JSON envelope `{license, signature, version}`
//! where `license` is the base64 JSON license body and `signature` is a
//! base64 Ed25519 signature over the decoded body bytes, checked against a
//! public key compiled into the binary. Anything that fails to decode or
//! verify drops the process to the Community tier.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize};

/// Ed25519 public key the management plane signs licenses with.
pub const LICENSE_PUBLIC_KEY_B64: &str = "atEOWnXUHEpAw8homLaQ5PECaSe4U7FxtX5NLr9rHew=";

// ── Tiers and features ──────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
    Business,
    Enterprise,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
            Self::Business => "business",
            Self::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gated product features. A license has a feature if it is explicitly
/// listed in the license body or the license tier reaches the feature's
/// minimum tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    PasswordProtection,
    LinkRules,
    Webhooks,
    ApiAccess,
    CustomDomains,
    RealtimeEvents,
    AnalyticsExport,
    Sso,
}

impl Feature {
    pub fn key(&self) -> &'static str {
        match self {
            Self::PasswordProtection => "password_protection",
            Self::LinkRules => "link_rules",
            Self::Webhooks => "webhooks",
            Self::ApiAccess => "api_access",
            Self::CustomDomains => "custom_domains",
            Self::RealtimeEvents => "realtime_events",
            Self::AnalyticsExport => "analytics_export",
            Self::Sso => "sso",
        }
    }

    pub fn min_tier(&self) -> Tier {
        match self {
            Self::PasswordProtection | Self::LinkRules | Self::Webhooks | Self::ApiAccess => {
                Tier::Free
            }
            Self::CustomDomains | Self::RealtimeEvents => Tier::Pro,
            Self::AnalyticsExport => Tier::Business,
            Self::Sso => Tier::Enterprise,
        }
    }
}

// ── Limits ──────────────────────────────────────────────────────────────────

/// Numeric plan limits; `-1` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseLimits {
    pub users: i64,
    pub domains: i64,
    pub links_per_month: i64,
    pub clicks_per_month: i64,
    pub workspaces: i64,
    pub api_requests_per_minute: i64,
}

impl LicenseLimits {
    /// Community (unlicensed) defaults.
    pub fn community() -> Self {
        Self {
            users: 3,
            domains: 1,
            links_per_month: 100,
            clicks_per_month: 10_000,
            workspaces: 1,
            api_requests_per_minute: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Users,
    Domains,
    LinksPerMonth,
    ClicksPerMonth,
    Workspaces,
    ApiRequestsPerMinute,
}

// ── License body ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub tier: Tier,
    pub issued_at: DateTime<Utc>,
    /// Absent or empty means perpetual.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub features: Vec<String>,
    pub limits: LicenseLimits,
}

impl License {
    pub fn community() -> Self {
        Self {
            tier: Tier::Free,
            issued_at: Utc::now(),
            expires_at: None,
            features: vec![
                Feature::PasswordProtection.key().to_string(),
                Feature::LinkRules.key().to_string(),
                Feature::ApiAccess.key().to_string(),
                Feature::Webhooks.key().to_string(),
                Feature::RealtimeEvents.key().to_string(),
            ],
            limits: LicenseLimits::community(),
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.iter().any(|f| f == feature.key()) || self.tier >= feature.min_tier()
    }

    pub fn limit(&self, kind: LimitKind) -> i64 {
        match kind {
            LimitKind::Users => self.limits.users,
            LimitKind::Domains => self.limits.domains,
            LimitKind::LinksPerMonth => self.limits.links_per_month,
            LimitKind::ClicksPerMonth => self.limits.clicks_per_month,
            LimitKind::Workspaces => self.limits.workspaces,
            LimitKind::ApiRequestsPerMinute => self.limits.api_requests_per_minute,
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

// ── Verification ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    #[error("malformed license key: {0}")]
    Malformed(String),
    #[error("license signature verification failed")]
    BadSignature,
    #[error("license is not yet valid")]
    NotYetValid,
    #[error("license has expired")]
    Expired,
    #[error("license validity window is inverted")]
    InvalidWindow,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    license: String,
    signature: String,
    #[serde(default)]
    #[allow(dead_code)]
    version: u8,
}

/// Decode and verify a license key against `public_key` at instant `now`.
pub fn verify_license_key(
    key: &str,
    public_key: &VerifyingKey,
    now: DateTime<Utc>,
) -> Result<License, LicenseError> {
    let envelope_bytes = BASE64
        .decode(key.trim())
        .map_err(|e| LicenseError::Malformed(format!("envelope base64: {e}")))?;
    let envelope: Envelope = serde_json::from_slice(&envelope_bytes)
        .map_err(|e| LicenseError::Malformed(format!("envelope json: {e}")))?;

    let license_bytes = BASE64
        .decode(envelope.license.as_bytes())
        .map_err(|e| LicenseError::Malformed(format!("license base64: {e}")))?;
    let signature_bytes = BASE64
        .decode(envelope.signature.as_bytes())
        .map_err(|e| LicenseError::Malformed(format!("signature base64: {e}")))?;

    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|_| LicenseError::BadSignature)?;
    public_key
        .verify_strict(&license_bytes, &signature)
        .map_err(|_| LicenseError::BadSignature)?;

    let license: License = serde_json::from_slice(&license_bytes)
        .map_err(|e| LicenseError::Malformed(format!("license json: {e}")))?;

    if let Some(expires_at) = license.expires_at {
        if license.issued_at > expires_at {
            return Err(LicenseError::InvalidWindow);
        }
        if now > expires_at {
            return Err(LicenseError::Expired);
        }
    }
    if now < license.issued_at {
        return Err(LicenseError::NotYetValid);
    }

    Ok(license)
}

// ── Manager ─────────────────────────────────────────────────────────────────

/// Process-wide license state.
///
/// Reads are frequent (every gated operation) and cheap: a `std::sync`
/// read lock around the current license snapshot. Writes only happen at
/// startup and on periodic re-verification.
pub struct LicenseManager {
    public_key: VerifyingKey,
    key: RwLock<Option<String>>,
    current: RwLock<License>,
}

impl LicenseManager {
    pub fn new(license_key: Option<String>) -> Arc<Self> {
        let key_bytes: [u8; 32] = BASE64
            .decode(LICENSE_PUBLIC_KEY_B64)
            .expect("compiled-in license public key is valid base64")
            .try_into()
            .expect("compiled-in license public key is 32 bytes");
        let public_key = VerifyingKey::from_bytes(&key_bytes)
            .expect("compiled-in license public key is a valid Ed25519 point");

        let manager = Self {
            public_key,
            key: RwLock::new(None),
            current: RwLock::new(License::community()),
        };
        manager.install(license_key);
        Arc::new(manager)
    }

    fn install(&self, license_key: Option<String>) {
        match &license_key {
            Some(key) => match verify_license_key(key, &self.public_key, Utc::now()) {
                Ok(license) => {
                    tracing::info!(tier = %license.tier, "license verified");
                    *self.current.write().expect("license lock poisoned") = license;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "license invalid, falling back to community tier");
                    *self.current.write().expect("license lock poisoned") = License::community();
                }
            },
            None => {
                tracing::info!("no license configured, running community tier");
            }
        }
        *self.key.write().expect("license key lock poisoned") = license_key;
    }

    pub fn tier(&self) -> Tier {
        self.current.read().expect("license lock poisoned").tier
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.current
            .read()
            .expect("license lock poisoned")
            .has_feature(feature)
    }

    /// `true` when `current` usage is within the plan limit (`-1` = unlimited).
    pub fn check_limit(&self, kind: LimitKind, current: i64) -> bool {
        let limit = self.current.read().expect("license lock poisoned").limit(kind);
        limit < 0 || current < limit
    }

    /// Re-verify the stored key; on failure revert to Community.
    pub fn reverify(&self) {
        let key = self.key.read().expect("license key lock poisoned").clone();
        let Some(key) = key else {
            return;
        };
        match verify_license_key(&key, &self.public_key, Utc::now()) {
            Ok(license) => {
                *self.current.write().expect("license lock poisoned") = license;
            }
            Err(e) => {
                tracing::warn!(error = %e, "license re-verification failed, reverting to community tier");
                *self.current.write().expect("license lock poisoned") = License::community();
            }
        }
    }

    /// Periodic re-verification loop; spawn once per process.
    pub async fn run_reverify_loop(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it since `new` just verified.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.reverify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Signed with the RFC 8032 test-vector keypair; the matching public key
    // is below. Body: business tier, 2025-01-01 → 2099-01-01, explicit
    // analytics_export, links_per_month unlimited.
    const TEST_PUBLIC_KEY_B64: &str = "11qYAYKxCrfVS/7TyWQHOg7hcvPapiMlrwIaaPcHURo=";
    const TEST_KEY: &str = "eyJsaWNlbnNlIjoiZXlKMGFXVnlJam9pWW5WemFXNWxjM01pTENKcGMzTjFaV1JmWVhRaU9pSXlNREkxTFRBeExUQXhWREF3T2pBd09qQXdXaUlzSW1WNGNHbHlaWE5mWVhRaU9pSXlNRGs1TFRBeExUQXhWREF3T2pBd09qQXdXaUlzSW1abFlYUjFjbVZ6SWpwYkltRnVZV3g1ZEdsamMxOWxlSEJ2Y25RaVhTd2liR2x0YVhSeklqcDdJblZ6WlhKeklqb3lOU3dpWkc5dFlXbHVjeUk2TVRBc0lteHBibXR6WDNCbGNsOXRiMjUwYUNJNkxURXNJbU5zYVdOcmMxOXdaWEpmYlc5dWRHZ2lPakV3TURBd01EQXNJbmR2Y210emNHRmpaWE1pT2pVc0ltRndhVjl5WlhGMVpYTjBjMTl3WlhKZmJXbHVkWFJsSWpvMk1EQjlmUT09Iiwic2lnbmF0dXJlIjoieU8wNDVtT0twL1hPVm1pYlIvWFBIejVnaURseVgyTUtyemNMOElmVTFPU0xJZC80VWpYTUR4Nld6ampQSElmZUc2Yy9FVXFZTWNLUFhJMHFxS00wQlE9PSIsInZlcnNpb24iOjF9";
    const TEST_KEY_PERPETUAL: &str = "eyJsaWNlbnNlIjoiZXlKMGFXVnlJam9pWW5WemFXNWxjM01pTENKcGMzTjFaV1JmWVhRaU9pSXlNREkxTFRBeExUQXhWREF3T2pBd09qQXdXaUlzSW1WNGNHbHlaWE5mWVhRaU9pSWlMQ0ptWldGMGRYSmxjeUk2V3lKaGJtRnNlWFJwWTNOZlpYaHdiM0owSWwwc0lteHBiV2wwY3lJNmV5SjFjMlZ5Y3lJNk1qVXNJbVJ2YldGcGJuTWlPakV3TENKc2FXNXJjMTl3WlhKZmJXOXVkR2dpT2kweExDSmpiR2xqYTNOZmNHVnlYMjF2Ym5Sb0lqb3hNREF3TURBd0xDSjNiM0pyYzNCaFkyVnpJam8xTENKaGNHbGZjbVZ4ZFdWemRITmZjR1Z5WDIxcGJuVjBaU0k2TmpBd2ZYMD0iLCJzaWduYXR1cmUiOiIwcVg0cCtvYjg5ZyttdDNCemZYYWlzUWlQbU9oeENZOW85UXZLME9TMk05bHRhWDN4MkdSWDFGME0wT1E1dEhtc29jaXBOaXlwUnlzcUVyUHBjZ3lCUT09IiwidmVyc2lvbiI6MX0=";
    const TEST_KEY_EXPIRED: &str = "eyJsaWNlbnNlIjoiZXlKMGFXVnlJam9pWW5WemFXNWxjM01pTENKcGMzTjFaV1JmWVhRaU9pSXlNREkxTFRBeExUQXhWREF3T2pBd09qQXdXaUlzSW1WNGNHbHlaWE5mWVhRaU9pSXlNREkxTFRBeUxUQXhWREF3T2pBd09qQXdXaUlzSW1abFlYUjFjbVZ6SWpwYkltRnVZV3g1ZEdsamMxOWxlSEJ2Y25RaVhTd2liR2x0YVhSeklqcDdJblZ6WlhKeklqb3lOU3dpWkc5dFlXbHVjeUk2TVRBc0lteHBibXR6WDNCbGNsOXRiMjUwYUNJNkxURXNJbU5zYVdOcmMxOXdaWEpmYlc5dWRHZ2lPakV3TURBd01EQXNJbmR2Y210emNHRmpaWE1pT2pVc0ltRndhVjl5WlhGMVpYTjBjMTl3WlhKZmJXbHVkWFJsSWpvMk1EQjlmUT09Iiwic2lnbmF0dXJlIjoiMEF1eUtmbERCdGZLZkVrejEwSDgxMVZsYUtGcmRwdk9YWUxBd3I2K2ZRYkJBS0VoUzc3RXh1U2RKTDBRbGJTV3VMbVdhU0tHWHNsTVJxV0xHSlp3Q1E9PSIsInZlcnNpb24iOjF9";

    fn test_public_key() -> VerifyingKey {
        let bytes: [u8; 32] = BASE64
            .decode(TEST_PUBLIC_KEY_B64)
            .unwrap()
            .try_into()
            .unwrap();
        VerifyingKey::from_bytes(&bytes).unwrap()
    }

    fn mid_2025() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn valid_key_verifies_and_parses() {
        let license = verify_license_key(TEST_KEY, &test_public_key(), mid_2025()).unwrap();
        assert_eq!(license.tier, Tier::Business);
        assert_eq!(license.limits.links_per_month, -1);
        assert!(license.has_feature(Feature::AnalyticsExport));
    }

    #[test]
    fn empty_expires_at_means_perpetual() {
        let license =
            verify_license_key(TEST_KEY_PERPETUAL, &test_public_key(), mid_2025()).unwrap();
        assert!(license.expires_at.is_none());
        // Perpetual licenses pass far in the future too.
        let far = Utc.with_ymd_and_hms(2150, 1, 1, 0, 0, 0).unwrap();
        assert!(verify_license_key(TEST_KEY_PERPETUAL, &test_public_key(), far).is_ok());
    }

    #[test]
    fn expired_key_is_rejected() {
        let err = verify_license_key(TEST_KEY_EXPIRED, &test_public_key(), mid_2025()).unwrap_err();
        assert!(matches!(err, LicenseError::Expired));
    }

    #[test]
    fn not_yet_valid_key_is_rejected() {
        let before = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = verify_license_key(TEST_KEY, &test_public_key(), before).unwrap_err();
        assert!(matches!(err, LicenseError::NotYetValid));
    }

    #[test]
    fn tampered_key_fails_signature_check() {
        // Perturb one character inside the envelope's license field.
        let envelope_bytes = BASE64.decode(TEST_KEY).unwrap();
        let mut text = String::from_utf8(envelope_bytes).unwrap();
        let idx = text.find("eyJ0aWV").unwrap();
        text.replace_range(idx..idx + 1, "f");
        let tampered = BASE64.encode(text.as_bytes());
        let err = verify_license_key(&tampered, &test_public_key(), mid_2025()).unwrap_err();
        assert!(matches!(
            err,
            LicenseError::BadSignature | LicenseError::Malformed(_)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = verify_license_key("not base64!!", &test_public_key(), mid_2025()).unwrap_err();
        assert!(matches!(err, LicenseError::Malformed(_)));
    }

    #[test]
    fn tier_ordering_grants_features() {
        assert!(Tier::Free < Tier::Pro);
        assert!(Tier::Pro < Tier::Business);
        assert!(Tier::Business < Tier::Enterprise);

        let mut license = License::community();
        assert!(license.has_feature(Feature::Webhooks));
        assert!(!license.has_feature(Feature::AnalyticsExport));
        license.tier = Tier::Business;
        assert!(license.has_feature(Feature::AnalyticsExport));
        assert!(!license.has_feature(Feature::Sso));
    }

    #[test]
    fn explicit_feature_beats_tier() {
        let mut license = License::community();
        license.features.push("sso".to_string());
        assert!(license.has_feature(Feature::Sso));
    }

    #[test]
    fn limit_check_blocks_at_the_cap() {
        let manager = LicenseManager::new(None);
        // Community caps workspaces at 1.
        assert!(manager.check_limit(LimitKind::Workspaces, 0));
        assert!(!manager.check_limit(LimitKind::Workspaces, 1));
    }

    #[test]
    fn invalid_key_falls_back_to_community() {
        let manager = LicenseManager::new(Some("garbage".into()));
        assert_eq!(manager.tier(), Tier::Free);
    }
}
