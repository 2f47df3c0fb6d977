//! User-Agent breakdown for click records.
//!
//! A token scan over the common browser and OS families. Ordering matters:
//! Edge and Opera ship a Chrome token, iOS ships a "like Mac OS X" marker,
//! Android ships a Linux marker. Anything unrecognized yields empty strings
//! and a desktop device class.

use linkrift_shared::types::DeviceType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentInfo {
    pub browser_name: String,
    pub browser_version: String,
    pub os_name: String,
    pub os_version: String,
    pub device_type: DeviceType,
}

pub fn parse(user_agent: &str) -> UserAgentInfo {
    let ua_lower = user_agent.to_ascii_lowercase();

    let (browser_name, browser_version) = parse_browser(user_agent, &ua_lower);
    let (os_name, os_version) = parse_os(user_agent, &ua_lower);
    let device_type = parse_device(&ua_lower);

    UserAgentInfo {
        browser_name,
        browser_version,
        os_name,
        os_version,
        device_type,
    }
}

fn parse_browser(ua: &str, ua_lower: &str) -> (String, String) {
    // First match wins; Edge and Opera must precede Chrome.
    if ua_lower.contains("edg/") {
        return ("Edge".into(), version_after(ua, ua_lower, "edg/"));
    }
    if ua_lower.contains("opr/") {
        return ("Opera".into(), version_after(ua, ua_lower, "opr/"));
    }
    if ua_lower.contains("chrome/") {
        return ("Chrome".into(), version_after(ua, ua_lower, "chrome/"));
    }
    if ua_lower.contains("firefox/") {
        return ("Firefox".into(), version_after(ua, ua_lower, "firefox/"));
    }
    if ua_lower.contains("version/") && ua_lower.contains("safari/") {
        return ("Safari".into(), version_after(ua, ua_lower, "version/"));
    }
    (String::new(), String::new())
}

fn parse_os(ua: &str, ua_lower: &str) -> (String, String) {
    if ua_lower.contains("windows nt ") {
        return ("Windows".into(), version_after(ua, ua_lower, "windows nt "));
    }
    // iOS before macOS: every iPhone/iPad UA carries "like Mac OS X".
    if ua_lower.contains("iphone os ") {
        return ("iOS".into(), version_after(ua, ua_lower, "iphone os "));
    }
    if ua_lower.contains("cpu os ") {
        return ("iOS".into(), version_after(ua, ua_lower, "cpu os "));
    }
    if ua_lower.contains("mac os x ") {
        let version = version_after(ua, ua_lower, "mac os x ");
        if !version.is_empty() {
            return ("macOS".into(), version);
        }
    }
    // Android before Linux: Android UAs carry a Linux token too.
    if ua_lower.contains("android ") {
        return ("Android".into(), version_after(ua, ua_lower, "android "));
    }
    if ua_lower.contains("android") {
        return ("Android".into(), String::new());
    }
    if ua_lower.contains("linux") {
        return ("Linux".into(), String::new());
    }
    (String::new(), String::new())
}

fn parse_device(ua_lower: &str) -> DeviceType {
    if ua_lower.contains("ipad") || ua_lower.contains("tablet") {
        return DeviceType::Tablet;
    }
    if ua_lower.contains("mobile") || ua_lower.contains("android") || ua_lower.contains("iphone") {
        return DeviceType::Mobile;
    }
    DeviceType::Desktop
}

/// The version token following `marker` (matched case-insensitively):
/// digits, dots and underscores, with underscores normalised to dots.
fn version_after(ua: &str, ua_lower: &str, marker: &str) -> String {
    let Some(idx) = ua_lower.find(marker) else {
        return String::new();
    };
    let rest = &ua[idx + marker.len()..];
    let token: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .collect();
    token.replace('_', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const OPERA_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 OPR/105.0.0.0";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const SAFARI_IPAD: &str = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

    #[test]
    fn edge_wins_over_its_chrome_token() {
        let info = parse(EDGE_WIN);
        assert_eq!(info.browser_name, "Edge");
        assert_eq!(info.browser_version, "120.0.2210.91");
    }

    #[test]
    fn opera_wins_over_its_chrome_token() {
        let info = parse(OPERA_MAC);
        assert_eq!(info.browser_name, "Opera");
        assert_eq!(info.browser_version, "105.0.0.0");
    }

    #[test]
    fn chrome_on_windows() {
        let info = parse(CHROME_WIN);
        assert_eq!(info.browser_name, "Chrome");
        assert_eq!(info.browser_version, "120.0.0.0");
        assert_eq!(info.os_name, "Windows");
        assert_eq!(info.os_version, "10.0");
        assert_eq!(info.device_type, DeviceType::Desktop);
    }

    #[test]
    fn firefox_on_linux() {
        let info = parse(FIREFOX_LINUX);
        assert_eq!(info.browser_name, "Firefox");
        assert_eq!(info.browser_version, "120.0");
        assert_eq!(info.os_name, "Linux");
        assert_eq!(info.os_version, "");
    }

    #[test]
    fn safari_on_macos_normalises_underscores() {
        let info = parse(SAFARI_MAC);
        assert_eq!(info.browser_name, "Safari");
        assert_eq!(info.browser_version, "17.1");
        assert_eq!(info.os_name, "macOS");
        assert_eq!(info.os_version, "10.15.7");
        assert_eq!(info.device_type, DeviceType::Desktop);
    }

    #[test]
    fn iphone_is_ios_mobile_not_macos() {
        let info = parse(SAFARI_IPHONE);
        assert_eq!(info.browser_name, "Safari");
        assert_eq!(info.os_name, "iOS");
        assert_eq!(info.os_version, "17.1");
        assert_eq!(info.device_type, DeviceType::Mobile);
    }

    #[test]
    fn ipad_is_ios_tablet() {
        let info = parse(SAFARI_IPAD);
        assert_eq!(info.os_name, "iOS");
        assert_eq!(info.os_version, "16.6");
        assert_eq!(info.device_type, DeviceType::Tablet);
    }

    #[test]
    fn android_wins_over_its_linux_token() {
        let info = parse(CHROME_ANDROID);
        assert_eq!(info.browser_name, "Chrome");
        assert_eq!(info.os_name, "Android");
        assert_eq!(info.os_version, "14");
        assert_eq!(info.device_type, DeviceType::Mobile);
    }

    #[test]
    fn unknown_ua_yields_empty_fields_and_desktop() {
        let info = parse("SomethingEntirelyNovel/1.0");
        assert_eq!(info.browser_name, "");
        assert_eq!(info.browser_version, "");
        assert_eq!(info.os_name, "");
        assert_eq!(info.os_version, "");
        assert_eq!(info.device_type, DeviceType::Desktop);
    }

    #[test]
    fn empty_ua_is_harmless() {
        let info = parse("");
        assert_eq!(info.browser_name, "");
        assert_eq!(info.device_type, DeviceType::Desktop);
    }
}
