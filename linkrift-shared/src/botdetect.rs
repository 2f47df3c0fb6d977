//! User-Agent bot classification shared by the redirect server (skip
//! tracking) and the click processor (re-check events that survived a
//! restart).
//!
//! Classification is a case-insensitive substring scan over a compiled
//! signature list; an empty User-Agent is always a bot.

/// Signatures grouped by family: search-engine crawlers, social preview
/// fetchers, SEO/monitoring tools, and headless or scripted clients.
const BOT_SIGNATURES: &[&str] = &[
    // Search engines
    "googlebot",
    "bingbot",
    "duckduckbot",
    "yandexbot",
    "baiduspider",
    "slurp",
    "applebot",
    // Social preview fetchers
    "facebookexternalhit",
    "facebot",
    "twitterbot",
    "linkedinbot",
    "whatsapp",
    "telegrambot",
    "discordbot",
    "slackbot",
    "pinterestbot",
    "redditbot",
    "skypeuripreview",
    // SEO / monitoring
    "ahrefsbot",
    "semrushbot",
    "mj12bot",
    "dotbot",
    "rogerbot",
    "screaming frog",
    "uptimerobot",
    "pingdom",
    "statuscake",
    "site24x7",
    "gtmetrix",
    // Headless / scripted clients
    "headlesschrome",
    "phantomjs",
    "puppeteer",
    "playwright",
    "selenium",
    "python-requests",
    "python-urllib",
    "aiohttp",
    "scrapy",
    "curl/",
    "wget/",
    "go-http-client",
    "okhttp",
    "libwww-perl",
    "java/",
    "httpclient",
    "axios/",
    // Generic markers last: broadest match, checked after the specific ones
    "bot",
    "spider",
    "crawler",
];

/// Classify a User-Agent string. Empty or whitespace-only UAs are bots.
pub fn is_bot(user_agent: &str) -> bool {
    let trimmed = user_agent.trim();
    if trimmed.is_empty() {
        return true;
    }
    let ua = trimmed.to_ascii_lowercase();
    BOT_SIGNATURES.iter().any(|sig| ua.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ua_is_a_bot() {
        assert!(is_bot(""));
        assert!(is_bot("   "));
    }

    #[test]
    fn crawlers_and_preview_fetchers_match() {
        assert!(is_bot("Googlebot/2.1 (+http://www.google.com/bot.html)"));
        assert!(is_bot("Mozilla/5.0 (compatible; bingbot/2.0)"));
        assert!(is_bot("facebookexternalhit/1.1"));
        assert!(is_bot("Twitterbot/1.0"));
        assert!(is_bot("Slackbot-LinkExpanding 1.0"));
    }

    #[test]
    fn scripted_clients_match() {
        assert!(is_bot("curl/8.4.0"));
        assert!(is_bot("python-requests/2.31.0"));
        assert!(is_bot("Go-http-client/2.0"));
        assert!(is_bot(
            "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 HeadlessChrome/120.0 Safari/537.36"
        ));
    }

    #[test]
    fn real_browsers_pass() {
        assert!(!is_bot(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ));
        assert!(!is_bot(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1"
        ));
        assert!(!is_bot(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7; rv:120.0) Gecko/20100101 Firefox/120.0"
        ));
    }
}
