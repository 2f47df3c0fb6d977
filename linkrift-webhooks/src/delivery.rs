//! One outbound delivery attempt: signed POST, bounded response read,
//! outcome classification, and the backoff schedule between attempts.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use uuid::Uuid;

use crate::models::Webhook;
use crate::signer;

/// Outbound request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Response bodies are recorded up to this many bytes.
pub const RESPONSE_BODY_LIMIT: usize = 4096;

/// Exponential backoff between attempts: 30 s, 60 s, 120 s, 240 s, capped.
/// Reattempts never fire faster than once per 30 s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(3600),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, given how many attempts have already
    /// failed (1-indexed).
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let delay = self.base_delay * 2u32.saturating_pow(exponent);
        delay.min(self.max_delay)
    }
}

/// What one attempt produced, however it ended.
#[derive(Debug)]
pub struct AttemptOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub body: String,
}

/// POST the payload to the subscription endpoint with the signature
/// headers. Network errors classify as failures with the error text as
/// the recorded body.
pub async fn attempt(
    client: &Client,
    webhook: &Webhook,
    delivery_id: Uuid,
    event: &str,
    payload: &str,
) -> AttemptOutcome {
    let timestamp = Utc::now().timestamp().max(0) as u64;
    let signature = signer::signature_header(&webhook.secret, timestamp, payload.as_bytes());

    let result = client
        .post(&webhook.url)
        .header("Content-Type", "application/json")
        .header("X-Linkrift-Event", event)
        .header("X-Linkrift-Delivery", delivery_id.to_string())
        .header("X-Linkrift-Timestamp", timestamp.to_string())
        .header("X-Linkrift-Signature", &signature)
        .header("User-Agent", "Linkrift-Webhooks/1.0")
        .body(payload.to_owned())
        .timeout(REQUEST_TIMEOUT)
        .send()
        .await;

    match result {
        Ok(response) => {
            let status = response.status().as_u16();
            let body = read_bounded_body(response).await;
            AttemptOutcome {
                success: (200..300).contains(&status),
                status: Some(status),
                body,
            }
        }
        Err(e) => {
            let mut body = e.to_string();
            body.truncate(RESPONSE_BODY_LIMIT);
            AttemptOutcome {
                success: false,
                status: None,
                body,
            }
        }
    }
}

/// Read at most `RESPONSE_BODY_LIMIT` bytes of the response body.
async fn read_bounded_body(mut response: reqwest::Response) -> String {
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    while buf.len() < RESPONSE_BODY_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) => break,
            Err(_) => break,
        }
    }
    buf.truncate(RESPONSE_BODY_LIMIT);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_thirty_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(30));
        assert_eq!(policy.delay_after(2), Duration::from_secs(60));
        assert_eq!(policy.delay_after(3), Duration::from_secs(120));
        assert_eq!(policy.delay_after(4), Duration::from_secs(240));
        // Capped at max_delay.
        assert_eq!(policy.delay_after(12), Duration::from_secs(3600));
    }

    #[test]
    fn backoff_never_undercuts_the_sweep_floor() {
        let policy = RetryPolicy::default();
        for failed in 1..=10 {
            assert!(policy.delay_after(failed) >= Duration::from_secs(30));
        }
    }
}
