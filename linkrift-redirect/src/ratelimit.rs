//! Per-IP throttle for password-gate submissions.
//!
//! Fixed one-minute windows keyed in Redis; the window key carries its own
//! expiry. Redis trouble fails open -- a broken limiter must not lock
//! visitors out of links they hold the password for.

use chrono::Utc;

use linkrift_shared::clients::redis::RedisClient;

pub(crate) fn window_key(ip: &str) -> String {
    format!("rl:verify:{}:{}", ip, Utc::now().format("%Y%m%d%H%M"))
}

/// `true` when the caller may attempt another password verification.
pub async fn allow_verify_attempt(redis: &RedisClient, ip: &str, limit_per_minute: i64) -> bool {
    let key = window_key(ip);

    let count = match redis.incr(&key).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(error = %e, "verify rate limiter unavailable, failing open");
            return true;
        }
    };
    if count == 1 {
        if let Err(e) = redis.expire(&key, 60).await {
            tracing::warn!(error = %e, "verify rate limiter expire failed");
        }
    }

    count <= limit_per_minute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keys_are_per_ip_and_minute() {
        let key = window_key("203.0.113.9");
        assert!(key.starts_with("rl:verify:203.0.113.9:"));
        // Minute-resolution suffix: YYYYMMDDHHMM.
        assert_eq!(key.rsplit(':').next().unwrap().len(), 12);
    }
}
