//! Rate Limiter (C3, §4.3): a per-client sliding-window counter keyed by
//! (client identity, endpoint class). Implemented as a sharded concurrent map
//! rather than a single mutex so unrelated clients never contend.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use turnstile_core::config::{RateLimitClass, RateLimitConfig};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub client: String,
    pub class: RateLimitClass,
}

impl RateLimitKey {
    pub fn new(client: impl Into<String>, class: RateLimitClass) -> Self {
        Self { client: client.into(), class }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<RateLimitKey, Mutex<VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, buckets: DashMap::new() }
    }

    /// Records one request at `now` and reports whether it is allowed under
    /// the class's sliding window. Stale timestamps are trimmed on every
    /// call so a bucket never grows past its window's request budget.
    pub fn check(&self, key: &RateLimitKey, now: DateTime<Utc>) -> bool {
        let rule = self.config.rule(key.class);
        let window = chrono::Duration::seconds(rule.window_seconds as i64);
        let entry = self.buckets.entry(key.clone()).or_insert_with(|| Mutex::new(VecDeque::new()));
        let mut bucket = entry.lock().unwrap();

        while let Some(&oldest) = bucket.front() {
            if now - oldest > window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() as u32 >= rule.max_requests {
            return false;
        }
        bucket.push_back(now);
        true
    }

    /// Background sweeper housekeeping: drop buckets with no timestamps
    /// inside any window, so long-idle clients don't pin memory (§4.8).
    pub fn evict_idle(&self, now: DateTime<Utc>) {
        let max_window = self
            .config
            .login
            .window_seconds
            .max(self.config.register.window_seconds)
            .max(self.config.qr.window_seconds)
            .max(self.config.invitation_verify.window_seconds)
            .max(self.config.interest_submit.window_seconds);
        let horizon = chrono::Duration::seconds(max_window as i64);

        self.buckets.retain(|_, bucket| {
            let bucket = bucket.lock().unwrap();
            bucket.back().is_some_and(|&last| now - last <= horizon)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let key = RateLimitKey::new("client-a", RateLimitClass::Login);
        let now = Utc::now();
        for _ in 0..5 {
            assert!(limiter.check(&key, now));
        }
        assert!(!limiter.check(&key, now));
    }

    #[test]
    fn window_slides_and_recovers() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let key = RateLimitKey::new("client-b", RateLimitClass::Login);
        let now = Utc::now();
        for _ in 0..5 {
            assert!(limiter.check(&key, now));
        }
        let later = now + chrono::Duration::seconds(61);
        assert!(limiter.check(&key, later));
    }

    #[test]
    fn distinct_clients_do_not_share_a_bucket() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        let now = Utc::now();
        let a = RateLimitKey::new("client-a", RateLimitClass::Qr);
        let b = RateLimitKey::new("client-b", RateLimitClass::Qr);
        for _ in 0..20 {
            assert!(limiter.check(&a, now));
        }
        assert!(!limiter.check(&a, now));
        assert!(limiter.check(&b, now));
    }
}
