//! API key pool with per-key rate-limit bookkeeping.
//!
//! Every configured key carries three budgets: requests per minute, requests
//! per calendar day and tokens per minute. `acquire` hands out the first key
//! (in configuration order) that can absorb one more request of the given
//! size and records the usage against it.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

/// Upper bound on a single backoff sleep in `wait_for_key`.
const MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Default total time `wait_for_key` keeps polling.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(65);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub requests_per_minute: usize,
    pub requests_per_day: u32,
    pub tokens_per_minute: u64,
}

impl Default for RateLimits {
    /// Gemini free tier.
    fn default() -> Self {
        Self {
            requests_per_minute: 15,
            requests_per_day: 1500,
            tokens_per_minute: 1_000_000,
        }
    }
}

#[derive(Debug)]
struct KeyUsage {
    key: String,
    requests: VecDeque<DateTime<Utc>>,
    tokens: VecDeque<(DateTime<Utc>, u64)>,
    requests_today: u32,
    last_reset: NaiveDate,
    exhausted: bool,
}

impl KeyUsage {
    fn new(key: String, today: NaiveDate) -> Self {
        Self {
            key,
            requests: VecDeque::new(),
            tokens: VecDeque::new(),
            requests_today: 0,
            last_reset: today,
            exhausted: false,
        }
    }

    /// Drops entries older than one minute and rolls the daily counter over.
    fn prune(&mut self, now: DateTime<Utc>) {
        let window = chrono::Duration::minutes(1);
        while self.requests.front().is_some_and(|t| now - *t >= window) {
            self.requests.pop_front();
        }
        while self.tokens.front().is_some_and(|(t, _)| now - *t >= window) {
            self.tokens.pop_front();
        }

        let today = now.date_naive();
        if self.last_reset != today {
            self.requests_today = 0;
            self.last_reset = today;
            self.exhausted = false;
            info!("Reset daily counter for key {}", mask_key(&self.key));
        }
    }

    fn tokens_in_window(&self) -> u64 {
        self.tokens.iter().map(|(_, n)| n).sum()
    }
}

/// Thread-safe pool of API keys. Share it behind an `Arc`.
#[derive(Debug)]
pub struct KeyPool {
    limits: RateLimits,
    usage: Mutex<Vec<KeyUsage>>,
}

impl KeyPool {
    pub fn new(keys: Vec<String>, limits: RateLimits) -> Self {
        let today = Utc::now().date_naive();
        info!("Initialized key pool with {} keys", keys.len());
        Self {
            limits,
            usage: Mutex::new(keys.into_iter().map(|k| KeyUsage::new(k, today)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a key with capacity for `estimated_tokens`, recording the request.
    pub fn acquire(&self, estimated_tokens: u64) -> Option<String> {
        self.acquire_at(Utc::now(), estimated_tokens)
    }

    fn acquire_at(&self, now: DateTime<Utc>, estimated_tokens: u64) -> Option<String> {
        let limits = self.limits;
        let mut usage = self.lock();

        for entry in usage.iter_mut() {
            entry.prune(now);

            if entry.exhausted {
                continue;
            }

            let current_rpm = entry.requests.len();
            if current_rpm >= limits.requests_per_minute {
                debug!(
                    "Key {} at RPM limit ({current_rpm}/{})",
                    mask_key(&entry.key),
                    limits.requests_per_minute
                );
                continue;
            }

            if entry.requests_today >= limits.requests_per_day {
                entry.exhausted = true;
                warn!(
                    "Key {} exhausted for today ({}/{})",
                    mask_key(&entry.key),
                    entry.requests_today,
                    limits.requests_per_day
                );
                continue;
            }

            if entry.tokens_in_window() + estimated_tokens > limits.tokens_per_minute {
                debug!("Key {} would exceed TPM limit", mask_key(&entry.key));
                continue;
            }

            entry.requests.push_back(now);
            entry.tokens.push_back((now, estimated_tokens));
            entry.requests_today += 1;

            debug!(
                "Using key {} (RPM: {}/{}, RPD: {}/{})",
                mask_key(&entry.key),
                current_rpm + 1,
                limits.requests_per_minute,
                entry.requests_today,
                limits.requests_per_day
            );
            return Some(entry.key.clone());
        }

        None
    }

    /// Polls `acquire` with exponential backoff (1s, 2s, 4s, ... capped at 10s)
    /// until a key frees up or `max_wait` has elapsed.
    pub async fn wait_for_key(&self, estimated_tokens: u64, max_wait: Duration) -> Option<String> {
        let start = tokio::time::Instant::now();
        let mut backoff = Duration::from_secs(1);

        while start.elapsed() < max_wait {
            if let Some(key) = self.acquire(estimated_tokens) {
                return Some(key);
            }
            info!("All keys at capacity. Waiting {}s...", backoff.as_secs());
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }

        error!("No API keys available after waiting {}s", max_wait.as_secs());
        None
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<KeyUsage>> {
        // Bookkeeping stays consistent even if a holder panicked.
        self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Rough token estimate: 1.3 tokens per whitespace-separated word.
pub fn estimate_tokens(text: &str) -> u64 {
    let words = text.split_whitespace().count() as f64;
    (words * 1.3) as u64
}

/// Renders a key for logs without revealing it.
pub fn mask_key(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap()
    }

    fn pool(keys: &[&str], limits: RateLimits) -> KeyPool {
        let pool = KeyPool::new(keys.iter().map(|k| k.to_string()).collect(), limits);
        // Align the daily bookkeeping with the fixed test clock.
        for entry in pool.lock().iter_mut() {
            entry.last_reset = at(0, 0, 0).date_naive();
        }
        pool
    }

    fn limits(rpm: usize, rpd: u32, tpm: u64) -> RateLimits {
        RateLimits {
            requests_per_minute: rpm,
            requests_per_day: rpd,
            tokens_per_minute: tpm,
        }
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13);
    }

    #[test]
    fn test_mask_key_keeps_last_four() {
        assert_eq!(mask_key("AIzaSyABCDEF1234"), "...1234");
        assert_eq!(mask_key("ab"), "...ab");
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let pool = pool(&[], RateLimits::default());
        assert!(pool.is_empty());
        assert_eq!(pool.acquire_at(at(9, 0, 0), 10), None);
    }

    #[test]
    fn test_rotates_to_next_key_at_rpm_limit() {
        let pool = pool(&["first", "second"], limits(2, 100, 1_000));
        let now = at(9, 0, 0);
        assert_eq!(pool.acquire_at(now, 1).as_deref(), Some("first"));
        assert_eq!(pool.acquire_at(now, 1).as_deref(), Some("first"));
        assert_eq!(pool.acquire_at(now, 1).as_deref(), Some("second"));
        assert_eq!(pool.acquire_at(now, 1).as_deref(), Some("second"));
        assert_eq!(pool.acquire_at(now, 1), None);
    }

    #[test]
    fn test_minute_window_frees_capacity() {
        let pool = pool(&["only"], limits(1, 100, 1_000));
        assert!(pool.acquire_at(at(9, 0, 0), 1).is_some());
        assert!(pool.acquire_at(at(9, 0, 59), 1).is_none());
        assert!(pool.acquire_at(at(9, 1, 0), 1).is_some());
    }

    #[test]
    fn test_token_budget_skips_key() {
        let pool = pool(&["small", "large"], limits(10, 100, 100));
        let now = at(9, 0, 0);
        assert_eq!(pool.acquire_at(now, 80).as_deref(), Some("small"));
        // 80 + 30 > 100 on the first key, second key still empty
        assert_eq!(pool.acquire_at(now, 30).as_deref(), Some("large"));
        // A request larger than the whole budget never fits
        assert_eq!(pool.acquire_at(now, 101), None);
    }

    #[test]
    fn test_daily_limit_exhausts_until_next_day() {
        let pool = pool(&["daily"], limits(10, 2, 1_000));
        assert!(pool.acquire_at(at(9, 0, 0), 1).is_some());
        assert!(pool.acquire_at(at(10, 0, 0), 1).is_some());
        assert!(pool.acquire_at(at(11, 0, 0), 1).is_none());
        assert!(pool.lock()[0].exhausted);

        let next_day = at(11, 0, 0) + chrono::Duration::days(1);
        assert_eq!(pool.acquire_at(next_day, 1).as_deref(), Some("daily"));
        let usage = pool.lock();
        assert!(!usage[0].exhausted);
        assert_eq!(usage[0].requests_today, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_key_gives_up_after_max_wait() {
        let pool = KeyPool::new(vec!["busy".to_string()], limits(0, 100, 1_000));
        let started = tokio::time::Instant::now();
        let key = pool.wait_for_key(1, Duration::from_secs(5)).await;
        assert!(key.is_none());
        // 1 + 2 + 4 seconds of backoff before the deadline check fails
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_key_returns_immediately_when_free() {
        let pool = KeyPool::new(vec!["free".to_string()], RateLimits::default());
        let key = pool.wait_for_key(1, DEFAULT_MAX_WAIT).await;
        assert_eq!(key.as_deref(), Some("free"));
    }
}
