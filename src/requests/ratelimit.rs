//! Path based rate limiting.
//!
//! Every request is matched against a static table of [PathRule]s taken from the API
//! documentation. Each matched rule owns a bucket that allows `max_requests` requests per
//! `window`; when a bucket is exhausted the caller sleeps until the window ends. Buckets have
//! their own locks, so requests to unrelated routes never wait on each other.
//!
//! The server also reports its own view of the budget through `X-RateLimit-*` headers. Those
//! values always override the local bookkeeping, see [RateLimiter::reconcile].

use std::sync::{Arc, LazyLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;
use reqwest::header::HeaderMap;
use reqwest::Method;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RETRY_AFTER_HEADER: &str = "x-ratelimit-retry-after";

/// A rate limit policy for all paths matching `pattern`
#[derive(Debug, Clone)]
pub struct PathRule {
    pub template: String,
    pub pattern: Regex,
    /// `None` matches every method
    pub method: Option<Method>,
    pub max_requests: u32,
    pub window: Duration,
}

impl PathRule {
    pub fn new(
        template: &str,
        pattern: &str,
        method: Option<Method>,
        max_requests: u32,
        window: Duration,
    ) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            template: template.to_owned(),
            pattern: Regex::new(&format!("^(?:{pattern})$"))?,
            method,
            max_requests,
            window,
        })
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method.as_ref().map_or(true, |m| m == method) && self.pattern.is_match(path)
    }
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Window of buckets the server reports on but no rule describes
pub const FALLBACK_WINDOW: Duration = Duration::from_secs(MINUTE);

static ID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}|\d+)$")
        .expect("id segment regex is valid")
});

/// Drops the query and trailing slashes and replaces id segments with `{id}`, so
/// `/manga/<uuid>/feed?limit=10` becomes `/manga/{id}/feed`
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return "/".to_owned();
    }

    path.split('/')
        .map(|segment| {
            if ID_SEGMENT.is_match(segment) {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// The documented limits of the API
pub fn default_rules() -> std::result::Result<Vec<PathRule>, regex::Error> {
    let table: [(&str, &str, Option<Method>, u32, u64); 24] = [
        ("/account/create", r"/account/create", None, 1, HOUR),
        ("/account/activate/{code}", r"/account/activate/\S+", None, 30, HOUR),
        ("/account/activate/resend", r"/account/activate/resend", None, 5, HOUR),
        ("/account/recover", r"/account/recover", None, 5, HOUR),
        ("/account/recover/{code}", r"/account/recover/\S+", None, 5, HOUR),
        ("/auth/login", r"/auth/login", None, 30, 30 * MINUTE),
        ("/auth/refresh", r"/auth/refresh", None, 30, 30 * MINUTE),
        ("/chapter/{id}/read", r"/chapter/\S+/read", None, 300, 10 * MINUTE),
        ("/upload/begin", r"/upload/begin", None, 30, MINUTE),
        ("/upload/{id}", r"/upload/\S+", None, 30, MINUTE),
        ("/upload/{id}/commit", r"/upload/\S+/commit", None, 30, MINUTE),
        ("/chapter/{id}", r"/chapter/\S+", Some(Method::PUT), 10, MINUTE),
        ("/chapter/{id}", r"/chapter/\S+", Some(Method::DELETE), 10, MINUTE),
        ("/manga", r"/manga", Some(Method::POST), 10, HOUR),
        ("/manga/{id}", r"/manga/\S+", Some(Method::PUT), 10, MINUTE),
        ("/manga/{id}", r"/manga/\S+", Some(Method::DELETE), 10, 10 * MINUTE),
        ("/group", r"/group", Some(Method::POST), 10, HOUR),
        ("/group/{id}", r"/group/\S+", Some(Method::PUT), 10, MINUTE),
        ("/group/{id}", r"/group/\S+", Some(Method::DELETE), 10, 10 * MINUTE),
        ("/author", r"/author", Some(Method::POST), 10, HOUR),
        ("/author/{id}", r"/author/\S+", Some(Method::PUT), 10, MINUTE),
        ("/author/{id}", r"/author/\S+", Some(Method::DELETE), 10, 10 * MINUTE),
        ("/captcha/solve", r"/captcha/solve", Some(Method::POST), 10, 10 * MINUTE),
        (
            "/at-home/server/{id}",
            r"/at-home/server/\S+",
            Some(Method::GET),
            60,
            MINUTE,
        ),
    ];

    table
        .into_iter()
        .map(|(template, pattern, method, max, window)| {
            PathRule::new(template, pattern, method, max, Duration::from_secs(window))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BucketKey {
    Rule(usize),
    /// Learned from server headers for a path no static rule covers
    Path(String),
}

#[derive(Debug)]
struct Bucket {
    limit: u32,
    window: Duration,
    used: u32,
    /// `None` until the first request of a window
    resets_at: Option<Instant>,
}

impl Bucket {
    fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            used: 0,
            resets_at: None,
        }
    }

    fn roll_window(&mut self, now: Instant) {
        if self.resets_at.is_some_and(|resets_at| resets_at <= now) {
            self.used = 0;
            self.resets_at = None;
        }
    }
}

/// Budget reported by the server in the `X-RateLimit-*` headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerBudget {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub retry_after: Option<DateTime<Utc>>,
}

impl ServerBudget {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        };

        let remaining = header(REMAINING_HEADER)?.parse().ok()?;
        let limit = header(LIMIT_HEADER).and_then(|value| value.parse().ok());
        let retry_after = header(RETRY_AFTER_HEADER)
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Some(Self {
            limit,
            remaining,
            retry_after,
        })
    }
}

/// Converts a wall clock time into the monotonic clock used by the buckets
fn instant_at(time: &DateTime<Utc>) -> Instant {
    let target = UNIX_EPOCH + Duration::from_secs(time.timestamp().max(0) as u64);

    match target.duration_since(SystemTime::now()) {
        Ok(left) => Instant::now() + left,
        Err(_) => Instant::now(),
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    rules: Vec<PathRule>,
    buckets: DashMap<BucketKey, Arc<Mutex<Bucket>>>,
}

impl RateLimiter {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self {
            rules,
            buckets: DashMap::new(),
        }
    }

    pub fn with_default_rules() -> std::result::Result<Self, regex::Error> {
        Ok(Self::new(default_rules()?))
    }

    pub fn rules(&self) -> &[PathRule] {
        &self.rules
    }

    fn bucket(&self, key: BucketKey, limit: u32, window: Duration) -> Arc<Mutex<Bucket>> {
        // clone the Arc so the map shard is not locked while awaiting the bucket
        self.buckets
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(Bucket::new(limit, window))))
            .clone()
    }

    /// Keys of every bucket `path` is charged to, in rule order
    fn matching_keys(&self, method: &Method, path: &str) -> Vec<(BucketKey, u32, Duration)> {
        let mut keys: Vec<_> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(method, path))
            .map(|(i, rule)| (BucketKey::Rule(i), rule.max_requests, rule.window))
            .collect();

        if keys.is_empty() {
            let key = BucketKey::Path(path.to_owned());
            if self.buckets.contains_key(&key) {
                keys.push((key, u32::MAX, FALLBACK_WINDOW));
            }
        }

        keys
    }

    fn matching_buckets(&self, method: &Method, path: &str) -> Vec<Arc<Mutex<Bucket>>> {
        self.matching_keys(method, path)
            .into_iter()
            .map(|(key, limit, window)| self.bucket(key, limit, window))
            .collect()
    }

    /// Waits until every bucket matching `path` has budget left, then spends one request from
    /// each of them
    #[tracing::instrument(skip(self))]
    pub async fn acquire(&self, method: &Method, path: &str) {
        let path = normalize_path(path);
        let buckets = self.matching_buckets(method, &path);
        if buckets.is_empty() {
            return;
        }

        loop {
            // always locked in rule order, concurrent callers can not deadlock
            let mut guards = Vec::with_capacity(buckets.len());
            for bucket in &buckets {
                guards.push(bucket.lock().await);
            }

            let now = Instant::now();
            let mut wait_until: Option<Instant> = None;
            for bucket in guards.iter_mut() {
                bucket.roll_window(now);

                if bucket.used >= bucket.limit {
                    let window = bucket.window;
                    let resets_at = *bucket.resets_at.get_or_insert(now + window);
                    wait_until = Some(wait_until.map_or(resets_at, |at| at.max(resets_at)));
                }
            }

            let Some(wait_until) = wait_until else {
                for bucket in guards.iter_mut() {
                    bucket.used += 1;
                    if bucket.resets_at.is_none() {
                        bucket.resets_at = Some(now + bucket.window);
                    }
                }

                return;
            };

            drop(guards);
            tracing::debug!(
                wait_ms = wait_until.saturating_duration_since(now).as_millis() as u64,
                "rate limit bucket exhausted, waiting for the window to end"
            );
            tokio::time::sleep_until(wait_until).await;
        }
    }

    /// Overrides local bucket state with the budget the server reported for `path`
    #[tracing::instrument(skip(self, headers))]
    pub async fn reconcile(&self, method: &Method, path: &str, headers: &HeaderMap) {
        let Some(budget) = ServerBudget::from_headers(headers) else {
            return;
        };

        let path = normalize_path(path);
        let mut keys = self.matching_keys(method, &path);
        if keys.is_empty() {
            keys.push((BucketKey::Path(path), u32::MAX, FALLBACK_WINDOW));
        }

        let now = Instant::now();
        for (key, limit, window) in keys {
            let bucket = self.bucket(key, limit, window);
            let mut bucket = bucket.lock().await;
            bucket.roll_window(now);

            if let Some(server_limit) = budget.limit {
                bucket.limit = server_limit;
            } else if bucket.limit == u32::MAX {
                bucket.limit = budget.remaining.max(1);
            }

            bucket.used = bucket.limit.saturating_sub(budget.remaining);
            match &budget.retry_after {
                Some(retry_after) => bucket.resets_at = Some(instant_at(retry_after)),
                // the server says the budget is spent, wait at least one window
                None if bucket.used >= bucket.limit && bucket.resets_at.is_none() => {
                    bucket.resets_at = Some(now + bucket.window);
                }
                None => {}
            }

            tracing::trace!(
                used = bucket.used,
                limit = bucket.limit,
                "bucket reconciled with server state"
            );
        }
    }

    /// Requests left in the tightest bucket matching `path`, `None` if nothing limits it
    pub async fn remaining(&self, method: &Method, path: &str) -> Option<u32> {
        let mut remaining = None;

        for bucket in self.matching_buckets(method, &normalize_path(path)) {
            let mut bucket = bucket.lock().await;
            bucket.roll_window(Instant::now());

            let left = bucket.limit.saturating_sub(bucket.used);
            remaining = Some(remaining.map_or(left, |current: u32| current.min(left)));
        }

        remaining
    }
}
