//! In-memory token-bucket rate limiter.
//!
//! One bucket per client key (`user:{id}` for authenticated callers,
//! `ip:{addr}` otherwise). Buckets start full, refill continuously and each
//! request spends one token. Buckets that have refilled completely are
//! dropped on a periodic sweep, so the map only holds recently active
//! clients.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tokio::sync::Mutex;

use crate::config::env_or;

/// Default bucket size.
const DEFAULT_CAPACITY: f64 = 20.0;
/// Default refill rate, in tokens per minute.
const DEFAULT_REFILL_PER_MINUTE: f64 = 20.0;

/// Message returned to clients that exceed their budget.
pub const RATE_LIMIT_ERROR: &str = "Trop de requêtes. Veuillez patienter avant de réessayer.";

/// Token-bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub capacity: f64,
    pub refill_per_sec: f64,
}

impl RateLimitConfig {
    /// Reads `RATE_LIMIT_CAPACITY` and `RATE_LIMIT_REFILL_PER_MINUTE`.
    pub fn from_env() -> Self {
        let capacity: f64 = env_or("RATE_LIMIT_CAPACITY", DEFAULT_CAPACITY);
        assert!(capacity >= 1.0, "RATE_LIMIT_CAPACITY must be at least 1");
        let per_minute: f64 = env_or("RATE_LIMIT_REFILL_PER_MINUTE", DEFAULT_REFILL_PER_MINUTE);

        Self {
            capacity,
            refill_per_sec: per_minute / 60.0,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_per_sec: DEFAULT_REFILL_PER_MINUTE / 60.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// How often `allow` drops buckets that have sat idle long enough to be full.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Buckets {
    map: HashMap<String, Bucket>,
    last_sweep: Instant,
}

impl Buckets {
    /// A bucket idle for `capacity / refill_per_sec` has refilled completely,
    /// so forgetting it is the same as recreating it full. With no refill a
    /// bucket never recovers and is kept.
    fn sweep(&mut self, now: Instant, cfg: &RateLimitConfig) {
        self.last_sweep = now;
        if cfg.refill_per_sec <= 0.0 {
            return;
        }
        let idle = Duration::from_secs_f64(cfg.capacity / cfg.refill_per_sec);
        self.map
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) < idle);
    }
}

/// Shared limiter, held in `AppState` behind an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend one token from `key`'s bucket. Returns `false` when it is empty.
    pub async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        self.allow_at(key, cfg, Instant::now()).await
    }

    async fn allow_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().await;
        if now.saturating_duration_since(buckets.last_sweep) >= SWEEP_INTERVAL {
            buckets.sweep(now, cfg);
        }

        let bucket = buckets.map.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + elapsed * cfg.refill_per_sec).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.buckets.lock().await.map.len()
    }
}

/// Bucket key for an authenticated user.
pub fn user_key(user_id: i64) -> String {
    format!("user:{user_id}")
}

/// The TCP peer of the request, when the server was started with connect info.
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for PeerAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);
        Ok(PeerAddr(peer))
    }
}

/// Bucket key for an anonymous client.
///
/// The peer address is the client unless it is one of `trusted_proxies`, in
/// which case the first hop of `X-Forwarded-For` (then `X-Real-IP`) names the
/// client. Header values that are not IP addresses are ignored. Requests with
/// no usable address share one `ip:unknown` bucket.
pub fn client_ip_key(
    peer: Option<SocketAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[IpAddr],
) -> String {
    let peer_ip = peer.map(|addr| addr.ip());
    let behind_proxy = peer_ip.is_some_and(|ip| trusted_proxies.contains(&ip));

    let ip = if behind_proxy {
        forwarded_ip(headers).or(peer_ip)
    } else {
        peer_ip
    };

    match ip {
        Some(ip) => format!("ip:{ip}"),
        None => "ip:unknown".to_string(),
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header_ip = |name: &str, first_hop: bool| -> Option<IpAddr> {
        let raw = headers.get(name)?.to_str().ok()?;
        let value = if first_hop { raw.split(',').next()? } else { raw };
        value.trim().parse::<IpAddr>().ok()
    };
    header_ip("x-forwarded-for", true).or_else(|| header_ip("x-real-ip", false))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn tight() -> RateLimitConfig {
        RateLimitConfig {
            capacity: 3.0,
            refill_per_sec: 0.0,
        }
    }

    #[tokio::test]
    async fn bucket_empties_after_capacity() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.allow("user:1", &tight()).await);
        }
        assert!(!limiter.allow("user:1", &tight()).await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.allow("user:1", &tight()).await);
        }
        assert!(!limiter.allow("user:1", &tight()).await);
        assert!(limiter.allow("user:2", &tight()).await);
    }

    #[tokio::test]
    async fn bucket_refills_over_time() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig {
            capacity: 1.0,
            refill_per_sec: 1000.0,
        };
        assert!(limiter.allow("k", &cfg).await);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(limiter.allow("k", &cfg).await);
    }

    #[tokio::test]
    async fn idle_buckets_are_swept_once_full_again() {
        let limiter = RateLimiter::new();
        let cfg = RateLimitConfig {
            capacity: 100.0,
            refill_per_sec: 1.0,
        };
        let t0 = Instant::now();

        assert!(limiter.allow_at("ip:192.0.2.1", &cfg, t0).await);
        assert!(limiter.allow_at("ip:192.0.2.2", &cfg, t0 + Duration::from_secs(61)).await);
        // The first bucket has been idle 61s of the 100s it needs to refill.
        assert_eq!(limiter.tracked().await, 2);

        assert!(limiter.allow_at("ip:192.0.2.3", &cfg, t0 + Duration::from_secs(200)).await);
        assert_eq!(limiter.tracked().await, 1);
    }

    #[tokio::test]
    async fn buckets_without_refill_are_never_swept() {
        let limiter = RateLimiter::new();
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(limiter.allow_at("user:1", &tight(), t0).await);
        }
        assert!(!limiter.allow_at("user:1", &tight(), t0 + Duration::from_secs(3600)).await);
        assert_eq!(limiter.tracked().await, 1);
    }

    fn peer(ip: [u8; 4]) -> Option<SocketAddr> {
        Some(SocketAddr::from((ip, 51000)))
    }

    fn spoofed_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        headers
    }

    #[test]
    fn client_ip_ignores_headers_from_untrusted_peers() {
        assert_eq!(
            client_ip_key(peer([192, 0, 2, 10]), &spoofed_headers(), &[]),
            "ip:192.0.2.10"
        );
    }

    #[test]
    fn client_ip_reads_forwarded_hop_behind_trusted_proxy() {
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(
            client_ip_key(peer([10, 0, 0, 1]), &spoofed_headers(), &[proxy]),
            "ip:203.0.113.7"
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(
            client_ip_key(peer([10, 0, 0, 1]), &headers, &[proxy]),
            "ip:198.51.100.2"
        );

        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        headers.remove("x-real-ip");
        assert_eq!(client_ip_key(peer([10, 0, 0, 1]), &headers, &[proxy]), "ip:10.0.0.1");
    }

    #[test]
    fn client_ip_without_peer_is_unknown() {
        assert_eq!(client_ip_key(None, &spoofed_headers(), &[]), "ip:unknown");
    }
}
