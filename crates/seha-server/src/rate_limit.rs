//! Per-IP token-bucket rate limiting for the backup API.
//!
//! Backups are manual, user-initiated and carry whole snapshots, so the
//! sustained rate is deliberately low.  Buckets for idle IPs are swept by a
//! periodic [`RateLimiter::purge_stale`] call so the map stays bounded on a
//! long-running public instance.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How often the background sweep runs, and the idle age at which a
/// bucket is dropped.  A dropped bucket refills to full capacity on the
/// client's next request, which is the correct behavior for an idle IP.
pub const PURGE_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_seen: Instant,
}

impl TokenBucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_seen: Instant::now(),
        }
    }

    fn try_consume(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let refill = now.duration_since(self.last_seen).as_secs_f64() * rate;
        self.last_seen = now;

        self.tokens = (self.tokens + refill).min(capacity);
        if self.tokens < 1.0 {
            return false;
        }
        self.tokens -= 1.0;
        true
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, TokenBucket>>>,
    rate: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            capacity,
        }
    }

    pub async fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(self.capacity))
            .try_consume(self.rate, self.capacity)
    }

    /// Drop buckets that have been idle longer than `max_idle`.  Called
    /// periodically from the server's sweep task; without it the map grows
    /// by one entry per distinct client IP, forever.
    pub async fn purge_stale(&self, max_idle: Duration) {
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_seen) < max_idle);

        let purged = before - buckets.len();
        if purged > 0 {
            debug!(purged, remaining = buckets.len(), "Purged stale rate-limit buckets");
        }
    }

    /// Number of tracked IPs.
    pub async fn tracked_ips(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

impl Default for RateLimiter {
    // 2 req/s sustained, burst of 10.
    fn default() -> Self {
        Self::new(2.0, 10.0)
    }
}

pub async fn rate_limit_middleware(
    axum::extract::State(limiter): axum::extract::State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ip) = client_ip(&req) {
        if !limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Resolve the client IP: the socket address when we terminate the
/// connection ourselves, otherwise the usual reverse-proxy headers.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(addr.ip());
    }

    let from_header = |name: &str| -> Option<IpAddr> {
        let value = req.headers().get(name)?.to_str().ok()?;
        // X-Forwarded-For may carry a chain; the first hop is the client.
        value.split(',').next()?.trim().parse().ok()
    };

    from_header("x-forwarded-for").or_else(|| from_header("x-real-ip"))
}
