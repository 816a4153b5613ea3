use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

// ── Configuration ──

/// Route groups, each with its own budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Catalog and availability reads.
    Public,
    /// Booking creation.
    Booking,
    /// Authenticated client reads.
    Auth,
    Admin,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Public, Tier::Booking, Tier::Auth, Tier::Admin];

    pub fn default_limit(self) -> RateLimitConfig {
        let (max_requests, secs) = match self {
            Tier::Public => (60, 60),
            Tier::Booking => (5, 300),
            Tier::Auth => (30, 60),
            Tier::Admin => (120, 60),
        };
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum requests allowed within the sliding window.
    pub max_requests: u32,
    pub window: Duration,
}

// ── Core Rate Limiter ──

/// In-memory per-IP sliding-window limiter. Cheap to clone; clones share counters.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: Arc<HashMap<Tier, RateLimitConfig>>,
    hits: Arc<DashMap<(Tier, IpAddr), Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_limits(Tier::ALL.map(|t| (t, t.default_limit())))
    }
}

impl RateLimiter {
    /// Tiers missing from `limits` are not limited.
    pub fn with_limits(limits: impl IntoIterator<Item = (Tier, RateLimitConfig)>) -> Self {
        Self {
            limits: Arc::new(limits.into_iter().collect()),
            hits: Arc::new(DashMap::new()),
        }
    }

    /// `Err(retry_after_secs)` when `ip` has used up `tier`'s window.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let Some(config) = self.limits.get(&tier) else {
            return Ok(());
        };
        let now = Instant::now();

        let mut entry = self.hits.entry((tier, ip)).or_default();
        entry.retain(|t| now.duration_since(*t) < config.window);

        if entry.len() >= config.max_requests as usize {
            let oldest = entry[0];
            let retry_after = (oldest + config.window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Drop IPs idle for more than two windows. Run from a background task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits.retain(|(tier, _), timestamps| {
            let cutoff = self
                .limits
                .get(tier)
                .map_or(Duration::ZERO, |c| c.window * 2);
            timestamps.retain(|t| now.duration_since(*t) < cutoff);
            !timestamps.is_empty()
        });
    }
}

// ── IP Extraction ──

/// The socket peer, unless it is a reverse proxy on this host. Then the
/// last X-Forwarded-For hop, the one that proxy appended itself.
pub fn client_ip(req: &Request) -> IpAddr {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ci| ci.0.ip());
    if !peer.is_loopback() {
        return peer;
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .and_then(|last| last.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
}

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "Too many requests. Try again in {retry_after} seconds"
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

/// Middleware; mount with `from_fn_with_state((limiter, tier), rate_limit)`.
pub async fn rate_limit(
    State((limiter, tier)): State<(RateLimiter, Tier)>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = client_ip(&req);
    if let Err(retry_after) = limiter.check(tier, ip) {
        tracing::warn!(?tier, %ip, retry_after, "rate limited");
        return Err(too_many_requests(retry_after));
    }
    Ok(next.run(req).await)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn limiter(max_requests: u32, window: Duration) -> RateLimiter {
        RateLimiter::with_limits([(
            Tier::Booking,
            RateLimitConfig {
                max_requests,
                window,
            },
        )])
    }

    fn request(peer: &str, forwarded: Option<&str>) -> Request {
        let mut req = Request::builder().uri("/");
        if let Some(forwarded) = forwarded {
            req = req.header("x-forwarded-for", forwarded);
        }
        let mut req = req.body(axum::body::Body::empty()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_direct_client_cannot_spoof_forwarded_for() {
        let req = request("203.0.113.9:5000", Some("10.0.0.1"));
        assert_eq!(client_ip(&req), "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_local_proxy_uses_last_hop() {
        let req = request("127.0.0.1:5000", Some("10.0.0.1, 198.51.100.7"));
        assert_eq!(client_ip(&req), "198.51.100.7".parse::<IpAddr>().unwrap());
        let req = request("127.0.0.1:5000", None);
        assert_eq!(client_ip(&req), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_default_budgets() {
        assert_eq!(Tier::Public.default_limit().max_requests, 60);
        assert_eq!(Tier::Booking.default_limit().window, Duration::from_secs(300));
        assert_eq!(Tier::Admin.default_limit().max_requests, 120);
    }

    #[test]
    fn test_rejects_over_limit_with_retry_after() {
        let l = limiter(2, Duration::from_secs(60));
        assert!(l.check(Tier::Booking, ip(1)).is_ok());
        assert!(l.check(Tier::Booking, ip(1)).is_ok());
        let retry_after = l.check(Tier::Booking, ip(1)).unwrap_err();
        assert!((1..=60).contains(&retry_after));
    }

    #[test]
    fn test_ips_and_tiers_independent() {
        let l = RateLimiter::with_limits([
            (Tier::Public, RateLimitConfig { max_requests: 1, window: Duration::from_secs(60) }),
            (Tier::Auth, RateLimitConfig { max_requests: 1, window: Duration::from_secs(60) }),
        ]);
        assert!(l.check(Tier::Public, ip(1)).is_ok());
        assert!(l.check(Tier::Public, ip(1)).is_err());
        assert!(l.check(Tier::Public, ip(2)).is_ok());
        assert!(l.check(Tier::Auth, ip(1)).is_ok());
    }

    #[test]
    fn test_unconfigured_tier_is_unlimited() {
        let l = limiter(1, Duration::from_secs(60));
        for _ in 0..10 {
            assert!(l.check(Tier::Admin, ip(1)).is_ok());
        }
    }

    #[test]
    fn test_window_expiry_allows_again() {
        let l = limiter(1, Duration::from_millis(100));
        assert!(l.check(Tier::Booking, ip(1)).is_ok());
        assert!(l.check(Tier::Booking, ip(1)).is_err());
        sleep(Duration::from_millis(150));
        assert!(l.check(Tier::Booking, ip(1)).is_ok());
    }

    #[test]
    fn test_cleanup_keeps_active_entries() {
        let l = limiter(2, Duration::from_secs(60));
        l.check(Tier::Booking, ip(1)).unwrap();
        l.cleanup();
        l.check(Tier::Booking, ip(1)).unwrap();
        assert!(l.check(Tier::Booking, ip(1)).is_err());
    }

    #[test]
    fn test_cleanup_drops_stale_entries() {
        let l = limiter(10, Duration::from_millis(50));
        l.check(Tier::Booking, ip(1)).unwrap();
        sleep(Duration::from_millis(120));
        l.cleanup();
        assert!(l.hits.is_empty());
    }
}
