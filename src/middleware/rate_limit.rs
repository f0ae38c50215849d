// middleware/rate_limit.rs
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::HttpError, AppState};

/// Past this many tracked clients every check also drops idle ones.
const SWEEP_THRESHOLD: usize = 1024;

/// Sliding-window limiter keyed by client address. State is per process.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
        }
    }

    pub fn is_allowed(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut requests = match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if requests.len() > SWEEP_THRESHOLD {
            Self::sweep(&mut requests, now, self.window);
        }

        let entry = requests.entry(key.to_string()).or_default();
        entry.retain(|&timestamp| now.duration_since(timestamp) < self.window);

        if entry.len() < self.max_requests {
            entry.push(now);
            true
        } else {
            false
        }
    }

    fn sweep(requests: &mut HashMap<String, Vec<Instant>>, now: Instant, window: Duration) {
        requests.retain(|_, timestamps| {
            timestamps.retain(|&timestamp| now.duration_since(timestamp) < window);
            !timestamps.is_empty()
        });
    }

    fn tracked_clients(&self) -> usize {
        match self.requests.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let client_id = get_client_id(&request);

    if !limiter.is_allowed(&client_id) {
        tracing::warn!("Rate limit exceeded for {} on {}", client_id, request.uri().path());
        return Err(HttpError::too_many_requests(
            "Too many requests, please try again later",
        ));
    }

    Ok(next.run(request).await)
}

/// The peer address, unless the service sits behind a proxy it trusts to set
/// `X-Forwarded-For`.
fn get_client_id(request: &Request) -> String {
    let trust_forwarded = request
        .extensions()
        .get::<Arc<AppState>>()
        .map_or(false, |state| state.env.trust_proxy_headers);

    let forwarded = || {
        request
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    let peer = || {
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    };

    let client = if trust_forwarded {
        forwarded().or_else(peer)
    } else {
        peer()
    };
    client.unwrap_or_else(|| "unknown".to_string())
}

pub fn auth_rate_limiter() -> RateLimiter {
    RateLimiter::new(10, Duration::from_secs(60)) // 10 attempts per minute
}

pub fn admin_bootstrap_rate_limiter() -> RateLimiter {
    RateLimiter::new(5, Duration::from_secs(60))
}

pub fn webhook_rate_limiter() -> RateLimiter {
    RateLimiter::new(100, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_limit_within_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("1.2.3.4", now));
        assert!(limiter.check_at("1.2.3.4", now));
        assert!(!limiter.check_at("1.2.3.4", now));
        assert!(limiter.check_at("5.6.7.8", now));
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        let start = Instant::now();
        assert!(limiter.check_at("client", start));
        assert!(!limiter.check_at("client", start));
        assert!(limiter.check_at("client", start + Duration::from_millis(20)));
    }

    use crate::{
        config::test_config, db::DBClient, service::storage::StorageService,
    };
    use sqlx::postgres::PgPoolOptions;

    fn request_from(peer: &str, forwarded: &str) -> Request {
        let mut request = Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(axum::body::Body::empty())
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    fn state_with_proxy_trust(trust: bool) -> Arc<AppState> {
        let mut config = test_config();
        config.trust_proxy_headers = trust;
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        Arc::new(AppState::new(DBClient::new(pool), config, StorageService::disabled()))
    }

    #[test]
    fn direct_clients_are_keyed_by_peer_address() {
        let first = request_from("203.0.113.7:51000", "10.0.0.1");
        let second = request_from("198.51.100.2:40000", "10.0.0.1");
        assert_eq!(get_client_id(&first), "203.0.113.7");
        assert_eq!(get_client_id(&second), "198.51.100.2");
    }

    #[tokio::test]
    async fn forwarded_header_is_used_only_behind_a_trusted_proxy() {
        let mut request = request_from("203.0.113.7:51000", "10.0.0.1, 172.16.0.1");
        request.extensions_mut().insert(state_with_proxy_trust(false));
        assert_eq!(get_client_id(&request), "203.0.113.7");

        let mut request = request_from("203.0.113.7:51000", "10.0.0.1, 172.16.0.1");
        request.extensions_mut().insert(state_with_proxy_trust(true));
        assert_eq!(get_client_id(&request), "10.0.0.1");
    }

    #[test]
    fn idle_clients_are_evicted() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10));
        let start = Instant::now();
        for i in 0..=SWEEP_THRESHOLD {
            assert!(limiter.check_at(&format!("client-{}", i), start));
        }
        assert_eq!(limiter.tracked_clients(), SWEEP_THRESHOLD + 1);

        assert!(limiter.check_at("late", start + Duration::from_millis(20)));
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
