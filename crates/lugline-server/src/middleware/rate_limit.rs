// SPDX-License-Identifier: Apache-2.0

//! Fixed-window request limiter keyed by client IP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use lugline_api::errors::ApiError;
use tokio::sync::Mutex;

use crate::http::failure_response;
use crate::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u64,
}

/// Counts requests per key in coarse fixed windows; the count resets when a
/// window expires.
pub struct FixedWindowLimiter {
    max_requests: u64,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns false once the key is over budget for the current window.
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_insert_with(|| Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }
        window.count += 1;
        window.count <= self.max_requests
    }
}

pub(crate) async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);
    if !state.limiter.allow(&key).await {
        tracing::warn!(client = %key, "rate limit exceeded");
        return failure_response(&request, ApiError::rate_limited());
    }
    next.run(request).await
}

/// Prefers the first `x-forwarded-for` hop, then the socket address.
fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_window_budget() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_secs(60));
        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);
        assert!(limiter.allow("5.6.7.8").await);
    }

    #[tokio::test]
    async fn expired_window_resets_the_count() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow("1.2.3.4").await);
        assert!(!limiter.allow("1.2.3.4").await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("1.2.3.4").await);
    }

    #[test]
    fn forwarded_header_wins_over_missing_connect_info() {
        let request = Request::builder()
            .header("x-forwarded-for", "9.9.9.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_key(&request), "9.9.9.9");

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_key(&bare), "unknown");
    }
}
