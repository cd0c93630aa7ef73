//! Comment creation rate limiting.
//!
//! Fixed-window counters keyed by caller (`user:{id}`) or, for requests
//! without an identity, by client address (`ip:{addr}`).

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;

use crate::extractors::{Caller, client_ip};

/// Length of one counting window.
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of a limiter check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset_secs: u64 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window limiter shared by all requests.
#[derive(Clone)]
pub struct RateLimiterState {
    max_requests: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiterState {
    /// Limiter allowing `max_requests` per minute per key.
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, WINDOW)
    }

    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.max_requests
    }

    /// Count one request against `key`.
    pub async fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now()).await
    }

    async fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock().await;
        let entry = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                count: 0,
                started: now,
            };
        }

        let left = self.window.saturating_sub(now.duration_since(entry.started));
        // Round up so a client never retries inside the current window
        let left_secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);

        if entry.count >= self.max_requests {
            return Decision::Limited {
                retry_after_secs: left_secs.max(1),
            };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.max_requests - entry.count,
            reset_secs: left_secs,
        }
    }

    /// Drop windows that have already expired.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.windows
            .lock()
            .await
            .retain(|_, w| now.duration_since(w.started) < window);
    }

    /// Number of tracked keys.
    pub async fn key_count(&self) -> usize {
        self.windows.lock().await.len()
    }
}

/// `429 Too Many Requests` response.
#[derive(Debug)]
pub struct RateLimitError {
    pub retry_after_secs: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": "RATE_LIMITED",
                "message": "Too many requests, please try again later",
            }
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, self.retry_after_secs.to_string())],
            Json(body),
        )
            .into_response()
    }
}

/// Limiter key for a request.
fn request_key(req: &Request<Body>) -> String {
    if let Some(caller) = req.extensions().get::<Caller>() {
        return format!("user:{}", caller.id);
    }
    client_ip(req.headers(), req.extensions())
        .map_or_else(|| "ip:unknown".to_string(), |ip| format!("ip:{ip}"))
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiterState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, RateLimitError> {
    let key = request_key(&req);

    match limiter.check(&key).await {
        Decision::Allowed {
            remaining,
            reset_secs,
        } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.limit()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            headers.insert("x-ratelimit-reset", HeaderValue::from(reset_secs));
            Ok(response)
        }
        Decision::Limited { retry_after_secs } => {
            tracing::debug!(key = %key, retry_after_secs, "Rate limit exceeded");
            Err(RateLimitError { retry_after_secs })
        }
    }
}
