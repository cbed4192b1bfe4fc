//! Request admission gate built on the rate limiter.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, warn};

use super::client::ClientIdentifier;
use super::limiter::{RateLimitDecision, RateLimiter};
use super::stats::format_reset;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// A denied request, rendered as `429 Too Many Requests`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub client_id: String,
    pub message: String,
    /// Whole seconds until the window closes, rounded up
    pub retry_after_secs: u64,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch milliseconds at which the window closes
    pub reset_at: u64,
}

impl Rejection {
    fn from_decision(client_id: &str, message: &str, decision: RateLimitDecision, now: u64) -> Self {
        Self {
            client_id: client_id.to_string(),
            message: message.to_string(),
            retry_after_secs: decision.window_end.saturating_sub(now).div_ceil(1000),
            limit: decision.limit,
            remaining: decision.remaining,
            reset_at: decision.window_end,
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
            "retryAfter": self.retry_after_secs,
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        if let Ok(reset) = HeaderValue::from_str(&format_reset(self.reset_at)) {
            headers.insert(X_RATELIMIT_RESET, reset);
        }
        response
    }
}

/// Identifies the caller, consults the limiter, and either lets the request
/// through or produces a [`Rejection`].
pub struct RateLimitGate {
    limiter: Arc<RateLimiter>,
    identifier: ClientIdentifier,
    message: String,
}

impl RateLimitGate {
    pub fn new(limiter: Arc<RateLimiter>, identifier: ClientIdentifier, message: impl Into<String>) -> Self {
        Self {
            limiter,
            identifier,
            message: message.into(),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Admit a request by its headers.
    pub fn admit(&self, headers: &HeaderMap) -> Result<(), Rejection> {
        let client_id = self.identifier.identify(headers);
        self.admit_client(&client_id)
    }

    /// Admit an already identified client.
    pub fn admit_client(&self, client_id: &str) -> Result<(), Rejection> {
        let now = self.limiter.now_millis();
        let decision = self.limiter.check_at(client_id, now);

        if decision.allowed {
            debug!(
                client_id = %client_id,
                remaining = decision.remaining,
                "Request admitted"
            );
            return Ok(());
        }

        let rejection = Rejection::from_decision(client_id, &self.message, decision, now);
        warn!(
            client_id = %client_id,
            retry_after = rejection.retry_after_secs,
            "Rate limit exceeded"
        );
        Err(rejection)
    }
}

/// Axum middleware running every request through the gate.
pub async fn enforce(State(gate): State<Arc<RateLimitGate>>, request: Request, next: Next) -> Response {
    match gate.admit(request.headers()) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use crate::ratelimit::limiter::LimitConfig;
    use std::time::Duration;

    fn gate_at(start: u64) -> (RateLimitGate, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        let limiter = Arc::new(RateLimiter::with_clock(LimitConfig::default(), clock.clone()));
        let gate = RateLimitGate::new(limiter, ClientIdentifier::default(), "slow down");
        (gate, clock)
    }

    #[test]
    fn test_admits_until_quota_then_rejects() {
        let (gate, clock) = gate_at(0);

        for _ in 0..3 {
            assert!(gate.admit_client("A").is_ok());
            clock.advance(Duration::from_secs(1));
        }

        let rejection = gate.admit_client("A").unwrap_err();
        assert_eq!(rejection.client_id, "A");
        assert_eq!(rejection.message, "slow down");
        assert_eq!(rejection.limit, 3);
        assert_eq!(rejection.remaining, 0);
        assert_eq!(rejection.reset_at, 60_000);
        assert_eq!(rejection.retry_after_secs, 57);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let (gate, clock) = gate_at(0);
        for _ in 0..3 {
            gate.admit_client("A").unwrap();
        }

        clock.set(58_001);
        assert_eq!(gate.admit_client("A").unwrap_err().retry_after_secs, 2);

        clock.set(60_000);
        assert_eq!(gate.admit_client("A").unwrap_err().retry_after_secs, 0);
    }

    #[test]
    fn test_admit_identifies_by_headers() {
        let (gate, _clock) = gate_at(0);
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.4"));

        gate.admit(&headers).unwrap();
        assert_eq!(gate.limiter().entry("198.51.100.4").unwrap().count, 1);
    }

    #[tokio::test]
    async fn test_rejection_response_shape() {
        let rejection = Rejection {
            client_id: "A".to_string(),
            message: "slow down".to_string(),
            retry_after_secs: 57,
            limit: 3,
            remaining: 0,
            reset_at: 60_000,
        };

        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let headers = response.headers();
        assert_eq!(headers["retry-after"], "57");
        assert_eq!(headers["x-ratelimit-limit"], "3");
        assert_eq!(headers["x-ratelimit-remaining"], "0");
        assert_eq!(headers["x-ratelimit-reset"], "1970-01-01T00:01:00.000Z");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "slow down");
        assert_eq!(body["retryAfter"], 57);
    }
}
