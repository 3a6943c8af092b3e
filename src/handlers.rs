// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the ingress guard service.
//!
//! Two modes of operation:
//!
//! 1. **External auth service**: a fronting proxy calls `/check` and reads
//!    the allow/deny body before forwarding.
//! 2. **Direct filter**: requests pass through `/guard/{scope}`, which
//!    answers 403/429 itself and stamps quota headers on success.
//!
//! The login flow reports into `/attempts` and consults `/captcha/*`.

use crate::captcha::CaptchaVerifier;
use crate::config::{Config, PoliciesConfig};
use crate::error::PolicyError;
use crate::gate::{GateOutcome, RequestGate};
use crate::limiter::RatePolicy;
use crate::metrics;
use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The named policies the service exposes, one per endpoint class.
pub struct GuardPolicies {
    pub contact: RatePolicy,
    pub auth: RatePolicy,
    pub api: RatePolicy,
}

impl GuardPolicies {
    pub fn from_config(config: &PoliciesConfig) -> Result<Self, PolicyError> {
        Ok(Self {
            contact: RatePolicy::from_config("contact", &config.contact, "rl:contact:")?,
            auth: RatePolicy::from_config("auth", &config.auth, "rl:auth:")?,
            api: RatePolicy::from_config("api", &config.api, "rl:api:")?,
        })
    }

    pub fn for_scope(&self, scope: &str) -> Option<&RatePolicy> {
        match scope {
            "contact" => Some(&self.contact),
            "auth" => Some(&self.auth),
            "api" => Some(&self.api),
            _ => None,
        }
    }

    /// Key prefixes for all policies, for the full rate-key reset.
    pub fn key_prefixes(&self) -> Vec<String> {
        vec![
            self.contact.key_prefix().to_string(),
            self.auth.key_prefix().to_string(),
            self.api.key_prefix().to_string(),
        ]
    }
}

/// Shared application state.
pub struct AppState {
    pub gate: RequestGate,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub policies: GuardPolicies,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Guard check request (for external validation).
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub ip: String,
    pub scope: String,
    /// Request path; folded into the identifier for the generic api scope.
    #[serde(default)]
    pub path: Option<String>,
}

/// Guard check response.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at_ms: Option<i64>,
}

/// Failed-attempt report from the login flow.
#[derive(Debug, Deserialize)]
pub struct AttemptRequest {
    pub ip: String,
    pub email: String,
    #[serde(default)]
    pub user_agent: String,
}

/// Attempt-history clear request, sent on successful login.
#[derive(Debug, Deserialize)]
pub struct ClearAttemptsRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ClearAttemptsResponse {
    pub cleared: u64,
}

/// CAPTCHA requirement query.
#[derive(Debug, Deserialize)]
pub struct CaptchaRequiredRequest {
    pub ip: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CaptchaRequiredResponse {
    pub required: bool,
}

/// CAPTCHA token verification request.
#[derive(Debug, Deserialize)]
pub struct CaptchaVerifyRequest {
    pub token: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "ingress-guard",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// The identifier a policy scopes its quota to: the client IP, plus the
/// request path for generic API traffic so each route gets its own window.
fn scope_identifier(scope: &str, ip: &str, path: Option<&str>) -> String {
    match (scope, path) {
        ("api", Some(path)) => format!("{ip}:{path}"),
        _ => ip.to_string(),
    }
}

/// Guard check for a fronting proxy.
///
/// Always answers 200 with an allow/deny body (so the proxy can read it);
/// 400 only for requests the guard cannot interpret.
pub async fn check(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckRequest>,
) -> Response {
    debug!(ip = %req.ip, scope = %req.scope, path = ?req.path, "Processing guard check");

    let Some(policy) = state.policies.for_scope(&req.scope) else {
        warn!(scope = %req.scope, "Unknown guard scope");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("unknown scope: {}", req.scope),
                code: "UNKNOWN_SCOPE",
                retry_after_secs: None,
            }),
        )
            .into_response();
    };

    let identifier = scope_identifier(&req.scope, &req.ip, req.path.as_deref());
    let outcome = state
        .gate
        .guard(policy, &req.ip, &identifier, || async {})
        .await;

    let body = match outcome {
        GateOutcome::Completed { quota, .. } => CheckResponse {
            allowed: true,
            reason: None,
            retry_after_secs: None,
            limit: Some(quota.limit),
            remaining: Some(quota.remaining),
            reset_at_ms: Some(quota.reset_at_ms),
        },
        GateOutcome::Blocked => CheckResponse {
            allowed: false,
            reason: Some("access denied"),
            retry_after_secs: None,
            limit: None,
            remaining: None,
            reset_at_ms: None,
        },
        GateOutcome::Limited {
            limit,
            retry_after_secs,
            reset_at_ms,
        } => CheckResponse {
            allowed: false,
            reason: Some("rate limit exceeded"),
            retry_after_secs: Some(retry_after_secs),
            limit: Some(limit),
            remaining: Some(0),
            reset_at_ms: Some(reset_at_ms),
        },
    };

    (StatusCode::OK, Json(body)).into_response()
}

/// Direct-filter handler: the guard sits in the request path itself.
pub async fn guarded(
    State(state): State<Arc<AppState>>,
    Path(scope): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    let ip = client_ip(&headers, &addr);

    let Some(policy) = state.policies.for_scope(&scope) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown scope: {scope}"),
                code: "UNKNOWN_SCOPE",
                retry_after_secs: None,
            }),
        )
            .into_response();
    };

    // In direct mode there is no upstream path to fold in; quota is per IP
    let identifier = scope_identifier(&scope, &ip, None);
    let outcome = state.gate.guard(policy, &ip, &identifier, || async {}).await;

    match outcome {
        GateOutcome::Completed { quota, .. } => {
            debug!(%ip, scope, remaining = quota.remaining, "Request allowed");
            (
                StatusCode::OK,
                [
                    ("X-RateLimit-Limit", quota.limit.to_string()),
                    ("X-RateLimit-Remaining", quota.remaining.to_string()),
                    ("X-RateLimit-Reset", quota.reset_at_ms.to_string()),
                ],
                "Request allowed",
            )
                .into_response()
        }
        // No detail on why: a probing client learns nothing from this body
        GateOutcome::Blocked => (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "access denied".to_string(),
                code: "ACCESS_DENIED",
                retry_after_secs: None,
            }),
        )
            .into_response(),
        GateOutcome::Limited {
            retry_after_secs, ..
        } => (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", retry_after_secs.to_string())],
            Json(ErrorResponse {
                error: "rate limit exceeded".to_string(),
                code: "RATE_LIMITED",
                retry_after_secs: Some(retry_after_secs),
            }),
        )
            .into_response(),
    }
}

/// Record a failed authentication attempt reported by the login flow.
pub async fn record_attempt(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AttemptRequest>,
) -> StatusCode {
    info!(ip = %req.ip, email = %req.email, "Failed attempt reported");
    state
        .gate
        .abuse()
        .record_failed_attempt(&req.ip, &req.email, &req.user_agent)
        .await;
    StatusCode::NO_CONTENT
}

/// Clear the failed-attempt history after a successful login.
pub async fn clear_attempts(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClearAttemptsRequest>,
) -> Json<ClearAttemptsResponse> {
    let cleared = state.gate.abuse().clear_failed_attempts(&req.email).await;
    Json(ClearAttemptsResponse { cleared })
}

/// Whether the next attempt for this ip/email must present a CAPTCHA.
pub async fn captcha_required(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CaptchaRequiredRequest>,
) -> Json<CaptchaRequiredResponse> {
    let required = state.gate.abuse().requires_captcha(&req.ip, &req.email).await;
    Json(CaptchaRequiredResponse { required })
}

/// Verify a CAPTCHA token against the external verification service.
pub async fn captcha_verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CaptchaVerifyRequest>,
) -> Response {
    match state.captcha.verify(&req.token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            metrics::CAPTCHA_FAILURES.inc();
            info!(error = %err, "Captcha verification failed");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "challenge not satisfied".to_string(),
                    code: "CAPTCHA_FAILED",
                    retry_after_secs: None,
                }),
            )
                .into_response()
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_text() -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        metrics::render(),
    )
        .into_response()
}

/// Derive the client IP: first `X-Forwarded-For` hop when a trusted proxy
/// fronts the service, socket address otherwise.
pub fn client_ip(headers: &HeaderMap, addr: &SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}
