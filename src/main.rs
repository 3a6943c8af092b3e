// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Ingress Guard Service
//!
//! Runs the abuse-mitigation gate as a standalone ingress filter:
//!
//! - `/check` for a fronting proxy (external auth mode)
//! - `/guard/{scope}` for direct filtering with quota headers
//! - `/attempts`, `/captcha/required`, `/captcha/verify` for the login flow
//! - `/health`, `/metrics`
//!
//! ## Configuration
//!
//! Environment variables override the defaults:
//!
//! - `BIND_ADDR`: server bind address (default: 0.0.0.0:8080)
//! - `REDIS_URL`: counter store backend; in-memory when unset
//! - `CAPTCHA_SECRET`: shared secret for the verification service
//! - `CLEANUP_INTERVAL_SECS`: ledger sweep interval (default: 3600)
//! - `STORE_TIMEOUT_MS`: per-operation store timeout (default: 500)

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ingress_guard::{
    abuse::AbuseGuard,
    captcha::RecaptchaVerifier,
    cleanup::CleanupTask,
    config::Config,
    gate::RequestGate,
    handlers::{self, AppState, GuardPolicies},
    ledger::MemoryLedgerStore,
    limiter::RateLimiter,
    store::{CounterStore, MemoryCounterStore, RedisCounterStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        redis = config.redis_url.is_some(),
        contact_max = config.policies.contact.max_requests,
        auth_max = config.policies.auth.max_requests,
        api_max = config.policies.api.max_requests,
        "Starting ingress guard"
    );

    // Counter store: Redis when configured, in-memory otherwise
    let counters: Arc<dyn CounterStore> = match &config.redis_url {
        Some(url) => Arc::new(RedisCounterStore::connect(url, config.store.op_timeout()).await?),
        None => Arc::new(MemoryCounterStore::new()),
    };
    let ledger = Arc::new(MemoryLedgerStore::new());

    // Create application state
    let policies = GuardPolicies::from_config(&config.policies)?;
    let abuse = Arc::new(AbuseGuard::new(ledger.clone(), config.abuse.blacklist_hours));
    let gate = RequestGate::new(RateLimiter::new(counters.clone()), abuse.clone());
    let captcha = Arc::new(RecaptchaVerifier::new(config.captcha.clone()));

    // Spawn cleanup task
    let cleanup = Arc::new(CleanupTask::new(
        ledger,
        counters,
        config.abuse.attempt_retention_hours,
        policies.key_prefixes(),
    ));
    cleanup.spawn(config.cleanup.interval());

    let metrics_enabled = config.metrics.enabled;
    let metrics_path = config.metrics.path.clone();
    let state = Arc::new(AppState {
        gate,
        captcha,
        policies,
        config: config.clone(),
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route("/check", post(handlers::check))
        .route("/guard/:scope", post(handlers::guarded))
        .route("/attempts", post(handlers::record_attempt))
        .route("/attempts/clear", post(handlers::clear_attempts))
        .route("/captcha/required", post(handlers::captcha_required))
        .route("/captcha/verify", post(handlers::captcha_verify));
    if metrics_enabled {
        app = app.route(&metrics_path, get(handlers::metrics_text));
    }
    let app = app.layer(TraceLayer::new_for_http()).with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    let mut config = Config::default();
    if let Ok(bind_addr) = std::env::var("BIND_ADDR") {
        config.bind_addr = bind_addr;
    }
    config.redis_url = std::env::var("REDIS_URL").ok();
    if let Ok(secret) = std::env::var("CAPTCHA_SECRET") {
        config.captcha.secret = secret;
    }
    if let Some(interval) = env_parse("CLEANUP_INTERVAL_SECS") {
        config.cleanup.interval_secs = interval;
    }
    if let Some(timeout) = env_parse("STORE_TIMEOUT_MS") {
        config.store.op_timeout_ms = timeout;
    }
    config
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
