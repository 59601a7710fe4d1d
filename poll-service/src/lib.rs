//! Poll creation and voting service.
//!
//! The [`ledger::VoteLedger`] is the only writer of voting state; everything
//! else here is storage plumbing and the HTTP surface around it.

pub mod auth_middleware;
pub mod config;
pub mod database;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod middleware;
pub mod polls;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;
pub mod votes;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use auth_middleware::require_metrics_token;
use middleware::inject_client_ip;
use state::AppState;

/// Build the HTTP router for the given state
pub fn build_router(state: AppState) -> Result<Router> {
    let config = state.config.clone();

    let admin = Router::new()
        .route("/admin/stats", get(admin_stats))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_metrics_token,
        ));

    let mut app = Router::new()
        .route("/healthz", get(health_check))
        .route("/meta", get(get_meta))
        .route("/polls", get(polls::list_polls).post(polls::create_poll))
        .route("/polls/stats", get(polls::poll_stats))
        .route("/polls/{poll_id}", get(polls::get_poll))
        .route("/polls/{poll_id}/close", post(polls::close_poll))
        .route(
            "/polls/{poll_id}/vote",
            get(votes::get_tally).post(votes::submit_vote),
        )
        .merge(admin)
        .layer(DefaultBodyLimit::max(config.request_body_limit))
        .with_state(state);

    if config.rate_limit_per_second > 0 {
        let period_ms = (1000 / config.rate_limit_per_second).max(1);
        let governor_conf = GovernorConfigBuilder::default()
            .per_millisecond(period_ms)
            .burst_size(config.rate_limit_burst.max(1))
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limit configuration"))?;
        info!(
            "Rate limiting enabled: {} req/s per client, burst {}",
            config.rate_limit_per_second, config.rate_limit_burst
        );
        app = app.layer(GovernorLayer {
            config: Arc::new(governor_conf),
        });
    }

    // Client IP resolution has to run before the rate limiter reads it.
    Ok(app
        .layer(axum::middleware::from_fn_with_state(
            config.trust_proxy_headers,
            inject_client_ip,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}

// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn get_meta(State(state): State<AppState>) -> Json<Value> {
    info!("GET /meta - Metadata requested");
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "git_hash": option_env!("POLL_SERVICE_BUILD_GIT_HASH"),
        "build_time_unix": env!("POLL_SERVICE_BUILD_TIME_UNIX"),
        "storage_backend": state.config.storage.to_string(),
        "anonymous_voting": state.config.anonymous_voting.to_string(),
    }))
}

async fn admin_stats(State(state): State<AppState>) -> Json<Value> {
    info!("GET /admin/stats - Stats requested");
    Json(metrics::snapshot_as_json(&state.config))
}
