use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use common_auth::{AuthContext, AuthError, ClaimSet, TokenGuard};
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::metrics::GuardMetrics;

#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<TokenGuard>,
    pub metrics: Arc<GuardMetrics>,
}

impl FromRef<AppState> for Arc<TokenGuard> {
    fn from_ref(state: &AppState) -> Self {
        state.guard.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/readyz", get(ready))
        .route("/metrics", get(metrics_endpoint))
        .route("/whoami", get(whoami))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Not ready while verification is enabled but no signing keys are loaded.
async fn ready(State(state): State<AppState>) -> Response {
    match state.guard.key_store() {
        Some(keys) if !keys.is_available() => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unavailable",
                "reason": keys.unavailable_reason(),
            })),
        )
            .into_response(),
        Some(keys) => Json(json!({
            "status": "ready",
            "keys": keys.key_set().map_or(0, |set| set.len()),
        }))
        .into_response(),
        None => Json(json!({ "status": "ready", "mode": "bypass" })).into_response(),
    }
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, "Unable to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn whoami(
    State(state): State<AppState>,
    auth: Result<AuthContext, AuthError>,
) -> Result<Json<ClaimSet>, AuthError> {
    match auth {
        Ok(ctx) => {
            state.metrics.auth_outcome("accepted");
            Ok(Json(ctx.into_claims()))
        }
        Err(err) => {
            state.metrics.auth_outcome(err.code());
            Err(err)
        }
    }
}

/// Periodically re-fetch signing keys. Does nothing in bypass mode.
pub fn spawn_jwks_refresh(state: AppState, every: Duration) {
    let Some(keys) = state.guard.key_store().cloned() else {
        return;
    };
    let Some(url) = keys.fetcher().map(|fetcher| fetcher.url().to_owned()) else {
        return;
    };

    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; keys were just loaded at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match keys.refresh().await {
                Ok(count) => {
                    state.metrics.jwks_refresh(true);
                    debug!(count, jwks_url = %url, "Refreshed JWKS keys");
                }
                Err(err) => {
                    state.metrics.jwks_refresh(false);
                    warn!(error = %err, jwks_url = %url, "Failed to refresh JWKS keys");
                }
            }
        }
    });
}
