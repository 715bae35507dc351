use std::env;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use common_auth::{GuardConfig, TokenGuard};
use guard_service::{build_router, spawn_jwks_refresh, AppState, GuardMetrics};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = GuardConfig::from_env().context("invalid guard configuration")?;
    let guard = TokenGuard::initialize(&config).await;

    let state = AppState {
        guard: Arc::new(guard),
        metrics: Arc::new(GuardMetrics::new()?),
    };

    if let GuardConfig::Verify(verify) = &config {
        if let Some(every) = verify.refresh_interval {
            info!(interval_secs = every.as_secs(), "Scheduling periodic JWKS refresh");
            spawn_jwks_refresh(state.clone(), every);
        }
    }

    let allowed_origins = ["http://localhost:3000", "http://localhost:5173"];
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = build_router(state).layer(cors);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let ip: IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    info!(%addr, bypass = config.is_bypass(), "starting guard-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
