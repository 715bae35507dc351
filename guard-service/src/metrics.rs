use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct GuardMetrics {
    registry: Registry,
    auth_outcomes: IntCounterVec,
    jwks_refreshes: IntCounterVec,
}

impl GuardMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let auth_outcomes = IntCounterVec::new(
            Opts::new(
                "guard_auth_outcomes_total",
                "Count of bearer token checks grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_outcomes.clone()))?;

        let jwks_refreshes = IntCounterVec::new(
            Opts::new(
                "guard_jwks_refresh_total",
                "Count of signing key refresh attempts grouped by result",
            ),
            &["result"],
        )?;
        registry.register(Box::new(jwks_refreshes.clone()))?;

        Ok(Self {
            registry,
            auth_outcomes,
            jwks_refreshes,
        })
    }

    /// `outcome` is `accepted` or an auth failure reason code.
    pub fn auth_outcome(&self, outcome: &str) {
        self.auth_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn jwks_refresh(&self, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        self.jwks_refreshes.with_label_values(&[result]).inc();
    }

    pub fn auth_outcome_count(&self, outcome: &str) -> u64 {
        self.auth_outcomes.with_label_values(&[outcome]).get()
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
