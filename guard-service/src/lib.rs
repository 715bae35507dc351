pub mod app;
pub mod metrics;

pub use app::{build_router, spawn_jwks_refresh, AppState};
pub use metrics::GuardMetrics;
