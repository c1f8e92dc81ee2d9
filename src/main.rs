//! Comment Triage Service — Binary Entrypoint
//! Boots the Axum HTTP server: loads the profile tables once, builds the
//! model backends, and wires routes, metrics, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use std::sync::Arc;

use comment_triage::api::{create_router, AppState};
use comment_triage::crm::{CrmClient, CrmConfig};
use comment_triage::metrics::Metrics;
use comment_triage::model::{build_backends, load_model_config};
use comment_triage::profiles::Profiles;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - TRIAGE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("TRIAGE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("comment_triage=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // PROFILES_CONFIG_PATH / HF_API_TOKEN / CRM_* from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // --- Static configuration: loaded once, read-only afterwards ---
    let profiles = Profiles::load().expect("Failed to load profiles config");

    // --- Model backends (disabled config falls back to the keyword path) ---
    let model_config = load_model_config();
    let (classify_backend, generate_backend) = build_backends(&model_config);

    // --- CRM collaborator (optional; env-configured) ---
    let crm = CrmConfig::from_env()
        .map(|cfg| Arc::new(CrmClient::new(cfg, profiles.clone())));

    let metrics = Metrics::init(profiles.categories.len());

    let state = AppState::new(profiles, classify_backend, generate_backend, crm);
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
