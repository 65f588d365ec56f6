mod ai;
mod api;
mod auth;
mod config;
mod error;
mod image;
mod normalizer;
mod types;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    log_config(&cfg);

    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let app = router(ApiState::from_config(cfg)?);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Presence only; key values never reach the log.
fn log_config(cfg: &Config) {
    let set = |v: &Option<String>| if v.is_some() { "set" } else { "missing" };
    info!(
        supabase_url = set(&cfg.supabase_url),
        supabase_anon_key = set(&cfg.supabase_anon_key),
        supabase_service_key = set(&cfg.supabase_service_key),
        gemini_api_key = set(&cfg.gemini_api_key),
        validate_schema = cfg.validate_schema,
        probe_urls = cfg.probe_urls,
        http_timeout_secs = cfg.http_timeout_secs,
        probe_timeout_secs = cfg.probe_timeout_secs,
        "configuration loaded"
    );
    if cfg.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY not set; analysis requests will fail with 500 until it is configured.");
    }
    if cfg.supabase_url.is_none() || cfg.supabase_anon_key.is_none() {
        warn!("SUPABASE_URL / SUPABASE_ANON_KEY not set; requests cannot be authenticated.");
    }
}
