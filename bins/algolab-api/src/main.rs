mod handlers;
mod metrics;
mod routes;

use algolab_common::config::EngineConfig;
use algolab_engine::Grader;
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

pub const ADDR_ENV: &str = "ALGOLAB_ADDR";
pub const LOG_FORMAT_ENV: &str = "ALGOLAB_LOG_FORMAT";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

pub struct AppState {
    pub grader: Grader,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            grader: Grader::new(config),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new().merge(routes::routes()).with_state(state)
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true);

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("AlgoLab API booting...");

    let config = EngineConfig::load_default().context("Failed to load engine configuration")?;
    info!(
        comparison = %config.comparison,
        timeout_ms = config.request_timeout_ms,
        "Engine configured"
    );

    metrics::register_metrics();

    let state = Arc::new(AppState::new(&config));

    let addr = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to grade submissions");

    axum::serve(listener, app(state)).await.context("Server error")?;

    Ok(())
}
