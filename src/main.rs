//! Trading execution and reliability core - server binary
//!
//! Wires the paper engine, the optional Kraken live adapter, the per-user
//! mode manager and the swarm coordinator behind a JSON API.

mod api;
mod audit;
mod circuit_breaker;
mod config;
mod exchange;
mod kraken;
mod market;
mod mode;
mod paper;
mod risk;
mod swarm;
mod types;

use crate::api::create_router;
use crate::audit::AuditLog;
use crate::config::Config;
use crate::kraken::KrakenAdapter;
use crate::market::StaticPriceSource;
use crate::mode::TradingModeManager;
use crate::paper::{PaperSettings, PaperTradingEngine};
use crate::risk::{BasicRiskAdvisor, RiskAdvisor};
use crate::swarm::SwarmCoordinator;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across all handlers
pub struct AppState {
    pub mode_manager: Arc<TradingModeManager>,
    pub paper_engine: Arc<PaperTradingEngine>,
    pub prices: Arc<StaticPriceSource>,
    pub swarm: Arc<SwarmCoordinator>,
    pub audit: Arc<AuditLog>,
    pub risk: Option<Arc<dyn RiskAdvisor>>,
    pub started_at: Instant,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Starting trading execution core");

    let config = Config::from_env();

    // Core components
    let prices = Arc::new(StaticPriceSource::new());
    let paper_engine = Arc::new(PaperTradingEngine::new(
        prices.clone(),
        PaperSettings {
            starting_balances: config.paper_starting_balances.clone(),
            fee_rate: config.paper_fee_rate,
        },
    ));
    let audit = Arc::new(AuditLog::new());
    let mode_manager = Arc::new(TradingModeManager::new(
        paper_engine.clone(),
        audit.clone(),
        config.breaker.clone(),
    ));
    let swarm = Arc::new(SwarmCoordinator::new());

    // A live Kraken connection applies to every user of this deployment;
    // per-user credential management lives outside this core
    if config.has_kraken_credentials() {
        let kraken = Arc::new(KrakenAdapter::new(
            config.kraken_api_key.clone(),
            config.kraken_api_secret.clone(),
            config.kraken_testnet,
        )?);
        let default_user = std::env::var("LIVE_USER_ID").unwrap_or_else(|_| "default".to_string());
        mode_manager.configure_live_adapter(&default_user, kraken);
        info!("Kraken live adapter configured for user '{}'", default_user);
    } else {
        info!("No Kraken credentials; running paper-only");
    }

    let risk: Option<Arc<dyn RiskAdvisor>> = if config.risk_advisor_enabled {
        info!("Risk advisory enabled (profile-driven, fail-open)");
        Some(Arc::new(BasicRiskAdvisor::default()))
    } else {
        None
    };

    let state = Arc::new(AppState {
        mode_manager,
        paper_engine,
        prices,
        swarm,
        audit,
        risk,
        started_at: Instant::now(),
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting API server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
