//! API module - Axum HTTP server and routes
//!
//! Thin JSON glue over the execution core. No authentication or dashboard
//! concerns here - those live in front of this service.

mod handlers;

use crate::AppState;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ==========================================
        // Status & Health
        // ==========================================
        .route("/api/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))
        // ==========================================
        // Orders
        // ==========================================
        .route("/api/orders", post(handlers::create_order))
        .route("/api/orders", get(handlers::get_orders))
        .route("/api/orders/preview", post(handlers::preview_order))
        .route("/api/orders/:order_id", delete(handlers::cancel_order))
        // ==========================================
        // Account
        // ==========================================
        .route("/api/balances", get(handlers::get_balances))
        .route("/api/positions", get(handlers::get_positions))
        .route("/api/trades", get(handlers::get_trades))
        .route("/api/account/summary", get(handlers::get_account_summary))
        .route("/api/paper/reset", post(handlers::reset_paper_account))
        .route("/api/paper/settings", get(handlers::get_paper_settings))
        .route("/api/paper/settings", put(handlers::update_paper_settings))
        // ==========================================
        // Trading Mode
        // ==========================================
        .route("/api/mode/status", get(handlers::get_mode_status))
        .route("/api/mode/switch", post(handlers::switch_mode))
        .route("/api/mode/circuit-breaker", get(handlers::get_circuit_breaker))
        // ==========================================
        // Market Data
        // ==========================================
        .route("/api/market/ticker", get(handlers::get_ticker))
        .route("/api/market/prices", post(handlers::set_price))
        // ==========================================
        // Swarm Coordination
        // ==========================================
        .route("/api/swarm/coordinate", post(handlers::coordinate))
        .route("/api/swarm/status", get(handlers::get_swarm_status))
        // ==========================================
        // Audit
        // ==========================================
        .route("/api/audit", get(handlers::get_audit_log))
        // Apply middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
