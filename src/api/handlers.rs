//! API request handlers
//!
//! All endpoint handlers for the execution core API.

use crate::circuit_breaker::CircuitBreakerError;
use crate::exchange::ExchangeError;
use crate::market::PriceSource;
use crate::mode::ModeError;
use crate::swarm::CoordinationContext;
use crate::types::{LiveModeConfirmation, OrderParams, OrderSide, OrderType, TradingMode};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

// ==========================================
// Response Helpers
// ==========================================

pub fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "success": false,
            "error": error
        })),
    )
        .into_response()
}

pub fn bad_request(error: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, error)
}

fn exchange_error_status(e: &ExchangeError) -> StatusCode {
    match e {
        ExchangeError::InvalidOrder(_)
        | ExchangeError::InsufficientFunds { .. }
        | ExchangeError::UnknownSymbol(_)
        | ExchangeError::PriceUnavailable(_)
        | ExchangeError::OrderNotCancellable { .. } => StatusCode::BAD_REQUEST,
        ExchangeError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        ExchangeError::NotSupported(_) => StatusCode::NOT_IMPLEMENTED,
        ExchangeError::LedgerInvariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ExchangeError::Api(_) | ExchangeError::Request(_) | ExchangeError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

/// Map core errors onto HTTP statuses: safety gates are caller-correctable
/// (400), reliability failures are upstream problems (502/503/504)
fn mode_error_response(e: &ModeError) -> Response {
    let status = match e {
        ModeError::NoExchangeConfigured(_)
        | ModeError::LiveAdapterMissing
        | ModeError::SimulatedVenue(_)
        | ModeError::ConfirmationRequired
        | ModeError::PasswordRequired
        | ModeError::AcknowledgementRequired => StatusCode::BAD_REQUEST,
        ModeError::Exchange(inner) => exchange_error_status(inner),
        ModeError::Breaker(CircuitBreakerError::Open(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ModeError::Breaker(CircuitBreakerError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        ModeError::Breaker(CircuitBreakerError::Inner(inner)) => exchange_error_status(inner),
    };
    error_response(status, &e.to_string())
}

// ==========================================
// Request Types
// ==========================================

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerQuery {
    pub user_id: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type", default = "default_order_type")]
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
}

fn default_order_type() -> OrderType {
    OrderType::Market
}

impl CreateOrderRequest {
    fn params(&self) -> OrderParams {
        OrderParams {
            symbol: self.symbol.clone(),
            side: self.side,
            order_type: self.order_type,
            quantity: self.quantity,
            price: self.price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SwitchModeRequest {
    pub user_id: String,
    pub mode: TradingMode,
    pub confirmation: Option<LiveModeConfirmation>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPriceRequest {
    pub symbol: String,
    pub price: f64,
}

#[derive(Debug, Deserialize, Default)]
pub struct CoordinateRequest {
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub portfolio_value: f64,
}

// ==========================================
// Status & Health
// ==========================================

pub async fn health_check() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({
        "success": true,
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "paper_fills": state.paper_engine.fill_count(),
        "paper_rejections": state.paper_engine.rejection_count(),
        "registered_agents": state.swarm.agent_count(),
        "audit_entries": state.audit.len(),
    }))
    .into_response()
}

// ==========================================
// Orders
// ==========================================

/// Optional pre-routing risk consult. Advisory only: an unavailable
/// advisor fails open, a denial is surfaced to the caller.
async fn risk_gate(state: &AppState, req: &CreateOrderRequest) -> Result<(), Response> {
    let Some(advisor) = &state.risk else {
        return Ok(());
    };

    let price = match req.price {
        Some(p) => p,
        None => match state.prices.last_price(&req.symbol).await {
            Ok(p) => p,
            // No reference price: nothing to evaluate, let routing decide
            Err(_) => return Ok(()),
        },
    };
    let position_value = req.quantity * price;
    let Some((_, quote)) = crate::types::split_symbol(&req.symbol) else {
        // Routing will reject the malformed symbol with a proper error
        return Ok(());
    };

    // Portfolio valued in the order's quote currency: free quote balance
    // plus the cost basis of open positions
    let positions = state.paper_engine.positions(&req.user_id);
    let portfolio_value = match state.mode_manager.get_balances(&req.user_id).await {
        Ok(balances) => {
            balances.get(quote).map(|b| b.total()).unwrap_or(0.0)
                + positions.iter().map(|p| p.total_cost).sum::<f64>()
        }
        Err(e) => {
            warn!("Risk consult skipped, balances unavailable: {}", e);
            return Ok(());
        }
    };

    match advisor
        .check_position(
            &req.user_id,
            position_value,
            portfolio_value,
            positions.len() as u32,
            1.0,
        )
        .await
    {
        Ok(decision) if !decision.allowed => Err(bad_request(
            &decision.reason.unwrap_or_else(|| "position rejected by risk policy".to_string()),
        )),
        Ok(_) => Ok(()),
        Err(e) => {
            // Fail open: the advisory service being down must not block
            // order flow
            warn!("Risk advisory unavailable, failing open: {}", e);
            Ok(())
        }
    }
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    if req.quantity <= 0.0 {
        return bad_request("quantity must be positive");
    }
    if let Err(denied) = risk_gate(&state, &req).await {
        return denied;
    }

    match state.mode_manager.create_order(&req.user_id, &req.params()).await {
        Ok(routed) => Json(serde_json::json!({
            "success": true,
            "order": routed.order,
            "mode": routed.mode,
            "warning": routed.warning,
        }))
        .into_response(),
        Err(e) => mode_error_response(&e),
    }
}

pub async fn preview_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    match state.mode_manager.preview_order(&req.user_id, &req.params()).await {
        Ok(preview) => Json(serde_json::json!({
            "success": true,
            "validation": preview.validation,
            "cost": preview.cost,
        }))
        .into_response(),
        Err(e) => mode_error_response(&e),
    }
}

pub async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Query(query): Query<UserQuery>,
) -> Response {
    match state.mode_manager.cancel_order(&query.user_id, &order_id).await {
        Ok(order) => {
            Json(serde_json::json!({ "success": true, "order": order })).into_response()
        }
        Err(e) => mode_error_response(&e),
    }
}

pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    let orders = state.paper_engine.orders(&query.user_id);
    Json(serde_json::json!({ "success": true, "orders": orders })).into_response()
}

// ==========================================
// Account
// ==========================================

pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    match state.mode_manager.get_balances(&query.user_id).await {
        Ok(balances) => {
            Json(serde_json::json!({ "success": true, "balances": balances })).into_response()
        }
        Err(e) => mode_error_response(&e),
    }
}

pub async fn get_positions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    let positions = state.paper_engine.positions(&query.user_id);
    Json(serde_json::json!({ "success": true, "positions": positions })).into_response()
}

pub async fn get_trades(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    let trades = state.paper_engine.trades(&query.user_id);
    Json(serde_json::json!({ "success": true, "trades": trades })).into_response()
}

pub async fn get_account_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    let summary = state.paper_engine.account_summary(&query.user_id);
    Json(serde_json::json!({ "success": true, "account": summary })).into_response()
}

pub async fn reset_paper_account(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Response {
    state.paper_engine.reset_account(&req.user_id);
    Json(serde_json::json!({ "success": true })).into_response()
}

pub async fn get_paper_settings(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({ "success": true, "settings": state.paper_engine.settings() }))
        .into_response()
}

/// Applies to accounts seeded after the update; existing ledgers keep
/// their balances until reset
pub async fn update_paper_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<crate::paper::PaperSettings>,
) -> Response {
    if settings.fee_rate < 0.0 || settings.fee_rate >= 1.0 {
        return bad_request("fee_rate must be in [0, 1)");
    }
    if settings.starting_balances.values().any(|v| *v < 0.0) {
        return bad_request("seed balances must be non-negative");
    }
    state.paper_engine.update_settings(settings);
    Json(serde_json::json!({ "success": true })).into_response()
}

// ==========================================
// Trading Mode
// ==========================================

pub async fn get_mode_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    let status = state.mode_manager.get_mode_status(&query.user_id);
    Json(serde_json::json!({ "success": true, "status": status })).into_response()
}

pub async fn switch_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SwitchModeRequest>,
) -> Response {
    match state
        .mode_manager
        .switch_mode(&req.user_id, req.mode, req.confirmation.as_ref())
    {
        Ok(mode_state) => Json(serde_json::json!({
            "success": true,
            "mode": mode_state.mode,
            "started_at": mode_state.started_at,
        }))
        .into_response(),
        Err(e) => mode_error_response(&e),
    }
}

pub async fn get_circuit_breaker(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserQuery>,
) -> Response {
    match state.mode_manager.breaker_stats(&query.user_id) {
        Some(stats) => {
            Json(serde_json::json!({ "success": true, "circuit_breaker": stats })).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            "no live exchange connection configured for this user",
        ),
    }
}

// ==========================================
// Market Data
// ==========================================

pub async fn get_ticker(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TickerQuery>,
) -> Response {
    match state.mode_manager.get_ticker(&query.user_id, &query.symbol).await {
        Ok(ticker) => {
            Json(serde_json::json!({ "success": true, "ticker": ticker })).into_response()
        }
        Err(e) => mode_error_response(&e),
    }
}

pub async fn set_price(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SetPriceRequest>,
) -> Response {
    if req.price <= 0.0 || !req.price.is_finite() {
        return bad_request("price must be a positive number");
    }
    if crate::types::split_symbol(&req.symbol).is_none() {
        return bad_request("symbol must be in BASE/QUOTE form");
    }
    state.prices.set_price(&req.symbol, req.price);
    Json(serde_json::json!({ "success": true })).into_response()
}

// ==========================================
// Swarm Coordination
// ==========================================

pub async fn coordinate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CoordinateRequest>,
) -> Response {
    let mut prices = HashMap::new();
    for symbol in &req.symbols {
        if let Ok(price) = state.prices.last_price(symbol).await {
            prices.insert(symbol.clone(), price);
        }
    }
    let ctx = CoordinationContext {
        symbols: req.symbols,
        prices,
        portfolio_value: req.portfolio_value,
    };

    let result = state.swarm.coordinate(&ctx).await;
    Json(serde_json::json!({
        "success": true,
        "actions": result.actions,
        "conflicts": result.conflicts,
    }))
    .into_response()
}

pub async fn get_swarm_status(State(state): State<Arc<AppState>>) -> Response {
    Json(serde_json::json!({
        "success": true,
        "registered_agents": state.swarm.agent_count(),
    }))
    .into_response()
}

// ==========================================
// Audit
// ==========================================

pub async fn get_audit_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuditQuery>,
) -> Response {
    let entries = match &query.user_id {
        Some(user_id) => state.audit.entries_for(user_id),
        None => state.audit.entries(),
    };
    Json(serde_json::json!({ "success": true, "entries": entries })).into_response()
}
