//! Exchange adapter contract
//!
//! Uniform interface every venue integration implements - the in-process
//! paper engine and real venues alike. Adapters normalize market data and
//! order operations so nothing above this boundary knows venue wire formats:
//! numeric fields arrive as already-parsed numbers and symbols are always
//! the canonical "BASE/QUOTE" form.

use crate::types::{
    Balance, Candle, Order, OrderBook, OrderCost, OrderParams, OrderValidation, SymbolLimits,
    Ticker, TradingFees,
};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by exchange adapters
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),
    #[error("Insufficient {asset}: required {required:.8}, available {available:.8}")]
    InsufficientFunds {
        asset: String,
        required: f64,
        available: f64,
    },
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Order {id} is {status} and can no longer be cancelled")]
    OrderNotCancellable { id: String, status: String },
    #[error("No price available for {0}")]
    PriceUnavailable(String),
    #[error("Ledger invariant violated: {0}")]
    LedgerInvariant(String),
    #[error("Venue API error: {0}")]
    Api(String),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Failed to parse venue response: {0}")]
    Parse(String),
    #[error("Operation not supported by this venue: {0}")]
    NotSupported(&'static str),
}

/// Capability interface for one venue connection / account.
///
/// One instance is bound to one account: the paper engine hands out
/// per-user handles, a live adapter is constructed per credential set.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// Venue name for logging and audit entries
    fn name(&self) -> &str;

    /// True for the paper engine and for testnet/sandbox venues.
    /// The mode manager refuses to route live traffic to a simulated venue.
    fn is_simulated(&self) -> bool;

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError>;

    async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBook, ExchangeError>;

    async fn get_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError>;

    async fn get_symbols(&self) -> Result<Vec<String>, ExchangeError>;

    async fn get_balance(&self) -> Result<HashMap<String, Balance>, ExchangeError>;

    async fn get_trading_fees(&self) -> Result<TradingFees, ExchangeError>;

    async fn get_symbol_limits(&self, symbol: &str) -> Result<SymbolLimits, ExchangeError>;

    /// Check order parameters against venue limits. Rejections are expected
    /// outcomes and come back as `OrderValidation { valid: false, .. }`;
    /// an `Err` means the check itself could not run.
    async fn validate_order_params(
        &self,
        params: &OrderParams,
    ) -> Result<OrderValidation, ExchangeError>;

    async fn calculate_order_cost(&self, params: &OrderParams) -> Result<OrderCost, ExchangeError>;

    async fn create_order(&self, params: &OrderParams) -> Result<Order, ExchangeError>;

    async fn cancel_order(&self, order_id: &str) -> Result<Order, ExchangeError>;
}

/// Shared limit checks used by every adapter. `price` is the effective
/// price for the notional check (limit price, or a reference price the
/// adapter resolved for a market order).
pub fn check_order_limits(
    params: &OrderParams,
    limits: &SymbolLimits,
    price: Option<f64>,
) -> OrderValidation {
    if params.quantity <= 0.0 {
        return OrderValidation::rejected("quantity must be positive");
    }
    if params.quantity < limits.min_quantity {
        return OrderValidation::rejected(format!(
            "quantity {} below venue minimum {}",
            params.quantity, limits.min_quantity
        ));
    }
    if limits.max_quantity > 0.0 && params.quantity > limits.max_quantity {
        return OrderValidation::rejected(format!(
            "quantity {} above venue maximum {}",
            params.quantity, limits.max_quantity
        ));
    }
    if let Some(px) = price {
        if px < limits.min_price {
            return OrderValidation::rejected(format!(
                "price {} below venue minimum {}",
                px, limits.min_price
            ));
        }
        let notional = params.quantity * px;
        if notional < limits.min_notional {
            return OrderValidation::rejected(format!(
                "notional {:.8} below venue minimum {}",
                notional, limits.min_notional
            ));
        }
    }
    OrderValidation::ok()
}
