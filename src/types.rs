//! Type definitions for the execution core
//! Shared across the paper engine, live adapters and the mode manager
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Symbols
// ============================================================================

/// Split a canonical "BASE/QUOTE" symbol into its two currencies.
/// Venue-internal pair ids (e.g. Kraken's "XXBTZUSD") never appear here -
/// translation is an adapter concern.
pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    let (base, quote) = symbol.split_once('/')?;
    if base.is_empty() || quote.is_empty() {
        return None;
    }
    Some((base, quote))
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::StopLoss => write!(f, "stop_loss"),
            OrderType::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// Order lifecycle: pending -> filled | rejected | cancelled.
/// Terminal states never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// Parameters for placing an order, as accepted at the adapter boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: f64,
    /// Limit/trigger price. For market orders an optional reference price;
    /// when absent the fill price comes from the price source.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub filled_quantity: f64,
    pub average_price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable fill record, appended exactly once per completed fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub fee: f64,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Ledger
// ============================================================================

/// Per-asset balance for one account
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Balance {
    pub available: f64,
    pub locked: f64,
}

impl Balance {
    pub fn total(&self) -> f64 {
        self.available + self.locked
    }
}

/// Per-symbol aggregate position, updated incrementally on every fill
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub total_cost: f64,
}

impl Position {
    pub fn average_price(&self) -> f64 {
        if self.quantity > 0.0 {
            self.total_cost / self.quantity
        } else {
            0.0
        }
    }
}

// ============================================================================
// Market data
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
    pub volume_24h: f64,
    pub timestamp: DateTime<Utc>,
}

/// Order book level (price + quantity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: f64,
    pub qty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<OrderBookLevel>,
    pub asks: Vec<OrderBookLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }
}

/// One OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

// ============================================================================
// Venue metadata
// ============================================================================

/// Maker/taker fee rates as decimals (0.0026 = 0.26%)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradingFees {
    pub maker: f64,
    pub taker: f64,
}

/// Venue order limits for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolLimits {
    pub symbol: String,
    pub min_quantity: f64,
    pub max_quantity: f64,
    pub min_price: f64,
    pub min_notional: f64,
}

/// Pre-trade cost breakdown for an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCost {
    pub notional: f64,
    pub fee: f64,
    pub total: f64,
    pub fee_rate: f64,
}

/// Structured parameter-validation outcome. A failed validation is an
/// expected result, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderValidation {
    pub valid: bool,
    pub error: Option<String>,
}

impl OrderValidation {
    pub fn ok() -> Self {
        Self { valid: true, error: None }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self { valid: false, error: Some(reason.into()) }
    }
}

// ============================================================================
// Trading mode
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Paper,
    Live,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Paper => write!(f, "paper"),
            TradingMode::Live => write!(f, "live"),
        }
    }
}

/// Per-user mode state. Every unseen user starts in paper mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingModeState {
    pub mode: TradingMode,
    pub started_at: DateTime<Utc>,
}

impl Default for TradingModeState {
    fn default() -> Self {
        Self { mode: TradingMode::Paper, started_at: Utc::now() }
    }
}

/// Explicit confirmation required for switching into live mode.
/// The password is consumed by the gate check and never stored.
#[derive(Clone, Default, Deserialize)]
pub struct LiveModeConfirmation {
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub risk_acknowledgement: String,
}

// Manual Debug keeps the password out of log output
impl std::fmt::Debug for LiveModeConfirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveModeConfirmation")
            .field("confirmed", &self.confirmed)
            .field("password", &"<redacted>")
            .field("risk_acknowledgement", &self.risk_acknowledgement)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeStatus {
    pub mode: TradingMode,
    pub is_live: bool,
    pub can_switch_to_live: bool,
    pub mode_started_at: DateTime<Utc>,
}

// ============================================================================
// Agent actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Strategy,
    Risk,
    Sentiment,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Order,
    Alert,
    Noop,
}

/// One agent's proposed action for a coordination cycle. Ephemeral -
/// consumed by the coordinator, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAction {
    pub id: String,
    pub agent_id: String,
    pub role: AgentRole,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    pub confidence: Option<f64>,
    pub size: Option<f64>,
    pub reason: Option<String>,
}

/// Recorded whenever two or more agents propose opposite sides on one
/// symbol within a single coordination cycle
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub symbol: String,
    pub sides: Vec<OrderSide>,
    pub agent_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_symbol_canonical_form() {
        assert_eq!(split_symbol("BTC/USDT"), Some(("BTC", "USDT")));
        assert_eq!(split_symbol("ETH/USD"), Some(("ETH", "USD")));
        assert_eq!(split_symbol("BTCUSDT"), None);
        assert_eq!(split_symbol("/USDT"), None);
        assert_eq!(split_symbol("BTC/"), None);
    }

    #[test]
    fn terminal_order_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn position_average_price() {
        let pos = Position {
            symbol: "BTC/USDT".to_string(),
            quantity: 0.3,
            total_cost: 0.1 * 45000.0 + 0.2 * 46500.0,
        };
        let expected = (0.1 * 45000.0 + 0.2 * 46500.0) / 0.3;
        assert!((pos.average_price() - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_position_has_zero_average() {
        let pos = Position { symbol: "BTC/USDT".to_string(), quantity: 0.0, total_cost: 0.0 };
        assert_eq!(pos.average_price(), 0.0);
    }
}
