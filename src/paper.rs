//! Paper trading engine
//!
//! In-memory ledger satisfying the exchange adapter contract with simulated
//! fills - no network calls. Every user gets an isolated account, lazily
//! seeded with the configured starting allocation on first access.
//!
//! Market orders execute synchronously under the account lock: notional and
//! fee are computed, the paying asset is checked, and only then are
//! balances, position and order/trade records mutated together. Two
//! concurrent submissions can never both pass the sufficiency check against
//! the same stale balance.

use crate::exchange::{check_order_limits, ExchangeAdapter, ExchangeError};
use crate::market::PriceSource;
use crate::types::{
    split_symbol, Balance, Candle, Order, OrderBook, OrderBookLevel, OrderCost, OrderParams,
    OrderSide, OrderStatus, OrderType, OrderValidation, Position, SymbolLimits, Ticker, Trade,
    TradingFees,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Residual position quantity below this is treated as fully closed
const POSITION_EPSILON: f64 = 1e-12;

/// Runtime-tunable paper engine settings
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PaperSettings {
    /// Seed balances granted to every new account, keyed by asset
    pub starting_balances: HashMap<String, f64>,
    /// Taker fee charged on simulated fills (decimal, 0.001 = 0.1%)
    pub fee_rate: f64,
}

impl Default for PaperSettings {
    fn default() -> Self {
        let mut starting_balances = HashMap::new();
        starting_balances.insert("USDT".to_string(), 100_000.0);
        Self { starting_balances, fee_rate: 0.0 }
    }
}

/// One user's isolated ledger. Only ever mutated under its mutex.
#[derive(Debug, Default)]
struct PaperAccount {
    balances: HashMap<String, Balance>,
    orders: Vec<Order>,
    trades: Vec<Trade>,
    positions: HashMap<String, Position>,
}

impl PaperAccount {
    fn seeded(settings: &PaperSettings) -> Self {
        let balances = settings
            .starting_balances
            .iter()
            .map(|(asset, amount)| {
                (asset.clone(), Balance { available: *amount, locked: 0.0 })
            })
            .collect();
        Self { balances, ..Default::default() }
    }
}

/// Read-only account snapshot for status endpoints
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountSummary {
    pub user_id: String,
    pub balances: HashMap<String, Balance>,
    pub positions: Vec<Position>,
    pub open_orders: usize,
    pub total_orders: usize,
    pub total_trades: usize,
}

/// Shared simulated ledger, one account per user
pub struct PaperTradingEngine {
    accounts: DashMap<String, Arc<Mutex<PaperAccount>>>,
    prices: Arc<dyn PriceSource>,
    settings: RwLock<PaperSettings>,

    // Statistics
    orders_filled: AtomicU64,
    orders_rejected: AtomicU64,
}

impl PaperTradingEngine {
    pub fn new(prices: Arc<dyn PriceSource>, settings: PaperSettings) -> Self {
        info!(
            "Paper engine initialized: seed={:?}, fee_rate={:.4}%",
            settings.starting_balances,
            settings.fee_rate * 100.0
        );
        Self {
            accounts: DashMap::new(),
            prices,
            settings: RwLock::new(settings),
            orders_filled: AtomicU64::new(0),
            orders_rejected: AtomicU64::new(0),
        }
    }

    /// Get-or-create accessor; seeding happens on first touch
    fn account(&self, user_id: &str) -> Arc<Mutex<PaperAccount>> {
        self.accounts
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!("Seeding paper account for user {}", user_id);
                Arc::new(Mutex::new(PaperAccount::seeded(&self.settings.read())))
            })
            .clone()
    }

    pub fn settings(&self) -> PaperSettings {
        self.settings.read().clone()
    }

    pub fn update_settings(&self, settings: PaperSettings) {
        info!(
            "Paper settings updated: seed={:?}, fee_rate={:.4}%",
            settings.starting_balances,
            settings.fee_rate * 100.0
        );
        *self.settings.write() = settings;
    }

    /// Simulator-side venue limits: permissive, but enough to exercise the
    /// shared validation path
    fn limits_for(symbol: &str) -> SymbolLimits {
        SymbolLimits {
            symbol: symbol.to_string(),
            min_quantity: 1e-8,
            max_quantity: 0.0, // unlimited
            min_price: 0.0,
            min_notional: 0.0,
        }
    }

    /// Resolve the fill/reference price for an order: explicit price wins,
    /// otherwise the market-data collaborator supplies the last trade price.
    async fn resolve_price(&self, params: &OrderParams) -> Result<f64, ExchangeError> {
        if let Some(price) = params.price {
            return Ok(price);
        }
        self.prices.last_price(&params.symbol).await
    }

    pub async fn create_order(
        &self,
        user_id: &str,
        params: &OrderParams,
    ) -> Result<Order, ExchangeError> {
        let (base, quote) = split_symbol(&params.symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(params.symbol.clone()))?;

        if params.order_type != OrderType::Market && params.price.is_none() {
            return Err(ExchangeError::InvalidOrder(format!(
                "{} order requires a price",
                params.order_type
            )));
        }

        // Price resolution awaits the market-data boundary, so it happens
        // before the account lock is taken.
        let price = self.resolve_price(params).await?;

        let validation = check_order_limits(params, &Self::limits_for(&params.symbol), Some(price));
        if !validation.valid {
            return Err(ExchangeError::InvalidOrder(
                validation.error.unwrap_or_else(|| "order rejected".to_string()),
            ));
        }

        let fee_rate = self.settings.read().fee_rate;
        let account = self.account(user_id);
        let mut acct = account.lock();

        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            symbol: params.symbol.to_string(),
            side: params.side,
            order_type: params.order_type,
            quantity: params.quantity,
            price: params.price,
            status: OrderStatus::Pending,
            filled_quantity: 0.0,
            average_price: 0.0,
            created_at: now,
            updated_at: now,
        };

        if params.order_type != OrderType::Market {
            // Resting orders are stored pending; settlement is out of scope
            debug!(
                "Paper {} order {} resting: {} {} {} @ {:?}",
                order.order_type, order.id, order.side, order.quantity, order.symbol, order.price
            );
            acct.orders.push(order.clone());
            return Ok(order);
        }

        let notional = params.quantity * price;
        let fee = notional * fee_rate;

        // Sufficiency check and settlement are one critical section
        let (paying_asset, required) = match params.side {
            OrderSide::Buy => (quote, notional + fee),
            OrderSide::Sell => (base, params.quantity),
        };
        let available = acct
            .balances
            .get(paying_asset)
            .map(|b| b.available)
            .unwrap_or(0.0);

        if available < required {
            order.status = OrderStatus::Rejected;
            order.updated_at = Utc::now();
            // The rejected order still exists for audit/history
            acct.orders.push(order);
            self.orders_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Paper order rejected for {}: insufficient {} ({} < {})",
                user_id, paying_asset, available, required
            );
            return Err(ExchangeError::InsufficientFunds {
                asset: paying_asset.to_string(),
                required,
                available,
            });
        }

        Self::settle_market_order(&mut acct, &mut order, base, quote, price, notional, fee)?;

        let trade = Trade {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            fee,
            timestamp: order.updated_at,
        };
        acct.trades.push(trade);
        acct.orders.push(order.clone());
        self.orders_filled.fetch_add(1, Ordering::Relaxed);

        info!(
            "Paper fill for {}: {} {} {} @ {} (fee {:.8})",
            user_id, order.side, order.quantity, order.symbol, price, fee
        );
        Ok(order)
    }

    /// Mutate balances and position for one market fill. Runs under the
    /// account lock, after the sufficiency check passed.
    fn settle_market_order(
        acct: &mut PaperAccount,
        order: &mut Order,
        base: &str,
        quote: &str,
        price: f64,
        notional: f64,
        fee: f64,
    ) -> Result<(), ExchangeError> {
        match order.side {
            OrderSide::Buy => {
                let quote_balance = acct.balances.entry(quote.to_string()).or_default();
                quote_balance.available -= notional + fee;
                if quote_balance.available < 0.0 {
                    // The sufficiency check passed, so this is a ledger bug -
                    // abort the operation rather than clamp it away.
                    return Err(ExchangeError::LedgerInvariant(format!(
                        "{} balance would go negative ({})",
                        quote, quote_balance.available
                    )));
                }
                acct.balances.entry(base.to_string()).or_default().available += order.quantity;

                let position = acct
                    .positions
                    .entry(order.symbol.clone())
                    .or_insert_with(|| Position {
                        symbol: order.symbol.clone(),
                        quantity: 0.0,
                        total_cost: 0.0,
                    });
                position.quantity += order.quantity;
                position.total_cost += notional;
            }
            OrderSide::Sell => {
                let base_balance = acct.balances.entry(base.to_string()).or_default();
                base_balance.available -= order.quantity;
                if base_balance.available < 0.0 {
                    return Err(ExchangeError::LedgerInvariant(format!(
                        "{} balance would go negative ({})",
                        base, base_balance.available
                    )));
                }
                acct.balances.entry(quote.to_string()).or_default().available += notional - fee;

                // Reduce the position at its current average cost; the cost
                // basis of remaining units is unchanged by a sale.
                if let Some(position) = acct.positions.get_mut(&order.symbol) {
                    let closed = order.quantity.min(position.quantity);
                    let avg_entry = position.average_price();
                    position.total_cost -= closed * avg_entry;
                    position.quantity -= closed;
                    if position.quantity <= POSITION_EPSILON {
                        acct.positions.remove(&order.symbol);
                    }
                }
            }
        }

        order.status = OrderStatus::Filled;
        order.filled_quantity = order.quantity;
        order.average_price = price;
        order.updated_at = Utc::now();
        Ok(())
    }

    pub fn cancel_order(&self, user_id: &str, order_id: &str) -> Result<Order, ExchangeError> {
        let account = self.account(user_id);
        let mut acct = account.lock();
        let order = acct
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;

        if order.status.is_terminal() {
            return Err(ExchangeError::OrderNotCancellable {
                id: order.id.clone(),
                status: format!("{:?}", order.status).to_lowercase(),
            });
        }

        order.status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        info!("Paper order {} cancelled for {}", order_id, user_id);
        Ok(order.clone())
    }

    /// Full wipe-and-reseed for one user. Idempotent; in-flight orders
    /// serialize against the same account lock.
    pub fn reset_account(&self, user_id: &str) {
        let settings = self.settings.read().clone();
        let account = self.account(user_id);
        *account.lock() = PaperAccount::seeded(&settings);
        info!("Paper account reset for {}", user_id);
    }

    pub fn balances(&self, user_id: &str) -> HashMap<String, Balance> {
        self.account(user_id).lock().balances.clone()
    }

    pub fn orders(&self, user_id: &str) -> Vec<Order> {
        self.account(user_id).lock().orders.clone()
    }

    pub fn trades(&self, user_id: &str) -> Vec<Trade> {
        self.account(user_id).lock().trades.clone()
    }

    pub fn positions(&self, user_id: &str) -> Vec<Position> {
        self.account(user_id).lock().positions.values().cloned().collect()
    }

    pub fn account_summary(&self, user_id: &str) -> AccountSummary {
        let account = self.account(user_id);
        let acct = account.lock();
        AccountSummary {
            user_id: user_id.to_string(),
            balances: acct.balances.clone(),
            positions: acct.positions.values().cloned().collect(),
            open_orders: acct
                .orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            total_orders: acct.orders.len(),
            total_trades: acct.trades.len(),
        }
    }

    pub fn fill_count(&self) -> u64 {
        self.orders_filled.load(Ordering::Relaxed)
    }

    pub fn rejection_count(&self) -> u64 {
        self.orders_rejected.load(Ordering::Relaxed)
    }
}

/// Per-user adapter handle over the shared paper engine. The mode manager
/// hands one of these to each user as their simulated venue.
pub struct PaperExchange {
    engine: Arc<PaperTradingEngine>,
    user_id: String,
}

impl PaperExchange {
    pub fn new(engine: Arc<PaperTradingEngine>, user_id: impl Into<String>) -> Self {
        Self { engine, user_id: user_id.into() }
    }
}

#[async_trait]
impl ExchangeAdapter for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    fn is_simulated(&self) -> bool {
        true
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let last = self.engine.prices.last_price(symbol).await?;
        Ok(Ticker {
            symbol: symbol.to_string(),
            bid: last,
            ask: last,
            last,
            volume_24h: 0.0,
            timestamp: Utc::now(),
        })
    }

    async fn get_order_book(&self, symbol: &str, _depth: usize) -> Result<OrderBook, ExchangeError> {
        // Single synthetic level on each side; the simulator fills at the
        // last price and does not model depth
        let last = self.engine.prices.last_price(symbol).await?;
        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids: vec![OrderBookLevel { price: last, qty: f64::MAX }],
            asks: vec![OrderBookLevel { price: last, qty: f64::MAX }],
            timestamp: Utc::now(),
        })
    }

    async fn get_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _limit: usize,
    ) -> Result<Vec<Candle>, ExchangeError> {
        Err(ExchangeError::NotSupported("candle history is not simulated"))
    }

    async fn get_symbols(&self) -> Result<Vec<String>, ExchangeError> {
        let mut symbols = self.engine.prices.symbols();
        symbols.sort();
        Ok(symbols)
    }

    async fn get_balance(&self) -> Result<HashMap<String, Balance>, ExchangeError> {
        Ok(self.engine.balances(&self.user_id))
    }

    async fn get_trading_fees(&self) -> Result<TradingFees, ExchangeError> {
        let rate = self.engine.settings.read().fee_rate;
        Ok(TradingFees { maker: rate, taker: rate })
    }

    async fn get_symbol_limits(&self, symbol: &str) -> Result<SymbolLimits, ExchangeError> {
        Ok(PaperTradingEngine::limits_for(symbol))
    }

    async fn validate_order_params(
        &self,
        params: &OrderParams,
    ) -> Result<OrderValidation, ExchangeError> {
        let price = match self.engine.resolve_price(params).await {
            Ok(price) => Some(price),
            Err(ExchangeError::PriceUnavailable(_)) => None,
            Err(e) => return Err(e),
        };
        if params.order_type == OrderType::Market && price.is_none() {
            return Ok(OrderValidation::rejected(format!(
                "no reference price available for {}",
                params.symbol
            )));
        }
        Ok(check_order_limits(
            params,
            &PaperTradingEngine::limits_for(&params.symbol),
            price,
        ))
    }

    async fn calculate_order_cost(&self, params: &OrderParams) -> Result<OrderCost, ExchangeError> {
        let price = self.engine.resolve_price(params).await?;
        let fee_rate = self.engine.settings.read().fee_rate;
        let notional = params.quantity * price;
        let fee = notional * fee_rate;
        let total = match params.side {
            OrderSide::Buy => notional + fee,
            OrderSide::Sell => notional - fee,
        };
        Ok(OrderCost { notional, fee, total, fee_rate })
    }

    async fn create_order(&self, params: &OrderParams) -> Result<Order, ExchangeError> {
        self.engine.create_order(&self.user_id, params).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<Order, ExchangeError> {
        self.engine.cancel_order(&self.user_id, order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticPriceSource;

    fn engine() -> (Arc<PaperTradingEngine>, Arc<StaticPriceSource>) {
        let prices = Arc::new(StaticPriceSource::new());
        prices.set_price("BTC/USDT", 45000.0);
        prices.set_price("ETH/USDT", 3000.0);
        let engine = Arc::new(PaperTradingEngine::new(
            prices.clone(),
            PaperSettings::default(),
        ));
        (engine, prices)
    }

    fn market(symbol: &str, side: OrderSide, quantity: f64) -> OrderParams {
        OrderParams {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
        }
    }

    #[tokio::test]
    async fn market_buy_settles_balances_order_and_trade() {
        let (engine, _) = engine();
        let order = engine
            .create_order("alice", &market("BTC/USDT", OrderSide::Buy, 0.1))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, 0.1);
        assert_eq!(order.average_price, 45000.0);

        let balances = engine.balances("alice");
        assert!((balances["USDT"].available - 95_500.0).abs() < 1e-9);
        assert!((balances["BTC"].available - 0.1).abs() < 1e-12);

        let trades = engine.trades("alice");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 45000.0);
        assert_eq!(trades[0].order_id, order.id);

        let orders = engine.orders("alice");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn balance_conservation_over_buy_sell_sequence() {
        let (engine, prices) = engine();
        let start_quote = 100_000.0;

        engine
            .create_order("bob", &market("BTC/USDT", OrderSide::Buy, 0.5))
            .await
            .unwrap();
        prices.set_price("BTC/USDT", 47000.0);
        engine
            .create_order("bob", &market("BTC/USDT", OrderSide::Sell, 0.2))
            .await
            .unwrap();
        engine
            .create_order("bob", &market("BTC/USDT", OrderSide::Sell, 0.3))
            .await
            .unwrap();

        // Zero fees: quote delta must equal sell notional minus buy notional
        let expected = start_quote - 0.5 * 45000.0 + 0.2 * 47000.0 + 0.3 * 47000.0;
        let balances = engine.balances("bob");
        assert!((balances["USDT"].available - expected).abs() < 1e-6);
        assert!(balances["BTC"].available.abs() < 1e-12);
    }

    #[tokio::test]
    async fn position_average_entry_price() {
        let (engine, prices) = engine();
        engine
            .create_order("carol", &market("ETH/USDT", OrderSide::Buy, 2.0))
            .await
            .unwrap();
        prices.set_price("ETH/USDT", 3300.0);
        engine
            .create_order("carol", &market("ETH/USDT", OrderSide::Buy, 1.0))
            .await
            .unwrap();

        let positions = engine.positions("carol");
        assert_eq!(positions.len(), 1);
        let expected = (2.0 * 3000.0 + 1.0 * 3300.0) / 3.0;
        assert!((positions[0].average_price() - expected).abs() < 1e-9);
        assert!((positions[0].quantity - 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn selling_out_deletes_the_position() {
        let (engine, _) = engine();
        engine
            .create_order("dave", &market("BTC/USDT", OrderSide::Buy, 0.25))
            .await
            .unwrap();
        engine
            .create_order("dave", &market("BTC/USDT", OrderSide::Sell, 0.25))
            .await
            .unwrap();
        assert!(engine.positions("dave").is_empty());
    }

    #[tokio::test]
    async fn insufficient_funds_records_rejected_order() {
        let (engine, _) = engine();
        // 10 BTC at 45k = 450k, far beyond the 100k seed
        let err = engine
            .create_order("erin", &market("BTC/USDT", OrderSide::Buy, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InsufficientFunds { .. }));

        let orders = engine.orders("erin");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Rejected);
        assert!(engine.trades("erin").is_empty());

        // Ledger untouched by the rejection
        let balances = engine.balances("erin");
        assert!((balances["USDT"].available - 100_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn limit_orders_rest_pending_and_cancel() {
        let (engine, _) = engine();
        let params = OrderParams {
            symbol: "BTC/USDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: 0.1,
            price: Some(40000.0),
        };
        let order = engine.create_order("frank", &params).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        // Resting orders do not touch the ledger
        let balances = engine.balances("frank");
        assert!((balances["USDT"].available - 100_000.0).abs() < 1e-9);

        let cancelled = engine.cancel_order("frank", &order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // Cancelling a terminal order fails without corrupting state
        let err = engine.cancel_order("frank", &order.id).unwrap_err();
        assert!(matches!(err, ExchangeError::OrderNotCancellable { .. }));
        assert_eq!(engine.orders("frank").len(), 1);
    }

    #[tokio::test]
    async fn limit_order_without_price_is_invalid() {
        let (engine, _) = engine();
        let params = OrderParams {
            symbol: "BTC/USDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: 0.1,
            price: None,
        };
        let err = engine.create_order("gus", &params).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidOrder(_)));
    }

    #[tokio::test]
    async fn reset_account_is_idempotent() {
        let (engine, _) = engine();
        engine
            .create_order("hana", &market("BTC/USDT", OrderSide::Buy, 0.1))
            .await
            .unwrap();

        engine.reset_account("hana");
        engine.reset_account("hana");

        let balances = engine.balances("hana");
        assert!((balances["USDT"].available - 100_000.0).abs() < 1e-9);
        assert!(engine.orders("hana").is_empty());
        assert!(engine.trades("hana").is_empty());
        assert!(engine.positions("hana").is_empty());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (engine, _) = engine();
        engine
            .create_order("ivy", &market("BTC/USDT", OrderSide::Buy, 0.1))
            .await
            .unwrap();

        let other = engine.balances("jack");
        assert!((other["USDT"].available - 100_000.0).abs() < 1e-9);
        assert!(engine.orders("jack").is_empty());
    }

    #[tokio::test]
    async fn concurrent_orders_cannot_both_spend_the_same_balance() {
        let (engine, prices) = engine();
        // Two concurrent buys of 60k notional each against a 100k balance:
        // exactly one must pass the sufficiency check.
        prices.set_price("BTC/USDT", 60_000.0);

        let e1 = engine.clone();
        let e2 = engine.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move {
                e1.create_order("kim", &market("BTC/USDT", OrderSide::Buy, 1.0))
                    .await
            }),
            tokio::spawn(async move {
                e2.create_order("kim", &market("BTC/USDT", OrderSide::Buy, 1.0))
                    .await
            }),
        );

        let outcomes = [r1.unwrap(), r2.unwrap()];
        let filled = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(filled, 1, "only one of two conflicting orders may fill");

        let balances = engine.balances("kim");
        assert!((balances["USDT"].available - 40_000.0).abs() < 1e-6);
        assert!((balances["BTC"].available - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn adapter_handle_routes_to_the_right_account() {
        let (engine, _) = engine();
        let adapter = PaperExchange::new(engine.clone(), "lena");
        assert!(adapter.is_simulated());

        let order = adapter
            .create_order(&market("BTC/USDT", OrderSide::Buy, 0.1))
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(engine.orders("lena").len(), 1);

        let balance = adapter.get_balance().await.unwrap();
        assert!((balance["USDT"].available - 95_500.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn order_cost_breakdown_includes_fees() {
        let prices = Arc::new(StaticPriceSource::new());
        prices.set_price("BTC/USDT", 50_000.0);
        let mut settings = PaperSettings::default();
        settings.fee_rate = 0.001;
        let engine = Arc::new(PaperTradingEngine::new(prices, settings));
        let adapter = PaperExchange::new(engine, "mia");

        let cost = adapter
            .calculate_order_cost(&market("BTC/USDT", OrderSide::Buy, 0.2))
            .await
            .unwrap();
        assert!((cost.notional - 10_000.0).abs() < 1e-9);
        assert!((cost.fee - 10.0).abs() < 1e-9);
        assert!((cost.total - 10_010.0).abs() < 1e-9);
    }
}
