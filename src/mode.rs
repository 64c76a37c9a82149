//! Trading mode manager
//!
//! Per-user routing and safety-gating authority. Decides whether an order
//! goes to the paper engine or a live venue, enforces the confirmation
//! ritual for entering live mode, and writes the audit trail for every
//! transition and every order that crosses the live boundary.
//!
//! Live-adapter calls are wrapped by a per-user circuit breaker so an
//! unhealthy venue fails fast instead of stalling the caller.

use crate::audit::AuditLog;
use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerStats};
use crate::exchange::{ExchangeAdapter, ExchangeError};
use crate::paper::{PaperExchange, PaperTradingEngine};
use crate::types::{
    Balance, LiveModeConfirmation, ModeStatus, Order, OrderCost, OrderParams, OrderValidation,
    Ticker, TradingMode, TradingModeState,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Attached to every order result produced while in live mode
pub const LIVE_ORDER_WARNING: &str =
    "WARNING: live trading mode - this order was routed to a production venue and uses real funds";

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("No exchange configured for {0} mode")]
    NoExchangeConfigured(TradingMode),
    #[error("Cannot switch to live mode: no live exchange connection is configured")]
    LiveAdapterMissing,
    #[error("Cannot switch to live mode: '{0}' is a simulated/testnet venue")]
    SimulatedVenue(String),
    #[error("Confirmation required to enter live mode")]
    ConfirmationRequired,
    #[error("Password required to enter live mode")]
    PasswordRequired,
    #[error("Explicit risk acknowledgement required to enter live mode")]
    AcknowledgementRequired,
    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("Live venue call failed: {0}")]
    Breaker(#[from] CircuitBreakerError<ExchangeError>),
}

/// Routing outcome handed back to the caller. Live results carry an
/// explicit real-funds warning rather than a log line nobody sees.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedOrder {
    pub order: Order,
    pub mode: TradingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Pre-trade check result: structured validation plus, when valid, the
/// venue's cost breakdown
#[derive(Debug, Clone, Serialize)]
pub struct OrderPreview {
    pub validation: OrderValidation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<OrderCost>,
}

pub struct TradingModeManager {
    modes: DashMap<String, TradingModeState>,
    live_adapters: DashMap<String, Arc<dyn ExchangeAdapter>>,
    /// One breaker per live venue connection, created with the adapter
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    paper_engine: Arc<PaperTradingEngine>,
    audit: Arc<AuditLog>,
    breaker_config: CircuitBreakerConfig,
}

impl TradingModeManager {
    pub fn new(
        paper_engine: Arc<PaperTradingEngine>,
        audit: Arc<AuditLog>,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            modes: DashMap::new(),
            live_adapters: DashMap::new(),
            breakers: DashMap::new(),
            paper_engine,
            audit,
            breaker_config,
        }
    }

    // ==========================================
    // Adapter configuration
    // ==========================================

    pub fn configure_live_adapter(&self, user_id: &str, adapter: Arc<dyn ExchangeAdapter>) {
        info!(
            "Live adapter '{}' configured for user {} (simulated: {})",
            adapter.name(),
            user_id,
            adapter.is_simulated()
        );
        self.breakers.insert(
            user_id.to_string(),
            Arc::new(CircuitBreaker::new(
                format!("{}:{}", adapter.name(), user_id),
                self.breaker_config.clone(),
            )),
        );
        self.live_adapters.insert(user_id.to_string(), adapter);
    }

    pub fn remove_live_adapter(&self, user_id: &str) {
        self.live_adapters.remove(user_id);
        self.breakers.remove(user_id);
        info!("Live adapter removed for user {}", user_id);
    }

    fn live_adapter(&self, user_id: &str) -> Option<Arc<dyn ExchangeAdapter>> {
        self.live_adapters.get(user_id).map(|e| e.value().clone())
    }

    fn paper_adapter(&self, user_id: &str) -> PaperExchange {
        PaperExchange::new(self.paper_engine.clone(), user_id)
    }

    fn breaker(&self, user_id: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(user_id).map(|e| e.value().clone())
    }

    pub fn breaker_stats(&self, user_id: &str) -> Option<CircuitBreakerStats> {
        self.breaker(user_id).map(|b| b.stats())
    }

    // ==========================================
    // Mode state
    // ==========================================

    /// Unseen users are lazily initialized to paper mode
    pub fn current_mode(&self, user_id: &str) -> TradingMode {
        self.modes
            .entry(user_id.to_string())
            .or_default()
            .mode
    }

    pub fn get_mode_status(&self, user_id: &str) -> ModeStatus {
        let state = self.modes.entry(user_id.to_string()).or_default().clone();
        ModeStatus {
            mode: state.mode,
            is_live: state.mode == TradingMode::Live,
            can_switch_to_live: self.live_adapters.contains_key(user_id),
            mode_started_at: state.started_at,
        }
    }

    /// Switch a user's trading mode.
    ///
    /// Entering live mode requires, in order: a configured live adapter, a
    /// production (non-simulated) venue, and a confirmation carrying
    /// `confirmed: true`, a password and an explicit risk acknowledgement.
    /// Each missing piece fails with its own error so the caller can
    /// present the exact remediation. Switching back to paper is
    /// unconditional.
    pub fn switch_mode(
        &self,
        user_id: &str,
        target: TradingMode,
        confirmation: Option<&LiveModeConfirmation>,
    ) -> Result<TradingModeState, ModeError> {
        if target == TradingMode::Live {
            let adapter = self.live_adapter(user_id).ok_or(ModeError::LiveAdapterMissing)?;
            if adapter.is_simulated() {
                return Err(ModeError::SimulatedVenue(adapter.name().to_string()));
            }
            let confirmation = confirmation.ok_or(ModeError::ConfirmationRequired)?;
            if !confirmation.confirmed {
                return Err(ModeError::ConfirmationRequired);
            }
            if confirmation.password.trim().is_empty() {
                return Err(ModeError::PasswordRequired);
            }
            if confirmation.risk_acknowledgement.trim().is_empty() {
                return Err(ModeError::AcknowledgementRequired);
            }
        }

        let mut entry = self.modes.entry(user_id.to_string()).or_default();
        let previous = entry.mode;
        if previous == target {
            return Ok(entry.clone());
        }

        *entry = TradingModeState { mode: target, started_at: Utc::now() };
        let state = entry.clone();
        drop(entry);

        // The confirmation password never reaches the audit trail
        self.audit.record_mode_switch(user_id, previous, target);
        if target == TradingMode::Live {
            warn!("User {} switched to LIVE trading", user_id);
        } else {
            info!("User {} switched to paper trading", user_id);
        }
        Ok(state)
    }

    // ==========================================
    // Routing
    // ==========================================

    pub async fn create_order(
        &self,
        user_id: &str,
        params: &OrderParams,
    ) -> Result<RoutedOrder, ModeError> {
        match self.current_mode(user_id) {
            TradingMode::Paper => {
                let order = self.paper_adapter(user_id).create_order(params).await?;
                Ok(RoutedOrder { order, mode: TradingMode::Paper, warning: None })
            }
            TradingMode::Live => {
                let adapter = self
                    .live_adapter(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let breaker = self
                    .breaker(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;

                // Crossing the live boundary is itself an audited decision
                self.audit.record_live_order(user_id, "live_order_routed");

                let order = breaker.execute(|| adapter.create_order(params)).await?;
                Ok(RoutedOrder {
                    order,
                    mode: TradingMode::Live,
                    warning: Some(LIVE_ORDER_WARNING.to_string()),
                })
            }
        }
    }

    pub async fn cancel_order(&self, user_id: &str, order_id: &str) -> Result<Order, ModeError> {
        match self.current_mode(user_id) {
            TradingMode::Paper => Ok(self.paper_adapter(user_id).cancel_order(order_id).await?),
            TradingMode::Live => {
                let adapter = self
                    .live_adapter(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let breaker = self
                    .breaker(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                self.audit.record_live_order(user_id, "live_cancel_routed");
                Ok(breaker.execute(|| adapter.cancel_order(order_id)).await?)
            }
        }
    }

    /// Balance of whichever venue the current mode routes to
    pub async fn get_balances(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, Balance>, ModeError> {
        match self.current_mode(user_id) {
            TradingMode::Paper => Ok(self.paper_adapter(user_id).get_balance().await?),
            TradingMode::Live => {
                let adapter = self
                    .live_adapter(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let breaker = self
                    .breaker(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                Ok(breaker.execute(|| adapter.get_balance()).await?)
            }
        }
    }

    /// Validate an order and price it against the active venue without
    /// placing it
    pub async fn preview_order(
        &self,
        user_id: &str,
        params: &OrderParams,
    ) -> Result<OrderPreview, ModeError> {
        match self.current_mode(user_id) {
            TradingMode::Paper => {
                let adapter = self.paper_adapter(user_id);
                let validation = adapter.validate_order_params(params).await?;
                let cost = if validation.valid {
                    Some(adapter.calculate_order_cost(params).await?)
                } else {
                    None
                };
                Ok(OrderPreview { validation, cost })
            }
            TradingMode::Live => {
                let adapter = self
                    .live_adapter(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let breaker = self
                    .breaker(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                Ok(breaker
                    .execute(|| async {
                        let validation = adapter.validate_order_params(params).await?;
                        let cost = if validation.valid {
                            Some(adapter.calculate_order_cost(params).await?)
                        } else {
                            None
                        };
                        Ok::<_, ExchangeError>(OrderPreview { validation, cost })
                    })
                    .await?)
            }
        }
    }

    /// Ticker for the user's active venue. In live mode a failing or open
    /// circuit falls back to the simulator's price view, so dashboards
    /// degrade instead of erroring.
    pub async fn get_ticker(&self, user_id: &str, symbol: &str) -> Result<Ticker, ModeError> {
        match self.current_mode(user_id) {
            TradingMode::Paper => Ok(self.paper_adapter(user_id).get_ticker(symbol).await?),
            TradingMode::Live => {
                let adapter = self
                    .live_adapter(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let breaker = self
                    .breaker(user_id)
                    .ok_or(ModeError::NoExchangeConfigured(TradingMode::Live))?;
                let paper = self.paper_adapter(user_id);
                Ok(breaker
                    .execute_with_fallback(
                        || adapter.get_ticker(symbol),
                        || paper.get_ticker(symbol),
                    )
                    .await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticPriceSource;
    use crate::paper::PaperSettings;
    use crate::types::{
        Candle, OrderBook, OrderCost, OrderSide, OrderStatus, OrderType, OrderValidation,
        SymbolLimits, TradingFees,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Scripted live venue for routing tests
    struct MockExchange {
        name: String,
        simulated: bool,
        fail_orders: bool,
        orders_received: AtomicU32,
    }

    impl MockExchange {
        fn production() -> Arc<Self> {
            Arc::new(Self {
                name: "mockex".to_string(),
                simulated: false,
                fail_orders: false,
                orders_received: AtomicU32::new(0),
            })
        }

        fn testnet() -> Arc<Self> {
            Arc::new(Self {
                name: "mockex-testnet".to_string(),
                simulated: true,
                fail_orders: false,
                orders_received: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                name: "mockex-down".to_string(),
                simulated: false,
                fail_orders: true,
                orders_received: AtomicU32::new(0),
            })
        }

        fn order_count(&self) -> u32 {
            self.orders_received.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeAdapter for MockExchange {
        fn name(&self) -> &str {
            &self.name
        }

        fn is_simulated(&self) -> bool {
            self.simulated
        }

        async fn get_ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
            if self.fail_orders {
                return Err(ExchangeError::Api("venue unavailable".to_string()));
            }
            Ok(Ticker {
                symbol: symbol.to_string(),
                bid: 44990.0,
                ask: 45010.0,
                last: 45000.0,
                volume_24h: 1250.0,
                timestamp: Utc::now(),
            })
        }

        async fn get_order_book(
            &self,
            _symbol: &str,
            _depth: usize,
        ) -> Result<OrderBook, ExchangeError> {
            Err(ExchangeError::NotSupported("not scripted"))
        }

        async fn get_ohlcv(
            &self,
            _symbol: &str,
            _timeframe: &str,
            _limit: usize,
        ) -> Result<Vec<Candle>, ExchangeError> {
            Err(ExchangeError::NotSupported("not scripted"))
        }

        async fn get_symbols(&self) -> Result<Vec<String>, ExchangeError> {
            Ok(vec!["BTC/USDT".to_string()])
        }

        async fn get_balance(&self) -> Result<HashMap<String, Balance>, ExchangeError> {
            Ok(HashMap::from([(
                "USDT".to_string(),
                Balance { available: 5000.0, locked: 0.0 },
            )]))
        }

        async fn get_trading_fees(&self) -> Result<TradingFees, ExchangeError> {
            Ok(TradingFees { maker: 0.0016, taker: 0.0026 })
        }

        async fn get_symbol_limits(&self, symbol: &str) -> Result<SymbolLimits, ExchangeError> {
            Ok(SymbolLimits {
                symbol: symbol.to_string(),
                min_quantity: 0.0001,
                max_quantity: 0.0,
                min_price: 0.0,
                min_notional: 0.0,
            })
        }

        async fn validate_order_params(
            &self,
            _params: &OrderParams,
        ) -> Result<OrderValidation, ExchangeError> {
            Ok(OrderValidation::ok())
        }

        async fn calculate_order_cost(
            &self,
            params: &OrderParams,
        ) -> Result<OrderCost, ExchangeError> {
            let notional = params.quantity * params.price.unwrap_or(45000.0);
            Ok(OrderCost { notional, fee: 0.0, total: notional, fee_rate: 0.0 })
        }

        async fn create_order(&self, params: &OrderParams) -> Result<Order, ExchangeError> {
            self.orders_received.fetch_add(1, Ordering::SeqCst);
            if self.fail_orders {
                return Err(ExchangeError::Api("venue unavailable".to_string()));
            }
            let now = Utc::now();
            Ok(Order {
                id: "live-1".to_string(),
                symbol: params.symbol.clone(),
                side: params.side,
                order_type: params.order_type,
                quantity: params.quantity,
                price: params.price,
                status: OrderStatus::Pending,
                filled_quantity: 0.0,
                average_price: 0.0,
                created_at: now,
                updated_at: now,
            })
        }

        async fn cancel_order(&self, order_id: &str) -> Result<Order, ExchangeError> {
            Err(ExchangeError::OrderNotFound(order_id.to_string()))
        }
    }

    fn manager() -> (TradingModeManager, Arc<PaperTradingEngine>) {
        let prices = Arc::new(StaticPriceSource::new());
        prices.set_price("BTC/USDT", 45000.0);
        let engine = Arc::new(PaperTradingEngine::new(prices, PaperSettings::default()));
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_millis(200),
        };
        let mgr = TradingModeManager::new(engine.clone(), Arc::new(AuditLog::new()), breaker_config);
        (mgr, engine)
    }

    fn valid_confirmation() -> LiveModeConfirmation {
        LiveModeConfirmation {
            confirmed: true,
            password: "hunter2".to_string(),
            risk_acknowledgement: "I understand this trades real funds".to_string(),
        }
    }

    fn market_buy() -> OrderParams {
        OrderParams {
            symbol: "BTC/USDT".to_string(),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: 0.1,
            price: None,
        }
    }

    #[test]
    fn unseen_users_default_to_paper() {
        let (mgr, _) = manager();
        assert_eq!(mgr.current_mode("nobody"), TradingMode::Paper);
        let status = mgr.get_mode_status("nobody");
        assert!(!status.is_live);
        assert!(!status.can_switch_to_live);
    }

    #[test]
    fn live_switch_requires_an_adapter() {
        let (mgr, _) = manager();
        let err = mgr
            .switch_mode("alice", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap_err();
        assert!(matches!(err, ModeError::LiveAdapterMissing));
    }

    #[test]
    fn live_switch_rejects_testnet_venues() {
        let (mgr, _) = manager();
        mgr.configure_live_adapter("alice", MockExchange::testnet());
        let err = mgr
            .switch_mode("alice", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap_err();
        assert!(matches!(err, ModeError::SimulatedVenue(_)));
    }

    #[test]
    fn each_missing_confirmation_field_fails_distinctly() {
        let (mgr, _) = manager();
        mgr.configure_live_adapter("alice", MockExchange::production());

        let err = mgr.switch_mode("alice", TradingMode::Live, None).unwrap_err();
        assert!(matches!(err, ModeError::ConfirmationRequired));

        // Empty confirmation fails regardless of prior state
        let err = mgr
            .switch_mode("alice", TradingMode::Live, Some(&LiveModeConfirmation::default()))
            .unwrap_err();
        assert!(matches!(err, ModeError::ConfirmationRequired));

        let mut conf = valid_confirmation();
        conf.password.clear();
        let err = mgr.switch_mode("alice", TradingMode::Live, Some(&conf)).unwrap_err();
        assert!(matches!(err, ModeError::PasswordRequired));

        let mut conf = valid_confirmation();
        conf.risk_acknowledgement = "  ".to_string();
        let err = mgr.switch_mode("alice", TradingMode::Live, Some(&conf)).unwrap_err();
        assert!(matches!(err, ModeError::AcknowledgementRequired));

        // Still in paper mode after every failed gate
        assert_eq!(mgr.current_mode("alice"), TradingMode::Paper);
    }

    #[test]
    fn valid_switch_goes_live_and_audits_without_the_password() {
        let (mgr, _) = manager();
        mgr.configure_live_adapter("alice", MockExchange::production());

        let state = mgr
            .switch_mode("alice", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap();
        assert_eq!(state.mode, TradingMode::Live);
        assert_eq!(mgr.current_mode("alice"), TradingMode::Live);

        let entries = mgr.audit.entries_for("alice");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].previous_mode, Some(TradingMode::Paper));
        assert_eq!(entries[0].new_mode, Some(TradingMode::Live));

        let json = serde_json::to_string(&mgr.audit.entries()).unwrap();
        assert!(!json.contains("hunter2"), "password must never be serialized");

        // The gate runs regardless of prior state: an empty confirmation
        // fails even while already live
        let err = mgr
            .switch_mode("alice", TradingMode::Live, Some(&LiveModeConfirmation::default()))
            .unwrap_err();
        assert!(matches!(err, ModeError::ConfirmationRequired));

        // Back to paper needs no confirmation
        let state = mgr.switch_mode("alice", TradingMode::Paper, None).unwrap();
        assert_eq!(state.mode, TradingMode::Paper);
        assert_eq!(mgr.audit.entries_for("alice").len(), 2);
    }

    #[tokio::test]
    async fn paper_mode_never_touches_the_live_adapter() {
        let (mgr, engine) = manager();
        let live = MockExchange::production();
        mgr.configure_live_adapter("bob", live.clone());

        let routed = mgr.create_order("bob", &market_buy()).await.unwrap();
        assert_eq!(routed.mode, TradingMode::Paper);
        assert!(routed.warning.is_none());
        assert_eq!(routed.order.status, OrderStatus::Filled);
        assert_eq!(live.order_count(), 0);
        assert_eq!(engine.orders("bob").len(), 1);
    }

    #[tokio::test]
    async fn live_mode_never_touches_the_paper_engine() {
        let (mgr, engine) = manager();
        let live = MockExchange::production();
        mgr.configure_live_adapter("carol", live.clone());
        mgr.switch_mode("carol", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap();

        let routed = mgr.create_order("carol", &market_buy()).await.unwrap();
        assert_eq!(routed.mode, TradingMode::Live);
        assert_eq!(routed.warning.as_deref(), Some(LIVE_ORDER_WARNING));
        assert_eq!(live.order_count(), 1);
        assert!(engine.orders("carol").is_empty());

        // Routing across the live boundary is audited
        let actions: Vec<String> = mgr
            .audit
            .entries_for("carol")
            .iter()
            .map(|e| e.action.clone())
            .collect();
        assert!(actions.contains(&"live_order_routed".to_string()));
    }

    #[tokio::test]
    async fn live_mode_without_adapter_is_a_distinct_error() {
        let (mgr, _) = manager();
        mgr.configure_live_adapter("dave", MockExchange::production());
        mgr.switch_mode("dave", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap();
        mgr.remove_live_adapter("dave");

        let err = mgr.create_order("dave", &market_buy()).await.unwrap_err();
        assert!(matches!(err, ModeError::NoExchangeConfigured(TradingMode::Live)));
    }

    #[tokio::test]
    async fn failing_live_venue_trips_the_breaker() {
        let (mgr, _) = manager();
        let live = MockExchange::failing();
        mgr.configure_live_adapter("erin", live.clone());
        mgr.switch_mode("erin", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap();

        // failure_threshold = 2 in the test config
        for _ in 0..2 {
            let err = mgr.create_order("erin", &market_buy()).await.unwrap_err();
            assert!(matches!(err, ModeError::Breaker(CircuitBreakerError::Inner(_))));
        }
        assert_eq!(live.order_count(), 2);

        // Circuit now open: fail fast, venue untouched
        let err = mgr.create_order("erin", &market_buy()).await.unwrap_err();
        assert!(matches!(err, ModeError::Breaker(CircuitBreakerError::Open(_))));
        assert_eq!(live.order_count(), 2);

        let stats = mgr.breaker_stats("erin").unwrap();
        assert_eq!(stats.failure_count, 2);
    }

    #[tokio::test]
    async fn live_ticker_falls_back_to_the_simulator_view() {
        let (mgr, _) = manager();
        let live = MockExchange::failing();
        mgr.configure_live_adapter("fred", live);
        mgr.switch_mode("fred", TradingMode::Live, Some(&valid_confirmation()))
            .unwrap();

        // Live venue errors; the paper price source answers instead
        let ticker = mgr.get_ticker("fred", "BTC/USDT").await.unwrap();
        assert_eq!(ticker.last, 45000.0);
    }

    #[test]
    fn mode_status_reflects_adapter_configuration() {
        let (mgr, _) = manager();
        assert!(!mgr.get_mode_status("gina").can_switch_to_live);
        mgr.configure_live_adapter("gina", MockExchange::production());
        let status = mgr.get_mode_status("gina");
        assert!(status.can_switch_to_live);
        assert!(!status.is_live, "configuration alone never switches the mode");
    }
}
