//! Market data boundary
//!
//! Price ingestion and caching live outside this core; the paper engine
//! only needs a last-trade price to fill market orders against. Callers
//! wire in whatever feed they have behind the `PriceSource` trait.

use crate::exchange::ExchangeError;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

/// Last-price lookup for one canonical "BASE/QUOTE" symbol
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn last_price(&self, symbol: &str) -> Result<f64, ExchangeError>;

    /// Symbols this source currently knows a price for. Sources without a
    /// listing may return an empty set.
    fn symbols(&self) -> Vec<String> {
        Vec::new()
    }
}

/// In-memory price table, settable at runtime.
///
/// Serves as the default source for paper fills; a live deployment feeds it
/// from the ticker stream, tests seed it directly.
#[derive(Default)]
pub struct StaticPriceSource {
    prices: DashMap<String, f64>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self { prices: DashMap::new() }
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        debug!("Price update: {} = {}", symbol, price);
        self.prices.insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn last_price(&self, symbol: &str) -> Result<f64, ExchangeError> {
        self.prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| ExchangeError::PriceUnavailable(symbol.to_string()))
    }

    fn symbols(&self) -> Vec<String> {
        self.prices.iter().map(|e| e.key().clone()).collect()
    }
}
