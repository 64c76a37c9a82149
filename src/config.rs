//! Runtime configuration from environment variables
//!
//! Everything has a sensible default so the server comes up in pure paper
//! mode with no environment at all; live trading needs explicit Kraken
//! credentials.

use crate::circuit_breaker::CircuitBreakerConfig;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid value for {}, using default", name);
            default
        }),
        Err(_) => default,
    }
}

/// Parse "USDT=100000,EUR=5000" into an asset->amount map
fn parse_balances(raw: &str) -> HashMap<String, f64> {
    let mut balances = HashMap::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('=') {
            Some((asset, amount)) => match amount.trim().parse::<f64>() {
                Ok(value) if value >= 0.0 => {
                    balances.insert(asset.trim().to_uppercase(), value);
                }
                _ => warn!("Ignoring invalid seed balance entry '{}'", part),
            },
            None => warn!("Ignoring malformed seed balance entry '{}'", part),
        }
    }
    balances
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Seed balances for new paper accounts
    pub paper_starting_balances: HashMap<String, f64>,
    /// Simulated taker fee (decimal)
    pub paper_fee_rate: f64,
    pub breaker: CircuitBreakerConfig,
    pub kraken_api_key: Option<String>,
    pub kraken_api_secret: Option<String>,
    /// Marks the configured Kraken endpoint as a sandbox deployment
    pub kraken_testnet: bool,
    /// Consult the risk advisor before routing orders (advisory, fail-open)
    pub risk_advisor_enabled: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let balances_raw = std::env::var("PAPER_STARTING_BALANCES")
            .unwrap_or_else(|_| "USDT=100000".to_string());
        let mut paper_starting_balances = parse_balances(&balances_raw);
        if paper_starting_balances.is_empty() {
            warn!("No valid seed balances configured, falling back to USDT=100000");
            paper_starting_balances.insert("USDT".to_string(), 100_000.0);
        }

        let breaker = CircuitBreakerConfig {
            failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", 5u32),
            success_threshold: env_or("BREAKER_SUCCESS_THRESHOLD", 2u32),
            timeout: Duration::from_millis(env_or("BREAKER_TIMEOUT_MS", 10_000u64)),
            reset_timeout: Duration::from_millis(env_or("BREAKER_RESET_TIMEOUT_MS", 60_000u64)),
        };

        let config = Self {
            port: env_or("PORT", 8000u16),
            paper_starting_balances,
            paper_fee_rate: env_or("PAPER_FEE_RATE", 0.0f64),
            breaker,
            kraken_api_key: std::env::var("KRAKEN_API_KEY").ok().filter(|k| !k.is_empty()),
            kraken_api_secret: std::env::var("KRAKEN_API_SECRET").ok().filter(|s| !s.is_empty()),
            kraken_testnet: env_or("KRAKEN_TESTNET", false),
            risk_advisor_enabled: env_or("RISK_ADVISOR_ENABLED", false),
        };

        info!(
            "Config loaded: port={}, paper_seed={:?}, paper_fee={:.4}%, breaker_threshold={}",
            config.port,
            config.paper_starting_balances,
            config.paper_fee_rate * 100.0,
            config.breaker.failure_threshold
        );
        config
    }

    pub fn has_kraken_credentials(&self) -> bool {
        self.kraken_api_key.is_some() && self.kraken_api_secret.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed_balance_lists() {
        let balances = parse_balances("USDT=100000,EUR=5000");
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["USDT"], 100_000.0);
        assert_eq!(balances["EUR"], 5_000.0);
    }

    #[test]
    fn skips_malformed_seed_entries() {
        let balances = parse_balances("USDT=100000,garbage,BTC=-5,eth=2");
        assert_eq!(balances.len(), 2);
        assert_eq!(balances["USDT"], 100_000.0);
        assert_eq!(balances["ETH"], 2.0);
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(parse_balances("").is_empty());
        assert!(parse_balances(" , ,").is_empty());
    }
}
