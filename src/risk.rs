//! Risk advisory boundary
//!
//! Position checks and sizing live in an external service; this core only
//! defines the contract and consults it optionally before routing. The
//! advice is advisory - callers choose their own fail-open/fail-closed
//! policy when the service is unavailable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Risk advisory unavailable: {0}")]
    Unavailable(String),
    #[error("Unknown user: {0}")]
    UnknownUser(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Maximum single-position share of portfolio value (decimal)
    pub max_position_pct: f64,
    pub max_open_positions: u32,
    pub max_leverage: f64,
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self { max_position_pct: 0.10, max_open_positions: 10, max_leverage: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RiskDecision {
    pub fn allowed() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}

#[async_trait]
pub trait RiskAdvisor: Send + Sync {
    async fn get_user_profile(&self, user_id: &str) -> Result<RiskProfile, RiskError>;

    async fn check_position(
        &self,
        user_id: &str,
        position_value: f64,
        portfolio_value: f64,
        open_positions: u32,
        leverage: f64,
    ) -> Result<RiskDecision, RiskError>;

    /// Risk-based position size in units of the traded asset
    async fn calculate_position_size(
        &self,
        user_id: &str,
        portfolio_value: f64,
        risk_per_trade: f64,
        entry_price: f64,
        stop_price: f64,
    ) -> Result<f64, RiskError>;
}

/// Profile-driven advisor with no external dependencies, used as the
/// default wiring and in tests
pub struct BasicRiskAdvisor {
    profile: RiskProfile,
}

impl BasicRiskAdvisor {
    pub fn new(profile: RiskProfile) -> Self {
        Self { profile }
    }
}

impl Default for BasicRiskAdvisor {
    fn default() -> Self {
        Self::new(RiskProfile::default())
    }
}

#[async_trait]
impl RiskAdvisor for BasicRiskAdvisor {
    async fn get_user_profile(&self, _user_id: &str) -> Result<RiskProfile, RiskError> {
        Ok(self.profile.clone())
    }

    async fn check_position(
        &self,
        _user_id: &str,
        position_value: f64,
        portfolio_value: f64,
        open_positions: u32,
        leverage: f64,
    ) -> Result<RiskDecision, RiskError> {
        if portfolio_value <= 0.0 {
            return Ok(RiskDecision::denied("portfolio value is zero"));
        }
        let pct = position_value / portfolio_value;
        if pct > self.profile.max_position_pct {
            return Ok(RiskDecision::denied(format!(
                "position is {:.1}% of portfolio, limit is {:.1}%",
                pct * 100.0,
                self.profile.max_position_pct * 100.0
            )));
        }
        if open_positions >= self.profile.max_open_positions {
            return Ok(RiskDecision::denied(format!(
                "{} open positions, limit is {}",
                open_positions, self.profile.max_open_positions
            )));
        }
        if leverage > self.profile.max_leverage {
            return Ok(RiskDecision::denied(format!(
                "leverage {:.1}x exceeds limit {:.1}x",
                leverage, self.profile.max_leverage
            )));
        }
        Ok(RiskDecision::allowed())
    }

    async fn calculate_position_size(
        &self,
        _user_id: &str,
        portfolio_value: f64,
        risk_per_trade: f64,
        entry_price: f64,
        stop_price: f64,
    ) -> Result<f64, RiskError> {
        let risk_amount = portfolio_value * risk_per_trade;
        let per_unit_risk = (entry_price - stop_price).abs();
        if per_unit_risk <= 0.0 || entry_price <= 0.0 {
            return Ok(0.0);
        }
        let size = risk_amount / per_unit_risk;
        // Cap at the profile's maximum position share
        let max_size = portfolio_value * self.profile.max_position_pct / entry_price;
        Ok(size.min(max_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn oversized_position_is_denied_with_a_reason() {
        let advisor = BasicRiskAdvisor::default();
        let decision = advisor
            .check_position("alice", 20_000.0, 100_000.0, 2, 1.0)
            .await
            .unwrap();
        assert!(!decision.allowed);
        assert!(decision.reason.unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn position_within_limits_is_allowed() {
        let advisor = BasicRiskAdvisor::default();
        let decision = advisor
            .check_position("alice", 5_000.0, 100_000.0, 2, 1.0)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
    }

    #[tokio::test]
    async fn too_many_open_positions_is_denied() {
        let advisor = BasicRiskAdvisor::default();
        let decision = advisor
            .check_position("alice", 1_000.0, 100_000.0, 10, 1.0)
            .await
            .unwrap();
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn position_size_respects_stop_distance_and_cap() {
        let advisor = BasicRiskAdvisor::default();
        // Risking 1% of 100k with a 1000-point stop: 100k * 0.01 / 1000 = 1 unit,
        // capped by the 10% position limit (10k / 45k ~ 0.222)
        let size = advisor
            .calculate_position_size("alice", 100_000.0, 0.01, 45_000.0, 44_000.0)
            .await
            .unwrap();
        assert!((size - 0.2222).abs() < 0.001);

        // Zero stop distance sizes to zero rather than dividing by zero
        let size = advisor
            .calculate_position_size("alice", 100_000.0, 0.01, 45_000.0, 45_000.0)
            .await
            .unwrap();
        assert_eq!(size, 0.0);
    }
}
