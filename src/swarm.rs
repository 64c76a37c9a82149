//! Swarm coordinator
//!
//! Aggregates proposed actions from independent decision agents into one
//! conflict-free action set before anything reaches the mode manager.
//! Agents decide concurrently against read-only context; coordination is a
//! single barrier over all decisions, then conflict resolution runs.
//!
//! Resolution policy: within a symbol where agents disagree on side, only
//! the strictly highest-confidence action survives (ties go to the agent
//! registered first). The conflict record itself is always returned so
//! auditing can see that a disagreement occurred even though it was
//! resolved.

use crate::types::{ActionType, AgentAction, AgentRole, Conflict, OrderSide};
use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only snapshot handed to every agent in a coordination cycle
#[derive(Debug, Clone, Default)]
pub struct CoordinationContext {
    pub symbols: Vec<String>,
    pub prices: HashMap<String, f64>,
    pub portfolio_value: f64,
}

/// A decision source: strategy, risk, sentiment or signal agent. The
/// coordinator never validates an agent's reasoning, only the shape of
/// what it proposes.
#[async_trait]
pub trait DecisionAgent: Send + Sync {
    fn id(&self) -> &str;
    fn role(&self) -> AgentRole;
    async fn decide(&self, ctx: &CoordinationContext) -> Option<AgentAction>;
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinationResult {
    pub actions: Vec<AgentAction>,
    pub conflicts: Vec<Conflict>,
}

#[derive(Default)]
pub struct SwarmCoordinator {
    /// Registration order is the tie-break order, kept explicit
    agents: RwLock<Vec<Arc<dyn DecisionAgent>>>,
}

impl SwarmCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_agent(&self, agent: Arc<dyn DecisionAgent>) {
        info!("Registered agent '{}' ({:?})", agent.id(), agent.role());
        self.agents.write().push(agent);
    }

    pub fn agent_count(&self) -> usize {
        self.agents.read().len()
    }

    /// Run one coordination cycle: every agent decides concurrently, all
    /// decisions complete (the barrier), then conflicts are resolved.
    pub async fn coordinate(&self, ctx: &CoordinationContext) -> CoordinationResult {
        let agents: Vec<Arc<dyn DecisionAgent>> = self.agents.read().clone();
        let decisions = join_all(agents.iter().map(|agent| agent.decide(ctx))).await;

        // join_all preserves input order, so actions stay in registration
        // order for the tie-break below
        let proposals: Vec<AgentAction> = decisions
            .into_iter()
            .flatten()
            .filter(|action| action.action_type != ActionType::Noop)
            .collect();

        debug!("Coordination cycle: {} proposals from {} agents", proposals.len(), agents.len());
        Self::resolve_conflicts(proposals)
    }

    fn resolve_conflicts(proposals: Vec<AgentAction>) -> CoordinationResult {
        // Group sided actions by symbol, preserving first-seen order
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&AgentAction>> = HashMap::new();
        for action in &proposals {
            let (Some(symbol), Some(_)) = (&action.symbol, action.side) else {
                continue;
            };
            if !groups.contains_key(symbol) {
                group_order.push(symbol.clone());
            }
            groups.entry(symbol.clone()).or_default().push(action);
        }

        let mut conflicts = Vec::new();
        let mut dropped: Vec<String> = Vec::new();
        for symbol in &group_order {
            let group = &groups[symbol];
            let mut sides: Vec<OrderSide> = Vec::new();
            for action in group {
                if let Some(side) = action.side {
                    if !sides.contains(&side) {
                        sides.push(side);
                    }
                }
            }
            if sides.len() < 2 {
                continue;
            }

            conflicts.push(Conflict {
                symbol: symbol.clone(),
                sides,
                agent_ids: group.iter().map(|a| a.agent_id.clone()).collect(),
            });

            // Keep the single strictly-highest-confidence action; iteration
            // order makes ties stable on registration order
            let mut winner = group[0];
            for &action in &group[1..] {
                if action.confidence.unwrap_or(0.0) > winner.confidence.unwrap_or(0.0) {
                    winner = action;
                }
            }
            warn!(
                "Conflict on {}: {} agents disagree, keeping '{}' (confidence {:?})",
                symbol,
                group.len(),
                winner.agent_id,
                winner.confidence
            );
            for action in group {
                if action.id != winner.id {
                    dropped.push(action.id.clone());
                }
            }
        }

        let actions = proposals
            .iter()
            .filter(|a| !dropped.contains(&a.id))
            .cloned()
            .collect();

        CoordinationResult { actions, conflicts }
    }
}
