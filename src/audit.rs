//! Audit trail for mode transitions and live-boundary routing
//!
//! Append-only, recorded synchronously with the decision it documents.
//! Entries never carry secrets: the confirmation password is checked by the
//! mode gate and discarded - the entry type has no field to hold it.

use crate::types::TradingMode;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntry {
    pub user_id: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_mode: Option<TradingMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_mode: Option<TradingMode>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&self, entry: AuditLogEntry) {
        info!(
            "Audit: user={} action={} {:?}->{:?}",
            entry.user_id, entry.action, entry.previous_mode, entry.new_mode
        );
        self.entries.write().push(entry);
    }

    pub fn record_mode_switch(
        &self,
        user_id: &str,
        previous_mode: TradingMode,
        new_mode: TradingMode,
    ) {
        self.append(AuditLogEntry {
            user_id: user_id.to_string(),
            action: "mode_switch".to_string(),
            previous_mode: Some(previous_mode),
            new_mode: Some(new_mode),
            timestamp: Utc::now(),
        });
    }

    /// Recorded whenever an order routing decision crosses the live boundary
    pub fn record_live_order(&self, user_id: &str, action: &str) {
        self.append(AuditLogEntry {
            user_id: user_id.to_string(),
            action: action.to_string(),
            previous_mode: None,
            new_mode: None,
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.read().clone()
    }

    pub fn entries_for(&self, user_id: &str) -> Vec<AuditLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
