use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Levels;

/// A single bank account: one opaque identifier owning exactly one balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub balance: Levels,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate figures over the whole ledger.
///
/// Each balance may reach `i64::MAX`, so the total is kept wider than a single balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LedgerStats {
    pub account_count: i64,
    pub total_balance: i128,
}
