use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, Levels};

/// Ledger snapshot for full export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
}

/// One CSV row. Timestamps are informational and ignored on import.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub account_id: String,
    pub balance: Levels,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Account> for BalanceRecord {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            balance: account.balance,
            created_at: Some(account.created_at),
            updated_at: Some(account.updated_at),
        }
    }
}

/// Exporter for writing the ledger out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.accounts().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        for account in &accounts {
            csv_writer.serialize(BalanceRecord::from(account))?;
        }

        csv_writer.flush()?;
        Ok(accounts.len())
    }

    /// Export the whole ledger as a JSON snapshot
    pub async fn export_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let accounts = self.service.accounts().await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
