use std::path::Path;

use log::warn;

use crate::config::LedgerConfig;
use crate::domain::{Account, LedgerStats, Levels};
use crate::storage::{LedgerStore, StoreError};

use super::AppError;

/// Application service providing the bank operations.
/// This is the primary interface for any caller (CLI, command handler, tests).
/// Build one per process and hand out references to it.
pub struct LedgerService {
    store: LedgerStore,
}

impl LedgerService {
    /// Create a new ledger service on top of an open store.
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// Open (or create) the ledger described by `config`.
    pub async fn open(config: &LedgerConfig) -> Result<Self, AppError> {
        let store = LedgerStore::open_with(&config.database_path, config.store_options()).await?;
        Ok(Self::new(store))
    }

    /// Open (or create) the ledger file at `path` with default settings.
    pub async fn open_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = LedgerStore::open(path).await?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Release the underlying file. Safe to call more than once.
    pub async fn close(&self) {
        self.store.close().await;
    }

    // ========================
    // Account operations
    // ========================

    /// Register a new account with an empty balance.
    pub async fn register(&self, account_id: &str) -> Result<(), AppError> {
        Ok(self.store.create(account_id).await?)
    }

    /// Register the account unless it is already known.
    /// Returns true if a new record was created.
    pub async fn ensure_registered(&self, account_id: &str) -> Result<bool, AppError> {
        if self.store.exists(account_id).await? {
            return Ok(false);
        }
        match self.store.create(account_id).await {
            Ok(()) => Ok(true),
            // Registered by someone else between the check and the insert.
            Err(StoreError::AlreadyExists(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Balance of an account; unknown accounts read as 0 without being created.
    pub async fn balance_of(&self, account_id: &str) -> Result<Levels, AppError> {
        match self.store.get_balance(account_id).await {
            Ok(balance) => Ok(balance),
            Err(StoreError::NotFound(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Full record of a registered account.
    pub async fn account(&self, account_id: &str) -> Result<Account, AppError> {
        Ok(self.store.get_account(account_id).await?)
    }

    // ========================
    // Balance operations
    // ========================

    /// Add `amount` levels to an account and return the new balance.
    pub async fn deposit(&self, account_id: &str, amount: Levels) -> Result<Levels, AppError> {
        validate_amount(amount)?;
        Ok(self.store.adjust_balance(account_id, amount).await?)
    }

    /// Take `amount` levels out of an account and return the new balance.
    pub async fn withdraw(&self, account_id: &str, amount: Levels) -> Result<Levels, AppError> {
        validate_amount(amount)?;

        let balance = self.balance_of(account_id).await?;
        if amount > balance {
            return Err(AppError::InsufficientFunds {
                account_id: account_id.to_string(),
                balance,
                requested: amount,
            });
        }

        match self.store.adjust_balance(account_id, -amount).await {
            Ok(balance) => Ok(balance),
            Err(e @ StoreError::WouldGoNegative { .. }) => {
                // Balance changed between the check and the update.
                warn!("Withdrawal from {} passed validation but was refused: {}", account_id, e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================
    // Listing
    // ========================

    /// The `limit` accounts holding the most levels.
    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<Account>, AppError> {
        Ok(self.store.top_balances(limit).await?)
    }

    /// Every account in the ledger.
    pub async fn accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.store.list_accounts().await?)
    }

    pub async fn stats(&self) -> Result<LedgerStats, AppError> {
        Ok(self.store.stats().await?)
    }
}

fn validate_amount(amount: Levels) -> Result<(), AppError> {
    if amount < 1 {
        return Err(AppError::InvalidAmount(format!(
            "level count must be a positive integer, got {}",
            amount
        )));
    }
    Ok(())
}
