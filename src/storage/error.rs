use thiserror::Error;

use crate::domain::Levels;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Ledger storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("Account already exists: {0}")]
    AlreadyExists(String),

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Balance of {account_id} would go negative: balance {balance}, delta {delta}")]
    WouldGoNegative {
        account_id: String,
        balance: Levels,
        delta: Levels,
    },

    #[error("Balance of {account_id} would overflow: balance {balance}, delta {delta}")]
    BalanceOverflow {
        account_id: String,
        balance: Levels,
        delta: Levels,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<String>, reason: impl ToString) -> Self {
        StoreError::StorageUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
