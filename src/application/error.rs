use thiserror::Error;

use crate::domain::{Levels, ParseLevelsError};
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds in {account_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account_id: String,
        balance: Levels,
        requested: Levels,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ParseLevelsError> for AppError {
    fn from(e: ParseLevelsError) -> Self {
        AppError::InvalidAmount(e.to_string())
    }
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Store(StoreError::NotFound(_)))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AppError::Store(StoreError::AlreadyExists(_)))
    }

    /// True for failures the caller can fix by changing the request.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::InvalidAmount(_) | AppError::InsufficientFunds { .. } => true,
            AppError::Store(e) => matches!(
                e,
                StoreError::AlreadyExists(_) | StoreError::NotFound(_)
            ),
        }
    }
}
