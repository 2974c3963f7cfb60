// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;
use xpbank::application::LedgerService;
use xpbank::storage::LedgerStore;

/// Path of a ledger file inside a fresh temporary directory
pub fn temp_db() -> Result<(PathBuf, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    Ok((db_path, temp_dir))
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let (db_path, temp_dir) = temp_db()?;
    let service = LedgerService::open_path(&db_path).await?;
    Ok((service, temp_dir))
}

/// Helper to create a bare store with a temporary database
pub async fn test_store() -> Result<(LedgerStore, TempDir)> {
    let (db_path, temp_dir) = temp_db()?;
    let store = LedgerStore::open(&db_path).await?;
    Ok((store, temp_dir))
}

/// Register an account and give it a starting balance
pub async fn funded(service: &LedgerService, account_id: &str, levels: i64) -> Result<()> {
    service.register(account_id).await?;
    if levels > 0 {
        service.deposit(account_id, levels).await?;
    }
    Ok(())
}
