use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, LedgerStats, Levels};

use super::{MIGRATION_001_INITIAL, StoreError, StoreResult};

/// Connection settings for [`LedgerStore::open_with`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Durable mapping of account id to balance, kept in a single SQLite file.
pub struct LedgerStore {
    pool: SqlitePool,
    path: String,
}

impl LedgerStore {
    /// Open the ledger file at `path` with default options.
    /// Creates the file and its schema if it doesn't exist.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(path, StoreOptions::default()).await
    }

    /// Open the ledger file at `path`.
    /// Fails with `StorageUnavailable` when the file can't be created or isn't a ledger database.
    pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> StoreResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if path.exists() {
            info!("Connecting to the existing xp bank database at {}", display);
        } else {
            info!("No xp bank database at {}, creating a new one", display);
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(options.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::unavailable(&display, e))?;

        let store = Self {
            pool,
            path: display,
        };

        if let Err(e) = store.migrate().await {
            store.pool.close().await;
            return Err(StoreError::unavailable(store.path, e));
        }

        info!("Opened xp bank database at {}", store.path);
        Ok(store)
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Release every connection to the backing file.
    /// Idempotent: closing twice is a no-op.
    pub async fn close(&self) {
        if self.pool.is_closed() {
            return;
        }
        info!("Closing connection to the xp bank database at {}", self.path);
        self.pool.close().await;
    }

    fn db_error(&self, e: sqlx::Error) -> StoreError {
        match e {
            sqlx::Error::PoolClosed => StoreError::unavailable(&self.path, "ledger is closed"),
            other => StoreError::Database(other),
        }
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account with a zero balance.
    pub async fn create(&self, account_id: &str) -> StoreResult<()> {
        self.create_with_balance(account_id, 0).await
    }

    /// Insert a new account holding `balance` in one statement.
    /// Fails with `AlreadyExists` and leaves the existing record untouched if the id is taken.
    pub async fn create_with_balance(&self, account_id: &str, balance: Levels) -> StoreResult<()> {
        if balance < 0 {
            return Err(StoreError::WouldGoNegative {
                account_id: account_id.to_string(),
                balance: 0,
                delta: balance,
            });
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            INSERT INTO balances (account_id, balance, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (account_id) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(balance)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| self.db_error(e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(account_id.to_string()));
        }

        info!(
            "Account {} has been added to the xp bank with {} levels",
            account_id, balance
        );
        Ok(())
    }

    /// True iff a record for `account_id` is present.
    pub async fn exists(&self, account_id: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM balances WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.db_error(e))?;

        Ok(row.is_some())
    }

    /// Current balance of an account.
    pub async fn get_balance(&self, account_id: &str) -> StoreResult<Levels> {
        let row = sqlx::query("SELECT balance FROM balances WHERE account_id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.db_error(e))?;

        match row {
            Some(row) => Ok(row.get("balance")),
            None => Err(StoreError::NotFound(account_id.to_string())),
        }
    }

    /// Full record of an account.
    pub async fn get_account(&self, account_id: &str) -> StoreResult<Account> {
        let row = sqlx::query(
            r#"
            SELECT account_id, balance, created_at, updated_at
            FROM balances
            WHERE account_id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.db_error(e))?;

        match row {
            Some(row) => Self::row_to_account(&row),
            None => Err(StoreError::NotFound(account_id.to_string())),
        }
    }

    /// Apply `balance += delta` in a single statement and return the new balance.
    ///
    /// The guard lives in the WHERE clause so the read-modify-write is one atomic
    /// UPDATE: concurrent callers on the same account can't lose each other's updates.
    pub async fn adjust_balance(&self, account_id: &str, delta: Levels) -> StoreResult<Levels> {
        // balance + delta >= 0  <=>  balance >= -delta
        let Some(floor) = delta.checked_neg() else {
            return self.rejection(account_id, delta).await;
        };
        // balance + delta <= i64::MAX
        let ceiling = Levels::MAX - delta.max(0);

        let row = sqlx::query(
            r#"
            UPDATE balances
            SET balance = balance + ?, updated_at = ?
            WHERE account_id = ? AND balance >= ? AND balance <= ?
            RETURNING balance
            "#,
        )
        .bind(delta)
        .bind(Utc::now().to_rfc3339())
        .bind(account_id)
        .bind(floor)
        .bind(ceiling)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.db_error(e))?;

        match row {
            Some(row) => {
                let balance: Levels = row.get("balance");
                debug!(
                    "Adjusted {} by {} (new balance {})",
                    account_id, delta, balance
                );
                Ok(balance)
            }
            None => self.rejection(account_id, delta).await,
        }
    }

    /// Work out why an adjustment matched no row.
    async fn rejection(&self, account_id: &str, delta: Levels) -> StoreResult<Levels> {
        let balance = self.get_balance(account_id).await?;
        if delta > 0 {
            Err(StoreError::BalanceOverflow {
                account_id: account_id.to_string(),
                balance,
                delta,
            })
        } else {
            warn!(
                "Rejected adjustment of {} by {}: balance {} would go negative",
                account_id, delta, balance
            );
            Err(StoreError::WouldGoNegative {
                account_id: account_id.to_string(),
                balance,
                delta,
            })
        }
    }

    /// Accounts with the highest balances first; ties ordered by id.
    pub async fn top_balances(&self, limit: usize) -> StoreResult<Vec<Account>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT account_id, balance, created_at, updated_at
            FROM balances
            ORDER BY balance DESC, account_id ASC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.db_error(e))?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Every account, ordered by id.
    pub async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT account_id, balance, created_at, updated_at
            FROM balances
            ORDER BY account_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.db_error(e))?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Account count and sum of all balances.
    /// The total is summed as i128; SQLite's SUM fails once it passes i64::MAX.
    pub async fn stats(&self) -> StoreResult<LedgerStats> {
        let rows = sqlx::query("SELECT balance FROM balances")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| self.db_error(e))?;

        let total_balance = rows
            .iter()
            .map(|row| i128::from(row.get::<Levels, _>("balance")))
            .sum();

        Ok(LedgerStats {
            account_count: rows.len() as i64,
            total_balance,
        })
    }

    fn row_to_account(row: &SqliteRow) -> StoreResult<Account> {
        let created_at_str: String = row.get("created_at");
        let updated_at_str: String = row.get("updated_at");

        Ok(Account {
            account_id: row.get("account_id"),
            balance: row.get("balance"),
            created_at: parse_timestamp(&created_at_str, "created_at")?,
            updated_at: parse_timestamp(&updated_at_str, "updated_at")?,
        })
    }
}

fn parse_timestamp(value: &str, column: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::Database(sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: Box::new(e),
            })
        })
}
