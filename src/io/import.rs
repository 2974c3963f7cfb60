use anyhow::{Context, Result, bail};
use log::info;
use std::collections::HashSet;
use std::io::Read;

use crate::application::LedgerService;
use crate::io::export::{BalanceRecord, LedgerSnapshot};
use crate::storage::StoreError;

/// Result of an import operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate and count without writing anything.
    pub dry_run: bool,
}

/// Importer for loading balances into the ledger.
///
/// Accounts already present in the ledger are skipped, never overwritten.
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Import balances from CSV with an `account_id,balance` header
    pub async fn import_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for (line_num, result) in csv_reader.deserialize::<BalanceRecord>().enumerate() {
            let line = line_num + 2; // header is line 1
            let record = result.with_context(|| format!("CSV parse error on line {}", line))?;
            records.push(record);
        }

        self.import_records(records, options).await
    }

    /// Import balances from a JSON snapshot
    pub async fn import_json<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        let snapshot: LedgerSnapshot =
            serde_json::from_reader(reader).context("Invalid ledger snapshot")?;

        let records = snapshot.accounts.iter().map(BalanceRecord::from).collect();
        self.import_records(records, options).await
    }

    async fn import_records(
        &self,
        records: Vec<BalanceRecord>,
        options: ImportOptions,
    ) -> Result<ImportSummary> {
        validate_records(&records)?;

        let mut summary = ImportSummary::default();
        for record in &records {
            if options.dry_run {
                if self.service.store().exists(&record.account_id).await? {
                    summary.skipped += 1;
                } else {
                    summary.imported += 1;
                }
                continue;
            }

            // One INSERT per record: an account is never visible without its balance.
            match self
                .service
                .store()
                .create_with_balance(&record.account_id, record.balance)
                .await
            {
                Ok(()) => summary.imported += 1,
                Err(StoreError::AlreadyExists(_)) => summary.skipped += 1,
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            "Imported {} accounts, skipped {} existing{}",
            summary.imported,
            summary.skipped,
            if options.dry_run { " (dry run)" } else { "" }
        );
        Ok(summary)
    }
}

/// Reject the whole batch before writing if any record is unusable.
fn validate_records(records: &[BalanceRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for record in records {
        if record.balance < 0 {
            bail!(
                "Negative balance {} for account {}",
                record.balance,
                record.account_id
            );
        }
        if !seen.insert(record.account_id.as_str()) {
            bail!("Duplicate account {} in import", record.account_id);
        }
    }
    Ok(())
}
