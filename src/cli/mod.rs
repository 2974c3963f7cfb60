use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::LedgerService;
use crate::config::LedgerConfig;
use crate::domain::parse_levels;

/// xpbank - experience level bank
#[derive(Parser)]
#[command(name = "xpbank")]
#[command(about = "A bank for experience levels: register accounts, deposit and withdraw levels")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file path (overrides the configuration file)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database file if needed
    Init,

    /// Register a new account with an empty balance
    Register {
        /// Account identifier
        account: String,
    },

    /// Register an account unless it already exists
    Ensure {
        /// Account identifier
        account: String,
    },

    /// Show the balance of an account
    #[command(visible_alias = "b")]
    Balance {
        /// Account identifier
        account: String,
    },

    /// Deposit levels into an account
    #[command(visible_alias = "d")]
    Deposit {
        /// Account identifier
        account: String,

        /// Number of levels (a positive integer)
        levels: String,
    },

    /// Withdraw levels from an account
    #[command(visible_alias = "w")]
    Withdraw {
        /// Account identifier
        account: String,

        /// Number of levels (a positive integer)
        levels: String,
    },

    /// Show the accounts holding the most levels
    Top {
        /// Number of accounts to show (defaults to the configured leaderboard size)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show totals for the whole bank
    Stats,

    /// Export all balances
    Export {
        /// Output format
        format: DataFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import balances; existing accounts are skipped
    Import {
        /// Input format
        format: DataFormat,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Csv,
    Json,
}

impl Cli {
    /// Resolve configuration: `--database` beats the config file, which beats defaults.
    pub async fn resolve_config(&self) -> Result<LedgerConfig> {
        let mut config = match &self.config {
            Some(path) => LedgerConfig::load(path).await?,
            None => LedgerConfig::default(),
        };
        if let Some(database) = &self.database {
            config = config.with_database_path(database);
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.resolve_config().await?;
        let service = LedgerService::open(&config)
            .await
            .context("Failed to open the xp bank")?;

        let result = run_command(&service, &config, self.command).await;
        service.close().await;
        result
    }
}

async fn run_command(
    service: &LedgerService,
    config: &LedgerConfig,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized: {}", service.store().path());
        }

        Commands::Register { account } => {
            service.register(&account).await?;
            println!("Registered {}", account);
        }

        Commands::Ensure { account } => {
            if service.ensure_registered(&account).await? {
                println!("Registered {}", account);
            } else {
                println!("{} is already registered", account);
            }
        }

        Commands::Balance { account } => {
            let balance = service.balance_of(&account).await?;
            println!("XP Bank Balance: {}", balance);
        }

        Commands::Deposit { account, levels } => {
            let levels =
                parse_levels(&levels).context("You must provide a positive integer level")?;
            let balance = service.deposit(&account, levels).await?;
            println!("Successfully deposited {} levels.", levels);
            println!("XP Bank Balance: {}", balance);
        }

        Commands::Withdraw { account, levels } => {
            let levels =
                parse_levels(&levels).context("You must provide a positive integer level")?;
            let balance = service.withdraw(&account, levels).await?;
            println!("Successfully withdrew {} levels.", levels);
            println!("XP Bank Balance: {}", balance);
        }

        Commands::Top { limit } => {
            let limit = limit.unwrap_or(config.leaderboard_size);
            run_top_command(service, limit).await?;
        }

        Commands::Stats => {
            let stats = service.stats().await?;
            println!("Accounts:     {}", stats.account_count);
            println!("Total levels: {}", stats.total_balance);
        }

        Commands::Export { format, output } => {
            run_export_command(service, format, output).await?;
        }

        Commands::Import {
            format,
            input,
            dry_run,
        } => {
            run_import_command(service, format, input, dry_run).await?;
        }
    }

    Ok(())
}

async fn run_top_command(service: &LedgerService, limit: usize) -> Result<()> {
    let accounts = service.leaderboard(limit).await?;
    if accounts.is_empty() {
        println!("No accounts found.");
        return Ok(());
    }

    println!("{:<5} {:<40} {:>10}", "RANK", "ACCOUNT", "LEVELS");
    println!("{}", "-".repeat(57));
    for (rank, account) in accounts.iter().enumerate() {
        println!(
            "{:<5} {:<40} {:>10}",
            rank + 1,
            truncate(&account.account_id, 40),
            account.balance
        );
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    format: DataFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match &output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let count = match format {
        DataFormat::Csv => exporter.export_balances_csv(writer).await?,
        DataFormat::Json => exporter.export_json(writer).await?.accounts.len(),
    };

    if output.is_some() {
        eprintln!("Exported {} accounts", count);
    }
    Ok(())
}

async fn run_import_command(
    service: &LedgerService,
    format: DataFormat,
    input: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match &input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions { dry_run };
    let summary = match format {
        DataFormat::Csv => importer.import_csv(reader, options).await?,
        DataFormat::Json => importer.import_json(reader, options).await?,
    };

    if dry_run {
        println!("Validation successful");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", summary.imported);
    println!("  Skipped:  {}", summary.skipped);
    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
