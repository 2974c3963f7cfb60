use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use xpbank::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::new();
    logger.filter_level(LevelFilter::Warn);
    logger.parse_env(env_logger::DEFAULT_FILTER_ENV);
    match cli.verbose {
        0 => {}
        1 => {
            logger.filter_level(LevelFilter::Info);
        }
        _ => {
            logger.filter_level(LevelFilter::Debug);
        }
    }
    logger.init();

    cli.run().await
}
