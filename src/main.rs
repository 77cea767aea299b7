use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tutorbill::application::engine::BillingEngine;
use tutorbill::config::Config;
use tutorbill::domain::ports::LedgerStoreBox;
use tutorbill::infrastructure::in_memory::InMemoryLedgerStore;
use tutorbill::infrastructure::logging::init_logging;
use tutorbill::interfaces::csv::cycle_writer::CycleWriter;
use tutorbill::interfaces::csv::event_reader::EventReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input billing events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "TUTORBILL_CONFIG", default_value = "tutorbill.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

fn open_store(db_path: Option<PathBuf>) -> Result<LedgerStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = tutorbill::infrastructure::rocksdb::RocksDBStore::open(path)
                .into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedgerStore::new()))
        }
        None => Ok(Box::new(InMemoryLedgerStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config).into_diagnostic()?;
    let log_level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
    init_logging(&log_level);
    if cli.config.exists() {
        info!("Loaded configuration from {}", cli.config.display());
    } else {
        info!("No config file found, using defaults");
    }

    let policy = config.billing.policy().into_diagnostic()?;
    let engine = BillingEngine::new(open_store(cli.db_path)?).with_policy(policy);

    // Process events
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for command in reader.commands() {
        match command {
            Ok(command) => {
                if let Err(e) = engine.execute(command).await {
                    tracing::debug!(error = %e, "Event rejected");
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    let cycles = engine.cycles().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = CycleWriter::new(stdout.lock());
    writer.write_cycles(&cycles).into_diagnostic()?;

    Ok(())
}
