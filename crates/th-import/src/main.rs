//! TrueHearted Import - legacy dump import tool

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use th_common::logging::{init_logging, LogConfig, LogLevel};
use th_import::config::{IdentifierPolicy, ImportConfig, PrimaryImagePolicy, StoreConfig};
use th_import::store::{DestinationStore, MemoryStore, RestStore};
use th_import::{dump, report, ImportOrchestrator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "th-import")]
#[command(author, version, about = "Import a legacy MySQL dump into TrueHearted")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Import members, images, likes and messages from a dump
    Import {
        /// Path to the SQL dump
        dump: PathBuf,

        /// Shift legacy member ids by 1,000,000
        #[arg(long)]
        offset_member_ids: bool,

        /// Append a suffix to every imported e-mail address
        #[arg(long, value_name = "SUFFIX")]
        email_suffix: Option<String>,

        /// Which images are flagged as primary
        #[arg(long, value_name = "POLICY", default_value = "first-overall")]
        primary_image: PrimaryImagePolicy,

        /// Attempt only the first N tuples of each kind
        #[arg(long, value_name = "N")]
        sample: Option<usize>,

        /// Import into an in-memory store instead of the backend
        #[arg(long)]
        dry_run: bool,

        /// Print the tally as JSON
        #[arg(long)]
        json: bool,

        /// Import straight into Postgres instead of the REST backend
        #[cfg(feature = "database")]
        #[arg(long, env = "DATABASE_URL", value_name = "URL")]
        database_url: Option<String>,
    },

    /// Show what the dump contains without importing anything
    Inspect {
        /// Path to the SQL dump
        dump: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("th-import")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    match cli.command {
        Command::Import {
            dump,
            offset_member_ids,
            email_suffix,
            primary_image,
            sample,
            dry_run,
            json,
            #[cfg(feature = "database")]
            database_url,
        } => {
            let mut config = ImportConfig::new().with_primary_image(primary_image);
            if offset_member_ids {
                config = config.with_identifier_policy(IdentifierPolicy::Offset);
            }
            if let Some(suffix) = email_suffix {
                config = config.with_email_suffix(suffix);
            }
            if let Some(n) = sample {
                config = config.with_parse_limit(n);
            }

            let store: Arc<dyn DestinationStore> = if dry_run {
                info!("Dry run, importing into memory");
                Arc::new(MemoryStore::new())
            } else {
                #[cfg(feature = "database")]
                if let Some(url) = database_url {
                    info!("Importing into Postgres");
                    let store = th_import::store::PgStore::connect(&url)
                        .await
                        .context("Failed to connect to Postgres")?;
                    return run_import(Arc::new(store), config, dump, json).await;
                }

                let store_config = StoreConfig::from_env()?;
                info!(url = %store_config.url, "Importing into hosted backend");
                Arc::new(RestStore::new(store_config)?)
            };

            run_import(store, config, dump, json).await?;
        },
        Command::Inspect { dump: path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read dump '{}'", path.display()))?;
            let inspection = dump::inspect(&text);
            println!("{}", report::summarize_inspection(&inspection));
        },
    }

    Ok(())
}

async fn run_import(
    store: Arc<dyn DestinationStore>,
    config: ImportConfig,
    dump: PathBuf,
    json: bool,
) -> Result<()> {
    let orchestrator = ImportOrchestrator::new(store, config);
    let report = orchestrator.run_file(&dump).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.tally)?);
    } else {
        println!("{}", report.summarize());
    }

    info!("Import complete");
    Ok(())
}
