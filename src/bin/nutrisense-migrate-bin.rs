use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use nutrisense_telegram_rs::db_operations::migrate_json_to_sqlite;
use nutrisense_telegram_rs::shared_main::{logger_init, LOG_MODULE};

/// One-shot migration of a JSON catalog file into a SQLite catalog.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Source JSON catalog file
    #[arg(short, long, env = "NUTRISENSE_JSON")]
    json: PathBuf,
    /// Target SQLite catalog file
    #[arg(short, long, env = "NUTRISENSE_DB")]
    database: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger_init(LOG_MODULE);

    log::info!(
        "Migrating {} -> {}",
        args.json.display(),
        args.database.display()
    );
    let stats = migrate_json_to_sqlite(&args.json, &args.database)?;

    if stats.foods == 0 && stats.recipes == 0 {
        log::warn!("Source catalog was empty, nothing migrated");
    }
    Ok(())
}
