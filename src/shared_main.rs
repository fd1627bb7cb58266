use std::{env, path::Path};

use crate::constants::DEFAULT_SQLITE_DB;
use crate::data_backend::{json_store::JsonStore, sqlite_store::SqliteStore, CatalogStore};
use crate::data_types::StoreError;

/// Filter target covering the library's modules; binary crate names differ
/// from the library's, so every bin passes this instead of `module_path!()`.
pub const LOG_MODULE: &str = "nutrisense_telegram_rs";

pub fn logger_init(module_path: &str) {
    pretty_env_logger::formatted_timed_builder()
        .filter_level(log::LevelFilter::Info)
        .filter_module(
            module_path,
            if env::var(pretty_env_logger::env_logger::DEFAULT_FILTER_ENV).unwrap_or_default()
                == "debug"
            {
                log::LevelFilter::Debug
            } else {
                log::LevelFilter::Info
            },
        )
        .init();
}

/// Picks the catalog backend from the CLI args: an explicit JSON file wins,
/// otherwise SQLite (defaulting to [`DEFAULT_SQLITE_DB`]).
pub fn open_store(
    json: Option<&Path>,
    database: Option<&Path>,
) -> Result<Box<dyn CatalogStore + Send>, StoreError> {
    match (json, database) {
        (Some(path), _) => {
            log::info!("Using JSON catalog at {}", path.display());
            Ok(Box::new(JsonStore::open(path)?))
        }
        (None, Some(path)) => {
            log::info!("Using SQLite catalog at {}", path.display());
            Ok(Box::new(SqliteStore::open(path)?))
        }
        (None, None) => {
            log::info!("Using SQLite catalog at {}", DEFAULT_SQLITE_DB);
            Ok(Box::new(SqliteStore::open(Path::new(DEFAULT_SQLITE_DB))?))
        }
    }
}
