use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use log::log_enabled;
use teloxide::{dispatching::UpdateHandler, prelude::*};
use tokio::sync::Mutex;

use nutrisense_telegram_rs::bot_command_handlers::{
    chat_reply, gizi_cmd, invalid_cmd, lupa_cmd, resep_cmd, start,
};
use nutrisense_telegram_rs::constants::{OLLAMA_HOST, OLLAMA_MODEL};
use nutrisense_telegram_rs::data_backend::SharedStore;
use nutrisense_telegram_rs::data_types::Command;
use nutrisense_telegram_rs::session::{SessionStore, SharedSessions};
use nutrisense_telegram_rs::shared_main::{logger_init, open_store, LOG_MODULE};

/// Telegram bot answering nutrition questions against the Nutrisense catalog.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// The telegram bot token to be used
    #[arg(short, long, env)]
    token: String,
    /// SQLite catalog file
    #[arg(short, long, env = "NUTRISENSE_DB")]
    database: Option<PathBuf>,
    /// JSON catalog file (instead of SQLite)
    #[arg(short, long, env = "NUTRISENSE_JSON", conflicts_with = "database")]
    json: Option<PathBuf>,
    /// Enable verbose logging (mostly performance metrics){n}[SETS env: RUST_LOG=debug]
    #[arg(short, long)]
    verbose: bool,
    /// Ollama API host for free-text question parsing{n}Example: <http://127.0.0.1:11434/api>
    #[arg(long, env = "OLLAMA_HOST")]
    ollama_host: Option<String>,
    /// Ollama model for inference{n}Example: 'llama3:latest'
    #[arg(long, env = "OLLAMA_MODEL")]
    ollama_model: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    OLLAMA_HOST.get_or_init(|| args.ollama_host);
    OLLAMA_MODEL.get_or_init(|| args.ollama_model);

    if args.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }

    logger_init(LOG_MODULE);
    log::info!("Starting bot...");

    if !(log_enabled!(log::Level::Debug) || log_enabled!(log::Level::Trace)) {
        log::info!("Enable verbose logging for performance metrics");
    }

    let store = match open_store(args.json.as_deref(), args.database.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            log::error!("Cannot open catalog: {}", e);
            std::process::exit(1);
        }
    };
    let store: SharedStore = Arc::new(Mutex::new(store));
    let sessions: SharedSessions = Arc::new(Mutex::new(SessionStore::default()));

    let bot = Bot::new(args.token);

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![store, sessions])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(dptree::case![Command::Start].endpoint(start))
        .branch(dptree::case![Command::Gizi].endpoint(gizi_cmd))
        .branch(dptree::case![Command::Resep].endpoint(resep_cmd))
        .branch(dptree::case![Command::Lupa].endpoint(lupa_cmd));

    Update::filter_message()
        .branch(command_handler)
        .branch(
            dptree::filter(|msg: Message| {
                msg.text().is_some_and(|text| !text.starts_with('/'))
            })
            .endpoint(chat_reply),
        )
        .branch(dptree::endpoint(invalid_cmd))
}
