use std::sync::OnceLock;

pub const DEFAULT_SQLITE_DB: &str = "nutrisense.sqlite";

/// Unit assumed for nutrient rows that never specified one (legacy catalog files).
pub const DEFAULT_UNIT: &str = "g";

/// Turns kept per chat before the oldest get evicted.
pub const SESSION_MAX_TURNS: usize = 8;

/// Chats idle longer than this are dropped from session memory entirely.
pub const SESSION_IDLE_HOURS: i64 = 24;

/// How many trailing turns are handed to the Ollama extractor as context.
pub const AI_CONTEXT_TURNS: usize = 2;

pub const UNKNOWN_QUERY_MSG: &str =
    "Maaf, aku belum paham. Tulis nama makanan dan beratnya, misal: apel 150";
pub const SYSTEM_BUSY_MSG: &str =
    "Maaf, data tidak ditemukan atau ada gangguan sistem. Coba nama makanan lain.";

pub const EMOJIS: [&str; 7] = ["🍎", "🥦", "🍚", "🐟", "🥩", "🍌", "🌶️"];

pub static OLLAMA_HOST: OnceLock<Option<String>> = OnceLock::new();
pub static OLLAMA_MODEL: OnceLock<Option<String>> = OnceLock::new();
