//! Bounded per-chat conversation memory for the bot. Explicitly constructed
//! and injected into the handlers, never ambient state.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    sync::Arc,
};

use chrono::{DateTime, Duration, Local};
use tokio::sync::Mutex;

use crate::constants::{SESSION_IDLE_HOURS, SESSION_MAX_TURNS};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::User => "user",
            Role::Bot => "bot",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Local>,
}

pub struct SessionStore {
    turns: BTreeMap<i64, VecDeque<ChatTurn>>,
    max_turns: usize,
}

pub type SharedSessions = Arc<Mutex<SessionStore>>;

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::new(SESSION_MAX_TURNS)
    }
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        SessionStore {
            turns: BTreeMap::new(),
            max_turns,
        }
    }

    /// Appends a turn, evicting the oldest one past the per-chat cap, and
    /// sweeps chats that have gone idle.
    pub fn record(&mut self, chat_id: i64, role: Role, text: &str) {
        let now = Local::now();

        let history = self.turns.entry(chat_id).or_default();
        history.push_back(ChatTurn {
            role,
            text: text.to_string(),
            at: now,
        });
        while history.len() > self.max_turns {
            history.pop_front();
        }

        let idle_cutoff = now - Duration::hours(SESSION_IDLE_HOURS);
        self.turns
            .retain(|_, history| history.back().is_some_and(|turn| turn.at >= idle_cutoff));
    }

    /// The last `max` turns formatted `role: text`, oldest first. Empty string
    /// for unknown chats.
    pub fn context(&self, chat_id: i64, max: usize) -> String {
        let Some(history) = self.turns.get(&chat_id) else {
            return String::new();
        };

        let skip = history.len().saturating_sub(max);
        history
            .iter()
            .skip(skip)
            .map(|turn| format!("{}: {}", turn.role, turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns whether there was anything to forget.
    pub fn clear(&mut self, chat_id: i64) -> bool {
        self.turns.remove(&chat_id).is_some()
    }
}
