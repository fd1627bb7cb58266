use std::time::Instant;

use teloxide::{prelude::*, utils::command::BotCommands};
use teloxide_core::types::ParseMode;

use crate::aggregator;
use crate::api;
use crate::bot_command_helpers::{
    ai_extract_food_query, format_recipe_views, format_scaled_results, rex_parse_food_query,
    QueryParseError,
};
use crate::constants::{AI_CONTEXT_TURNS, SYSTEM_BUSY_MSG, UNKNOWN_QUERY_MSG};
use crate::data_backend::SharedStore;
use crate::data_types::{AggregateError, Command, HandlerResult};
use crate::session::{Role, SharedSessions};

pub async fn start(bot: Bot, msg: Message) -> HandlerResult {
    let subtext = "\n\nAtau langsung tulis pertanyaanmu, misal: apel 150";
    bot.send_message(
        msg.chat.id,
        Command::descriptions().to_string() + subtext,
    )
    .await?;
    Ok(())
}

pub async fn invalid_cmd(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "Perintah tidak dikenal.")
        .await?;
    Ok(())
}

/// /gizi <nama> <gram> — single-food lookup with substring fallback.
pub async fn gizi_cmd(bot: Bot, msg: Message, store: SharedStore) -> HandlerResult {
    let argument = msg
        .text()
        .unwrap_or_default()
        .split_once(' ')
        .map(|slices| slices.1.trim());

    let Some((name, weight)) = argument.and_then(rex_parse_food_query) else {
        bot.send_message(msg.chat.id, "Pakai: /gizi <nama> <gram>\nContoh: /gizi apel 150")
            .await?;
        return Ok(());
    };

    let now = Instant::now();
    let looked_up = {
        let store = store.lock().await;
        aggregator::lookup(store.as_ref(), &name, weight)
    };
    log::debug!("Lookup '{}': {:.2?}", name, now.elapsed());

    match looked_up {
        Ok(results) => {
            bot.send_message(msg.chat.id, format_scaled_results(&results))
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Err(e @ AggregateError::Store(_)) => {
            log::error!("lookup failed: {}", e);
            bot.send_message(msg.chat.id, SYSTEM_BUSY_MSG).await?;
        }
        Err(e) => {
            bot.send_message(msg.chat.id, e.to_string()).await?;
        }
    }
    Ok(())
}

/// /resep — list all recipes; /resep <bahan> — only those containing a food.
pub async fn resep_cmd(bot: Bot, msg: Message, store: SharedStore) -> HandlerResult {
    let argument = msg
        .text()
        .unwrap_or_default()
        .split_once(' ')
        .map(|slices| slices.1.trim());

    let now = Instant::now();
    let views = {
        let store = store.lock().await;
        match argument {
            Some(ingredient) if !ingredient.is_empty() => {
                api::recipes_with_ingredient(store.as_ref(), ingredient)
            }
            _ => api::list_recipes(store.as_ref()),
        }
    };
    log::debug!("Recipe list: {:.2?}", now.elapsed());

    match views {
        Ok(views) => {
            bot.send_message(msg.chat.id, format_recipe_views(&views))
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Err(e) => {
            log::error!("recipe list failed: {}", e);
            bot.send_message(msg.chat.id, SYSTEM_BUSY_MSG).await?;
        }
    }
    Ok(())
}

pub async fn lupa_cmd(bot: Bot, msg: Message, sessions: SharedSessions) -> HandlerResult {
    let forgotten = sessions.lock().await.clear(msg.chat.id.0);
    bot.send_message(
        msg.chat.id,
        if forgotten {
            "Riwayat chat dihapus."
        } else {
            "Belum ada riwayat."
        },
    )
    .await?;
    Ok(())
}

/// Free-text questions: regex extraction first, Ollama as fallback, both
/// feeding the same catalog lookup.
pub async fn chat_reply(
    bot: Bot,
    msg: Message,
    store: SharedStore,
    sessions: SharedSessions,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id.0;
    log::info!("Chat from {}: '{}'", chat_id, text);

    let parsed = match rex_parse_food_query(text) {
        Some(query) => Ok(query),
        None => {
            // context from before this message, the prompt carries the message itself
            let context = sessions.lock().await.context(chat_id, AI_CONTEXT_TURNS);
            ai_extract_food_query(&context, text).await
        }
    };
    sessions.lock().await.record(chat_id, Role::User, text);

    let (name, weight) = match parsed {
        Ok(query) => query,
        Err(QueryParseError::InvalidQueryPassed) => {
            bot.send_message(msg.chat.id, UNKNOWN_QUERY_MSG).await?;
            return Ok(());
        }
        Err(QueryParseError::OllamaUnavailable) => {
            bot.send_message(msg.chat.id, SYSTEM_BUSY_MSG).await?;
            return Ok(());
        }
        Err(QueryParseError::OllamaUnconfigured) => {
            bot.send_message(msg.chat.id, UNKNOWN_QUERY_MSG).await?;
            return Ok(());
        }
    };

    let looked_up = {
        let store = store.lock().await;
        aggregator::lookup(store.as_ref(), &name, weight)
    };

    let reply = match looked_up {
        Ok(results) => {
            let reply = format_scaled_results(&results);
            bot.send_message(msg.chat.id, reply.as_str())
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
            reply
        }
        Err(e @ AggregateError::Store(_)) => {
            log::error!("chat lookup failed: {}", e);
            bot.send_message(msg.chat.id, SYSTEM_BUSY_MSG).await?;
            SYSTEM_BUSY_MSG.to_string()
        }
        Err(e) => {
            let reply = e.to_string();
            bot.send_message(msg.chat.id, reply.as_str()).await?;
            reply
        }
    };

    sessions.lock().await.record(chat_id, Role::Bot, &reply);
    Ok(())
}
