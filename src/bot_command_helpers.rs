use rand::Rng;
use regex_lite::Regex;
use serde::Deserialize;
use serde_json::json;
use static_init::dynamic;
use teloxide::utils::markdown;
use thiserror::Error;

use crate::aggregator::ScaledFood;
use crate::api::RecipeView;
use crate::constants::{EMOJIS, OLLAMA_HOST, OLLAMA_MODEL};

#[derive(Error, Debug, Clone)]
pub enum QueryParseError {
    #[error("Pertanyaan tidak dikenali")]
    InvalidQueryPassed,
    #[error("Ollama API tidak dapat dihubungi")]
    OllamaUnavailable,
    #[error("Ollama API belum dikonfigurasi")]
    OllamaUnconfigured,
}

/// Fast path for messages like "apel 150", "nasi goreng 250 gram".
pub fn rex_parse_food_query(txt: &str) -> Option<(String, f64)> {
    #[dynamic]
    static RE: Regex =
        Regex::new(r"^\s*([^\d;:]+?)\s+(\d+(?:[.,]\d+)?)\s*(?:g|gr|gram)?\s*\??\s*$").unwrap();

    let lowered = txt.to_lowercase();
    let caps = RE.captures(&lowered)?;
    let name = caps.get(1).unwrap().as_str().trim().to_string();
    let weight = caps
        .get(2)
        .unwrap()
        .as_str()
        .replace(',', ".")
        .parse::<f64>()
        .ok()?;

    Some((name, weight))
}

/// Ollama fallback for free-form questions. Single-shot generate call, strict
/// answer format so the model cannot ramble.
pub async fn ai_extract_food_query(
    context: &str,
    txt: &str,
) -> Result<(String, f64), QueryParseError> {
    let ollama_host = OLLAMA_HOST.get().unwrap();
    let ollama_model = OLLAMA_MODEL.get().unwrap();

    if ollama_host.is_none() || ollama_model.is_none() {
        log::warn!("Ollama API is unconfigured, cannot fancy-parse food query");
        return Err(QueryParseError::OllamaUnconfigured);
    }

    let prompt = format!(
        "Temukan SATU nama makanan dan berat dalam gram. \
         Jawab HANYA 'nama;gram' ATAU 'tidak ada'. TANPA PENJELASAN.\n\
         Konteks:\n{}\nPesan: #{}#",
        context, txt
    );

    let client = reqwest::Client::new();
    let params = json!(
        {
            "model": ollama_model.as_ref().unwrap(),
            "prompt": &prompt,
            "stream": false,
            "keep_alive": -1
        }
    );

    log::info!("AI Query: '{}'", prompt);

    let res = client
        .post(format!("{}/generate", ollama_host.as_ref().unwrap()))
        .body(params.to_string())
        .send()
        .await;

    let res = match res {
        Ok(res) => res,
        Err(e) => {
            log::warn!("Ollama API unavailable: {}", e);
            return Err(QueryParseError::OllamaUnavailable);
        }
    };

    #[derive(Deserialize, Debug)]
    struct LlamaResponse {
        response: String,
        #[allow(dead_code)]
        done: bool,
    }

    let txt = res
        .text()
        .await
        .map_err(|_| QueryParseError::OllamaUnavailable)?;
    let struct_ai_resp: LlamaResponse =
        serde_json::from_str(&txt).map_err(|_| QueryParseError::OllamaUnavailable)?;

    log::info!("AI Response: '{}'", struct_ai_resp.response);
    parse_ai_answer(&struct_ai_resp.response)
}

fn parse_ai_answer(answer: &str) -> Result<(String, f64), QueryParseError> {
    let answer = answer.trim();
    let Some((name, grams)) = answer.split_once(';') else {
        return Err(QueryParseError::InvalidQueryPassed);
    };

    let name = name.trim().to_lowercase();
    let weight = grams
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic())
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|_| QueryParseError::InvalidQueryPassed)?;

    if name.is_empty() || weight <= 0.0 {
        return Err(QueryParseError::InvalidQueryPassed);
    }
    Ok((name, weight))
}

pub fn escape_markdown_v2(input: &str) -> String {
    // all 'special' chars have to be escaped when using telegram markdown_v2
    input
        .replace('.', r"\.")
        .replace('!', r"\!")
        .replace('+', r"\+")
        .replace('-', r"\-")
        .replace('<', r"\<")
        .replace('>', r"\>")
        .replace('(', r"\(")
        .replace(')', r"\)")
        .replace('=', r"\=")
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

pub fn format_scaled_results(results: &[ScaledFood]) -> String {
    let rand_emoji = EMOJIS[rand::thread_rng().gen_range(0..EMOJIS.len())];
    let mut msg = String::new();

    for scaled in results {
        msg += &format!(
            "{} {} {}\n",
            rand_emoji,
            markdown::bold(&format!("{} ({} g)", capitalize(&scaled.name), scaled.weight)),
            rand_emoji,
        );

        for (nutrient, value) in &scaled.nutrients {
            let unit = scaled.units.get(nutrient).map_or("", String::as_str);
            msg += &format!(" • {}: {} {}\n", markdown::italic(nutrient), value, unit);
        }
        msg += "\n";
    }

    escape_markdown_v2(&msg)
}

pub fn format_recipe_views(views: &[RecipeView]) -> String {
    if views.is_empty() {
        return escape_markdown_v2(&markdown::bold("Belum ada resep."));
    }

    let mut msg = String::new();
    for view in views {
        msg += &format!("{}\n", markdown::bold(&capitalize(&view.title)));

        for line in &view.ingredients {
            msg += &format!(" • {} ({} g)\n", line.name, line.weight);
        }

        if !view.description.is_empty() {
            for step in view.description.lines() {
                msg += &format!("   {}\n", markdown::italic(step));
            }
        }

        msg += &format!("   {}\n", markdown::underline("Total gizi:"));
        for (nutrient, value) in &view.totals {
            let unit = view.units.get(nutrient).map_or("", String::as_str);
            msg += &format!("     + {}: {} {}\n", nutrient, value, unit);
        }
        msg += "\n";
    }

    escape_markdown_v2(&msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rex_parses_simple_queries() {
        assert_eq!(rex_parse_food_query("apel 150"), Some(("apel".into(), 150.0)));
        assert_eq!(
            rex_parse_food_query("  Nasi Goreng 250 gram "),
            Some(("nasi goreng".into(), 250.0))
        );
        assert_eq!(
            rex_parse_food_query("ayam 62,5g?"),
            Some(("ayam".into(), 62.5))
        );
        assert_eq!(rex_parse_food_query("berapa ya"), None);
        assert_eq!(rex_parse_food_query("150"), None);
    }

    #[test]
    fn ai_answer_parsing_is_strict() {
        assert_eq!(parse_ai_answer("Apel; 150").unwrap(), ("apel".into(), 150.0));
        assert_eq!(parse_ai_answer("ayam;62,5 gram").unwrap(), ("ayam".into(), 62.5));
        assert!(parse_ai_answer("tidak ada").is_err());
        assert!(parse_ai_answer("apel;banyak").is_err());
        assert!(parse_ai_answer(";100").is_err());
    }
}
