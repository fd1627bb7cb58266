use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use teloxide::utils::command::BotCommands;
use thiserror::Error;

/// Fixed category set for catalog foods.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Buah,
    Sayur,
    Daging,
    Beras,
    Ikan,
    BijiBijian,
    UmbiUmbian,
    RempahRempah,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Buah,
        Category::Sayur,
        Category::Daging,
        Category::Beras,
        Category::Ikan,
        Category::BijiBijian,
        Category::UmbiUmbian,
        Category::RempahRempah,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Buah => "buah",
            Category::Sayur => "sayur",
            Category::Daging => "daging",
            Category::Beras => "beras",
            Category::Ikan => "ikan",
            Category::BijiBijian => "biji-bijian",
            Category::UmbiUmbian => "umbi-umbian",
            Category::RempahRempah => "rempah-rempah",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(s)
    }
}

/// One nutrient row. `value` is the amount per 100g of the food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub value: f64,
    pub unit: String,
}

pub type NutrientTable = BTreeMap<String, Nutrient>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub name: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub nutrients: NutrientTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub ingredients: Vec<IngredientLine>,
}

/// Persistence faults. Not user errors, the interface layer words these as
/// "system busy" and maps them to a 500.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("kategori tidak dikenal: {0}")]
    BadCategory(String),
}

/// The only error kinds the lookup/aggregation surface produces.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Bahan \"{0}\" tidak ditemukan di database. Pastikan penulisan benar.")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AggregateError {
    /// HTTP-ish status for the external interface contract.
    pub fn status(&self) -> u16 {
        match self {
            AggregateError::NotFound(_) => 404,
            AggregateError::InvalidInput(_) => 400,
            AggregateError::Store(_) => 500,
        }
    }
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "Cek gizi: /gizi <nama> <gram>")]
    Gizi,
    #[command(description = "Lihat resep: /resep [bahan]\n")]
    Resep,
    #[command(description = "Hapus riwayat chat")]
    Lupa,
    #[command(description = "Tampilkan bantuan")]
    Start,
}

pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrips_through_str() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert_eq!(" Biji-Bijian ".parse::<Category>().unwrap(), Category::BijiBijian);
        assert!("kayu".parse::<Category>().is_err());
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(AggregateError::NotFound("apel".into()).status(), 404);
        assert_eq!(AggregateError::InvalidInput("x".into()).status(), 400);
    }

    #[test]
    fn command_help_lists_all_commands() {
        let help = Command::descriptions().to_string();
        for cmd in ["/gizi", "/resep", "/lupa", "/start"] {
            assert!(help.contains(cmd), "missing {} in help text", cmd);
        }
    }
}
