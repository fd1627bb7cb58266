use std::{collections::BTreeMap, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use nutrisense_telegram_rs::api::{self, FoodUpsertRequest, LineDto, RecipeUpsertRequest};
use nutrisense_telegram_rs::data_backend::CatalogStore;
use nutrisense_telegram_rs::data_types::{AggregateError, Nutrient};
use nutrisense_telegram_rs::shared_main::{logger_init, open_store, LOG_MODULE};

/// Admin CLI for the Nutrisense catalog. Responses are printed as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite catalog file
    #[arg(short, long, env = "NUTRISENSE_DB")]
    database: Option<PathBuf>,
    /// JSON catalog file (instead of SQLite)
    #[arg(short, long, env = "NUTRISENSE_JSON", conflicts_with = "database")]
    json: Option<PathBuf>,
    #[command(subcommand)]
    cmd: AdminCommand,
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// List all foods with their nutrient tables
    ListFoods,
    /// Add or overwrite a food
    AddFood {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        /// Repeatable, e.g. --nutrient kalori:52:kkal
        #[arg(long = "nutrient", value_name = "NAME:VALUE:UNIT")]
        nutrients: Vec<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Edit (and possibly rename) an existing food
    EditFood {
        #[arg(long)]
        old_name: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: String,
        #[arg(long = "nutrient", value_name = "NAME:VALUE:UNIT")]
        nutrients: Vec<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Delete a food (recipes referencing it are left alone)
    DeleteFood { name: String },
    /// List all recipes with nutrient rollups
    ListRecipes,
    /// Add or overwrite a recipe
    AddRecipe {
        #[arg(long)]
        title: String,
        /// Steps, newline-separated
        #[arg(long, default_value = "")]
        description: String,
        /// Repeatable, e.g. --ingredient apel:150
        #[arg(long = "ingredient", value_name = "NAME:GRAMS")]
        ingredients: Vec<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Edit (and possibly rename) an existing recipe
    EditRecipe {
        #[arg(long)]
        old_title: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "ingredient", value_name = "NAME:GRAMS")]
        ingredients: Vec<String>,
        #[arg(long)]
        image: Option<String>,
    },
    /// Delete a recipe
    DeleteRecipe { title: String },
    /// Scaled nutrient totals for an ingredient list
    Totals {
        /// e.g. apel:150 nasi:200
        #[arg(value_name = "NAME:GRAMS", required = true)]
        ingredients: Vec<String>,
    },
    /// Single-food lookup with substring fallback
    Lookup { name: String, weight: f64 },
    /// Recipes containing the given food
    RecipesWith { name: String },
}

fn parse_nutrients(specs: &[String]) -> Result<BTreeMap<String, Nutrient>> {
    let mut table = BTreeMap::new();
    for spec in specs {
        let mut parts = spec.splitn(3, ':');
        let (Some(name), Some(value), Some(unit)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("nutrient '{}' is not NAME:VALUE:UNIT", spec);
        };
        let value: f64 = value
            .parse()
            .with_context(|| format!("nutrient value in '{}'", spec))?;
        table.insert(
            name.trim().to_string(),
            Nutrient {
                value,
                unit: unit.trim().to_string(),
            },
        );
    }
    Ok(table)
}

fn parse_lines(specs: &[String]) -> Result<Vec<LineDto>> {
    specs
        .iter()
        .map(|spec| {
            let Some((name, grams)) = spec.rsplit_once(':') else {
                bail!("ingredient '{}' is not NAME:GRAMS", spec);
            };
            let weight: f64 = grams
                .parse()
                .with_context(|| format!("ingredient weight in '{}'", spec))?;
            Ok(LineDto {
                name: name.trim().to_string(),
                weight,
            })
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct OkResponse {
    success: bool,
}

const OK: OkResponse = OkResponse { success: true };

fn run(args: Args) -> Result<(), AggregateError> {
    let mut store = open_store(args.json.as_deref(), args.database.as_deref())?;
    let store: &mut dyn CatalogStore = store.as_mut();

    let printed = match args.cmd {
        AdminCommand::ListFoods => print_json(&api::list_foods(store)?),
        AdminCommand::AddFood {
            name,
            category,
            nutrients,
            image,
        } => {
            let req = FoodUpsertRequest {
                name,
                category,
                image,
                nutrients: parse_nutrients(&nutrients)
                    .map_err(|e| AggregateError::InvalidInput(e.to_string()))?,
            };
            api::add_food(store, req)?;
            print_json(&OK)
        }
        AdminCommand::EditFood {
            old_name,
            name,
            category,
            nutrients,
            image,
        } => {
            let req = FoodUpsertRequest {
                name,
                category,
                image,
                nutrients: parse_nutrients(&nutrients)
                    .map_err(|e| AggregateError::InvalidInput(e.to_string()))?,
            };
            api::edit_food(store, &old_name, req)?;
            print_json(&OK)
        }
        AdminCommand::DeleteFood { name } => {
            api::delete_food(store, &name)?;
            print_json(&OK)
        }
        AdminCommand::ListRecipes => print_json(&api::list_recipes(store)?),
        AdminCommand::AddRecipe {
            title,
            description,
            ingredients,
            image,
        } => {
            let req = RecipeUpsertRequest {
                title,
                description,
                image,
                ingredients: parse_lines(&ingredients)
                    .map_err(|e| AggregateError::InvalidInput(e.to_string()))?,
            };
            api::add_recipe(store, req)?;
            print_json(&OK)
        }
        AdminCommand::EditRecipe {
            old_title,
            title,
            description,
            ingredients,
            image,
        } => {
            let req = RecipeUpsertRequest {
                title,
                description,
                image,
                ingredients: parse_lines(&ingredients)
                    .map_err(|e| AggregateError::InvalidInput(e.to_string()))?,
            };
            api::edit_recipe(store, &old_title, req)?;
            print_json(&OK)
        }
        AdminCommand::DeleteRecipe { title } => {
            api::delete_recipe(store, &title)?;
            print_json(&OK)
        }
        AdminCommand::Totals { ingredients } => {
            let lines =
                parse_lines(&ingredients).map_err(|e| AggregateError::InvalidInput(e.to_string()))?;
            print_json(&api::compute_totals(store, &lines)?)
        }
        AdminCommand::Lookup { name, weight } => {
            print_json(&api::lookup_food(store, &name, weight)?)
        }
        AdminCommand::RecipesWith { name } => {
            print_json(&api::recipes_with_ingredient(store, &name)?)
        }
    };

    printed.map_err(|e| AggregateError::InvalidInput(e.to_string()))
}

fn main() {
    let args = Args::parse();
    logger_init(LOG_MODULE);

    if let Err(e) = run(args) {
        log::error!("[{}] {}", e.status(), e);
        std::process::exit(1);
    }
}
