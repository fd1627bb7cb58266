use std::path::Path;

use rusqlite::Connection;

use crate::data_backend::{json_store::JsonStore, sqlite_store::SqliteStore, CatalogStore};
use crate::data_types::StoreError;

pub fn check_or_create_db_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.prepare(
        "create table if not exists foods (
            id integer primary key autoincrement,
            name text not null unique,
            category text not null,
            image text
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists nutrients (
            id integer primary key autoincrement,
            food_id integer not null,
            name text not null,
            value real not null,
            unit text not null,
            foreign key (food_id) references foods(id)
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists recipes (
            id integer primary key autoincrement,
            title text not null unique,
            description text not null default '',
            image text
        )",
    )?
    .execute([])?;

    conn.prepare(
        "create table if not exists recipe_ingredients (
            id integer primary key autoincrement,
            recipe_id integer not null,
            food_name text not null,
            weight real not null,
            foreign key (recipe_id) references recipes(id)
        )",
    )?
    .execute([])?;

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub foods: usize,
    pub nutrients: usize,
    pub recipes: usize,
    pub skipped_ingredients: usize,
}

/// Copies one catalog into another. The target keeps nothing of its previous
/// content for colliding names; recipe ingredient lines naming foods the source
/// does not have are dropped with a warning, matching the flat-file era where
/// recipes could outlive their foods.
pub fn import_catalog(
    src: &dyn CatalogStore,
    dst: &mut dyn CatalogStore,
) -> Result<ImportStats, StoreError> {
    let mut stats = ImportStats::default();

    for food in src.all_foods()? {
        stats.nutrients += food.nutrients.len();
        dst.put_food(food)?;
        stats.foods += 1;
    }

    for mut recipe in src.all_recipes()? {
        let before = recipe.ingredients.len();
        let mut kept = Vec::with_capacity(before);
        for line in recipe.ingredients {
            if src.food(&line.name)?.is_some() {
                kept.push(line);
            } else {
                log::warn!(
                    "recipe '{}': ingredient '{}' not in catalog, skipping it",
                    recipe.title,
                    line.name
                );
            }
        }
        stats.skipped_ingredients += before - kept.len();
        recipe.ingredients = kept;

        dst.put_recipe(recipe)?;
        stats.recipes += 1;
    }

    Ok(stats)
}

/// One-shot migration used by the migrate binary.
pub fn migrate_json_to_sqlite(json_path: &Path, db_path: &Path) -> Result<ImportStats, StoreError> {
    let src = JsonStore::open(json_path)?;
    let mut dst = SqliteStore::open(db_path)?;

    let stats = import_catalog(&src, &mut dst)?;
    log::info!(
        "migrated {} foods ({} nutrient rows), {} recipes; {} dangling ingredient lines skipped",
        stats.foods,
        stats.nutrients,
        stats.recipes,
        stats.skipped_ingredients
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{Category, Food, IngredientLine, Nutrient, Recipe};
    use std::collections::BTreeMap;

    #[test]
    fn import_copies_foods_and_drops_dangling_ingredients() {
        let mut src = JsonStore::in_memory();
        src.put_food(Food {
            name: "apel".into(),
            category: Category::Buah,
            image: None,
            nutrients: BTreeMap::from([(
                "kalori".to_string(),
                Nutrient {
                    value: 52.0,
                    unit: "kkal".into(),
                },
            )]),
        })
        .unwrap();
        src.put_recipe(Recipe {
            title: "Salad".into(),
            description: String::new(),
            image: None,
            ingredients: vec![
                IngredientLine {
                    name: "apel".into(),
                    weight: 100.0,
                },
                IngredientLine {
                    name: "mangga".into(),
                    weight: 50.0,
                },
            ],
        })
        .unwrap();

        let mut dst = SqliteStore::open_in_memory().unwrap();
        let stats = import_catalog(&src, &mut dst).unwrap();

        assert_eq!(
            stats,
            ImportStats {
                foods: 1,
                nutrients: 1,
                recipes: 1,
                skipped_ingredients: 1
            }
        );

        let salad = dst.recipe("Salad").unwrap().unwrap();
        assert_eq!(salad.ingredients.len(), 1);
        assert_eq!(salad.ingredients[0].name, "apel");
    }
}
