//! JSON-shaped request/response layer over the catalog. Callers (the admin
//! CLI, the bot) turn [`AggregateError::status`] into their own exit codes or
//! reply wording; no HTTP server lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    aggregator::{self, NutrientTotals, ScaledFood},
    data_backend::{normalize, CatalogStore},
    data_types::{
        AggregateError, Category, Food, IngredientLine, Nutrient, Recipe,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDto {
    pub name: String,
    pub weight: f64,
}

impl From<LineDto> for IngredientLine {
    fn from(dto: LineDto) -> Self {
        IngredientLine {
            name: dto.name,
            weight: dto.weight,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub totals: BTreeMap<String, f64>,
    pub units: BTreeMap<String, String>,
}

impl From<NutrientTotals> for TotalsResponse {
    fn from(t: NutrientTotals) -> Self {
        TotalsResponse {
            totals: t.totals,
            units: t.units,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub results: Vec<ScaledFood>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoodUpsertRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    pub nutrients: BTreeMap<String, Nutrient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeUpsertRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    pub ingredients: Vec<LineDto>,
}

/// A recipe as presented to users: stored fields plus its nutrient rollup.
#[derive(Debug, Serialize)]
pub struct RecipeView {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub ingredients: Vec<IngredientLine>,
    pub totals: BTreeMap<String, f64>,
    pub units: BTreeMap<String, String>,
}

pub fn compute_totals(
    store: &dyn CatalogStore,
    lines: &[LineDto],
) -> Result<TotalsResponse, AggregateError> {
    let lines: Vec<IngredientLine> = lines.iter().cloned().map(IngredientLine::from).collect();
    Ok(aggregator::aggregate(store, &lines)?.into())
}

pub fn lookup_food(
    store: &dyn CatalogStore,
    name: &str,
    weight: f64,
) -> Result<LookupResponse, AggregateError> {
    Ok(LookupResponse {
        results: aggregator::lookup(store, name, weight)?,
    })
}

fn validate_food(req: FoodUpsertRequest) -> Result<Food, AggregateError> {
    let name = normalize(&req.name);
    if name.is_empty() {
        return Err(AggregateError::InvalidInput(
            "Nama makanan wajib diisi".to_string(),
        ));
    }

    let category = req
        .category
        .parse::<Category>()
        .map_err(|_| AggregateError::InvalidInput("Kategori tidak valid".to_string()))?;

    if req.nutrients.is_empty() {
        return Err(AggregateError::InvalidInput(
            "Minimal satu data gizi harus diisi".to_string(),
        ));
    }
    for (nutrient_name, nutrient) in &req.nutrients {
        if nutrient_name.trim().is_empty()
            || nutrient.unit.trim().is_empty()
            || !nutrient.value.is_finite()
            || nutrient.value < 0.0
        {
            return Err(AggregateError::InvalidInput(format!(
                "Data gizi \"{}\" tidak valid",
                nutrient_name
            )));
        }
    }

    Ok(Food {
        name,
        category,
        image: req.image,
        nutrients: req.nutrients,
    })
}

fn validate_recipe(
    store: &dyn CatalogStore,
    req: RecipeUpsertRequest,
) -> Result<Recipe, AggregateError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(AggregateError::InvalidInput("Judul wajib diisi".to_string()));
    }
    if req.ingredients.is_empty() {
        return Err(AggregateError::InvalidInput(
            "Minimal satu bahan wajib ada".to_string(),
        ));
    }

    let mut ingredients = Vec::with_capacity(req.ingredients.len());
    for line in req.ingredients {
        if !line.weight.is_finite() || line.weight <= 0.0 {
            return Err(AggregateError::InvalidInput(format!(
                "Berat untuk \"{}\" harus berupa angka positif",
                line.name
            )));
        }
        let name = normalize(&line.name);
        if store.food(&name)?.is_none() {
            return Err(AggregateError::InvalidInput(format!(
                "Bahan \"{}\" tidak ditemukan di database",
                line.name
            )));
        }
        ingredients.push(IngredientLine {
            name,
            weight: line.weight,
        });
    }

    Ok(Recipe {
        title,
        description: req.description.trim().to_string(),
        image: req.image,
        ingredients,
    })
}

pub fn add_food(
    store: &mut dyn CatalogStore,
    req: FoodUpsertRequest,
) -> Result<(), AggregateError> {
    let food = validate_food(req)?;
    store.put_food(food)?;
    Ok(())
}

/// Rename-aware edit. A missing replacement image keeps the stored one.
pub fn edit_food(
    store: &mut dyn CatalogStore,
    old_name: &str,
    req: FoodUpsertRequest,
) -> Result<(), AggregateError> {
    let old_name = normalize(old_name);
    let existing = store
        .food(&old_name)?
        .ok_or_else(|| AggregateError::NotFound(old_name.clone()))?;

    let mut food = validate_food(req)?;
    if food.image.is_none() {
        food.image = existing.image;
    }

    if food.name != old_name {
        store.delete_food(&old_name)?;
    }
    store.put_food(food)?;
    Ok(())
}

pub fn delete_food(store: &mut dyn CatalogStore, name: &str) -> Result<(), AggregateError> {
    if !store.delete_food(name)? {
        return Err(AggregateError::NotFound(name.trim().to_string()));
    }
    Ok(())
}

pub fn list_foods(store: &dyn CatalogStore) -> Result<Vec<Food>, AggregateError> {
    Ok(store.all_foods()?)
}

pub fn add_recipe(
    store: &mut dyn CatalogStore,
    req: RecipeUpsertRequest,
) -> Result<(), AggregateError> {
    let recipe = validate_recipe(store, req)?;
    store.put_recipe(recipe)?;
    Ok(())
}

pub fn edit_recipe(
    store: &mut dyn CatalogStore,
    old_title: &str,
    req: RecipeUpsertRequest,
) -> Result<(), AggregateError> {
    let old_title = old_title.trim().to_string();
    let existing = store
        .recipe(&old_title)?
        .ok_or_else(|| AggregateError::NotFound(old_title.clone()))?;

    let mut recipe = validate_recipe(store, req)?;
    if recipe.image.is_none() {
        recipe.image = existing.image;
    }

    if recipe.title != old_title {
        store.delete_recipe(&old_title)?;
    }
    store.put_recipe(recipe)?;
    Ok(())
}

pub fn delete_recipe(store: &mut dyn CatalogStore, title: &str) -> Result<(), AggregateError> {
    if !store.delete_recipe(title)? {
        return Err(AggregateError::NotFound(title.trim().to_string()));
    }
    Ok(())
}

fn into_view(store: &dyn CatalogStore, recipe: Recipe) -> Result<RecipeView, AggregateError> {
    let rollup = aggregator::recipe_rollup(store, &recipe)?;
    Ok(RecipeView {
        title: recipe.title,
        description: recipe.description,
        image: recipe.image,
        ingredients: recipe.ingredients,
        totals: rollup.totals,
        units: rollup.units,
    })
}

/// Every stored recipe with its rollup attached.
pub fn list_recipes(store: &dyn CatalogStore) -> Result<Vec<RecipeView>, AggregateError> {
    store
        .all_recipes()?
        .into_iter()
        .map(|recipe| into_view(store, recipe))
        .collect()
}

/// Recipes containing the given food as an ingredient, rollup attached.
pub fn recipes_with_ingredient(
    store: &dyn CatalogStore,
    name: &str,
) -> Result<Vec<RecipeView>, AggregateError> {
    let name = normalize(name);
    store
        .all_recipes()?
        .into_iter()
        .filter(|recipe| {
            recipe
                .ingredients
                .iter()
                // legacy catalog files may carry unnormalized ingredient names
                .any(|line| normalize(&line.name) == name)
        })
        .map(|recipe| into_view(store, recipe))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_backend::json_store::JsonStore;

    fn food_req(name: &str, kalori: f64) -> FoodUpsertRequest {
        FoodUpsertRequest {
            name: name.into(),
            category: "buah".into(),
            image: None,
            nutrients: BTreeMap::from([(
                "kalori".to_string(),
                Nutrient {
                    value: kalori,
                    unit: "kkal".into(),
                },
            )]),
        }
    }

    fn recipe_req(title: &str, lines: &[(&str, f64)]) -> RecipeUpsertRequest {
        RecipeUpsertRequest {
            title: title.into(),
            description: "Campur semua.".into(),
            image: None,
            ingredients: lines
                .iter()
                .map(|(n, w)| LineDto {
                    name: n.to_string(),
                    weight: *w,
                })
                .collect(),
        }
    }

    #[test]
    fn add_food_validates_category_and_nutrients() {
        let mut store = JsonStore::in_memory();

        let mut bad_cat = food_req("apel", 52.0);
        bad_cat.category = "kayu".into();
        assert!(matches!(
            add_food(&mut store, bad_cat),
            Err(AggregateError::InvalidInput(_))
        ));

        let mut no_gizi = food_req("apel", 52.0);
        no_gizi.nutrients.clear();
        assert!(matches!(
            add_food(&mut store, no_gizi),
            Err(AggregateError::InvalidInput(_))
        ));

        add_food(&mut store, food_req(" Apel ", 52.0)).unwrap();
        assert!(store.food("apel").unwrap().is_some());
    }

    #[test]
    fn edit_food_renames_and_keeps_image() {
        let mut store = JsonStore::in_memory();
        let mut req = food_req("apel", 52.0);
        req.image = Some("apel.jpg".into());
        add_food(&mut store, req).unwrap();

        edit_food(&mut store, "apel", food_req("apel merah", 54.0)).unwrap();

        assert!(store.food("apel").unwrap().is_none());
        let renamed = store.food("apel merah").unwrap().unwrap();
        assert_eq!(renamed.image.as_deref(), Some("apel.jpg"));
        assert_eq!(renamed.nutrients["kalori"].value, 54.0);
    }

    #[test]
    fn edit_missing_food_is_not_found() {
        let mut store = JsonStore::in_memory();
        assert!(matches!(
            edit_food(&mut store, "hilang", food_req("apel", 52.0)),
            Err(AggregateError::NotFound(_))
        ));
        assert!(matches!(
            delete_food(&mut store, "hilang"),
            Err(AggregateError::NotFound(_))
        ));
    }

    #[test]
    fn recipe_requires_known_ingredients() {
        let mut store = JsonStore::in_memory();
        add_food(&mut store, food_req("a", 10.0)).unwrap();

        assert!(matches!(
            add_recipe(&mut store, recipe_req("Campur", &[("a", 100.0), ("b", 50.0)])),
            Err(AggregateError::InvalidInput(_))
        ));
        assert!(matches!(
            add_recipe(&mut store, recipe_req("Campur", &[("a", -1.0)])),
            Err(AggregateError::InvalidInput(_))
        ));
        assert!(matches!(
            add_recipe(&mut store, recipe_req("Campur", &[])),
            Err(AggregateError::InvalidInput(_))
        ));

        add_recipe(&mut store, recipe_req("Campur", &[("a", 100.0)])).unwrap();
        assert!(store.recipe("Campur").unwrap().is_some());
    }

    #[test]
    fn list_recipes_attaches_rollup_and_tolerates_deleted_food() {
        let mut store = JsonStore::in_memory();
        add_food(&mut store, food_req("a", 10.0)).unwrap();
        add_food(&mut store, food_req("b", 20.0)).unwrap();
        add_recipe(&mut store, recipe_req("Campur", &[("a", 100.0), ("b", 200.0)])).unwrap();

        let views = list_recipes(&store).unwrap();
        assert_eq!(views[0].totals["kalori"], 50.0);

        // no cascade on food deletion, rollup just skips the gone ingredient
        delete_food(&mut store, "b").unwrap();
        let views = list_recipes(&store).unwrap();
        assert_eq!(views[0].totals["kalori"], 10.0);
    }

    #[test]
    fn recipes_with_ingredient_filters() {
        let mut store = JsonStore::in_memory();
        add_food(&mut store, food_req("a", 10.0)).unwrap();
        add_food(&mut store, food_req("b", 20.0)).unwrap();
        add_recipe(&mut store, recipe_req("Satu", &[("a", 100.0)])).unwrap();
        add_recipe(&mut store, recipe_req("Dua", &[("b", 100.0)])).unwrap();

        let views = recipes_with_ingredient(&store, " A ").unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].title, "Satu");
    }

    #[test]
    fn recipes_with_ingredient_matches_legacy_cased_names() {
        let path = std::env::temp_dir().join(format!(
            "nutrisense-api-{}-{}.json",
            std::process::id(),
            rand::random::<u32>()
        ));

        // hand-written catalog, ingredient name never went through put_recipe
        std::fs::write(
            &path,
            r#"{
                "foods": {"wortel": {"category": "sayur", "nutrients": {"serat": {"value": 2.8, "unit": "g"}}}},
                "recipes": {"Sop": {"description": "", "ingredients": [{"name": "Wortel", "weight": 50.0}]}}
            }"#,
        )
        .unwrap();

        let store = JsonStore::open(&path).unwrap();
        let views = recipes_with_ingredient(&store, "wortel").unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].title, "Sop");

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn compute_totals_and_lookup_wire_shapes() {
        let mut store = JsonStore::in_memory();
        add_food(&mut store, food_req("apel", 52.0)).unwrap();

        let resp = compute_totals(
            &store,
            &[LineDto {
                name: "apel".into(),
                weight: 150.0,
            }],
        )
        .unwrap();
        assert_eq!(resp.totals["kalori"], 78.0);

        let resp = lookup_food(&store, "apel", 150.0).unwrap();
        assert_eq!(resp.results[0].nutrients["kalori"], 78.0);

        let err = lookup_food(&store, "durian", 100.0).unwrap_err();
        assert_eq!(err.status(), 404);
    }
}
