//! Weight-scaled nutrient math over a catalog snapshot. Everything in here is
//! a pure read: stored values are per-100g, so a contribution is always
//! `value / 100 * weight`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    data_backend::{normalize, CatalogStore},
    data_types::{AggregateError, Food, IngredientLine, Recipe, StoreError},
};

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub totals: BTreeMap<String, f64>,
    pub units: BTreeMap<String, String>,
}

/// One catalog food scaled to a requested weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledFood {
    pub name: String,
    pub weight: f64,
    pub nutrients: BTreeMap<String, f64>,
    pub units: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn check_line(name: &str, weight: f64) -> Result<(), AggregateError> {
    if normalize(name).is_empty() {
        return Err(AggregateError::InvalidInput(
            "Nama makanan dan berat harus diisi dengan benar".to_string(),
        ));
    }
    if !weight.is_finite() || weight <= 0.0 {
        return Err(AggregateError::InvalidInput(format!(
            "Berat untuk \"{}\" harus berupa angka positif",
            name.trim()
        )));
    }
    Ok(())
}

/// Accumulates one food into the running totals. Units are recorded
/// first-seen; a later conflicting unit only logs a warning.
fn accumulate(acc: &mut NutrientTotals, food: &Food, weight: f64) {
    for (nutrient_name, nutrient) in &food.nutrients {
        let contribution = nutrient.value / 100.0 * weight;
        *acc.totals.entry(nutrient_name.clone()).or_insert(0.0) += contribution;

        match acc.units.get(nutrient_name) {
            None => {
                acc.units
                    .insert(nutrient_name.clone(), nutrient.unit.clone());
            }
            Some(seen) if *seen != nutrient.unit => {
                log::warn!(
                    "unit mismatch for '{}': '{}' (from '{}') vs first-seen '{}'",
                    nutrient_name,
                    nutrient.unit,
                    food.name,
                    seen
                );
            }
            Some(_) => {}
        }
    }
}

fn round_totals(mut acc: NutrientTotals) -> NutrientTotals {
    for total in acc.totals.values_mut() {
        *total = round2(*total);
    }
    acc
}

/// Strict batch totals: the whole computation is rejected on the first
/// ingredient that does not resolve against the catalog.
pub fn aggregate(
    store: &dyn CatalogStore,
    lines: &[IngredientLine],
) -> Result<NutrientTotals, AggregateError> {
    if lines.is_empty() {
        return Err(AggregateError::InvalidInput(
            "Daftar bahan tidak boleh kosong.".to_string(),
        ));
    }

    let mut acc = NutrientTotals::default();
    for line in lines {
        check_line(&line.name, line.weight)?;

        let food = store
            .food(&line.name)?
            .ok_or_else(|| AggregateError::NotFound(line.name.trim().to_string()))?;

        accumulate(&mut acc, &food, line.weight);
    }

    Ok(round_totals(acc))
}

fn scale_food(food: &Food, weight: f64) -> ScaledFood {
    let mut nutrients = BTreeMap::new();
    let mut units = BTreeMap::new();
    for (name, nutrient) in &food.nutrients {
        nutrients.insert(name.clone(), round2(nutrient.value / 100.0 * weight));
        units.insert(name.clone(), nutrient.unit.clone());
    }

    ScaledFood {
        name: food.name.clone(),
        weight,
        nutrients,
        units,
        image: food.image.clone(),
    }
}

/// Single-food lookup. An exact (normalized) match wins; otherwise every food
/// whose name contains the query as a substring is returned, in catalog
/// iteration order.
pub fn lookup(
    store: &dyn CatalogStore,
    name: &str,
    weight: f64,
) -> Result<Vec<ScaledFood>, AggregateError> {
    check_line(name, weight)?;
    let query = normalize(name);

    if let Some(food) = store.food(&query)? {
        return Ok(vec![scale_food(&food, weight)]);
    }

    let matches: Vec<ScaledFood> = store
        .all_foods()?
        .iter()
        .filter(|food| food.name.contains(&query))
        .map(|food| scale_food(food, weight))
        .collect();

    if matches.is_empty() {
        return Err(AggregateError::NotFound(name.trim().to_string()));
    }
    Ok(matches)
}

/// Rollup for stored recipes. Unlike [`aggregate`], a line naming a food that
/// has since been deleted is skipped with a warning instead of failing the
/// whole recipe: stored data may legitimately outlive a food, fresh user input
/// may not.
pub fn recipe_rollup(store: &dyn CatalogStore, recipe: &Recipe) -> Result<NutrientTotals, StoreError> {
    let mut acc = NutrientTotals::default();

    for line in &recipe.ingredients {
        if line.weight <= 0.0 {
            continue;
        }
        match store.food(&line.name)? {
            Some(food) => accumulate(&mut acc, &food, line.weight),
            None => log::warn!(
                "recipe '{}': ingredient '{}' missing from catalog, skipped in rollup",
                recipe.title,
                line.name
            ),
        }
    }

    Ok(round_totals(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_backend::json_store::JsonStore;
    use crate::data_types::{Category, Nutrient};

    fn food(name: &str, nutrients: &[(&str, f64, &str)]) -> Food {
        Food {
            name: name.into(),
            category: Category::Buah,
            image: None,
            nutrients: nutrients
                .iter()
                .map(|(n, v, u)| {
                    (
                        n.to_string(),
                        Nutrient {
                            value: *v,
                            unit: u.to_string(),
                        },
                    )
                })
                .collect(),
        }
    }

    fn catalog() -> JsonStore {
        let mut store = JsonStore::in_memory();
        store
            .put_food(food("apel", &[("kalori", 52.0, "kkal"), ("protein", 0.3, "g")]))
            .unwrap();
        store
            .put_food(food("jepelak", &[("kalori", 40.0, "kkal")]))
            .unwrap();
        store.put_food(food("ayam", &[("protein", 27.0, "mg")])).unwrap();
        store
    }

    fn line(name: &str, weight: f64) -> IngredientLine {
        IngredientLine {
            name: name.into(),
            weight,
        }
    }

    #[test]
    fn single_line_scales_linearly() {
        let totals = aggregate(&catalog(), &[line("apel", 150.0)]).unwrap();
        assert_eq!(totals.totals["kalori"], round2(52.0 / 100.0 * 150.0));
        assert_eq!(totals.totals["protein"], 0.45);
        assert_eq!(totals.units["kalori"], "kkal");
    }

    #[test]
    fn empty_list_is_invalid_input() {
        assert!(matches!(
            aggregate(&catalog(), &[]),
            Err(AggregateError::InvalidInput(_))
        ));
    }

    #[test]
    fn duplicate_lines_equal_summed_weight() {
        let store = catalog();
        let split = aggregate(&store, &[line("apel", 70.0), line("apel", 80.0)]).unwrap();
        let merged = aggregate(&store, &[line("apel", 150.0)]).unwrap();
        assert_eq!(split, merged);
    }

    #[test]
    fn unknown_food_rejects_whole_batch() {
        let err = aggregate(&catalog(), &[line("apel", 100.0), line("unknown_food", 50.0)])
            .unwrap_err();
        assert!(matches!(err, AggregateError::NotFound(name) if name == "unknown_food"));
    }

    #[test]
    fn nonpositive_weight_is_invalid_input() {
        assert!(matches!(
            aggregate(&catalog(), &[line("apel", 0.0)]),
            Err(AggregateError::InvalidInput(_))
        ));
        assert!(matches!(
            lookup(&catalog(), "apel", -5.0),
            Err(AggregateError::InvalidInput(_))
        ));
        assert!(matches!(
            lookup(&catalog(), "   ", 100.0),
            Err(AggregateError::InvalidInput(_))
        ));
    }

    #[test]
    fn unit_conflict_keeps_first_seen() {
        // apel reports protein in g, ayam in mg; first-seen wins
        let totals = aggregate(&catalog(), &[line("apel", 100.0), line("ayam", 100.0)]).unwrap();
        assert_eq!(totals.units["protein"], "g");
        assert_eq!(totals.totals["protein"], round2(0.3 + 27.0));
    }

    #[test]
    fn exact_lookup_returns_single_scaled_result() {
        let results = lookup(&catalog(), " Apel ", 150.0).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].nutrients["kalori"], 78.0);
        assert_eq!(results[0].weight, 150.0);
    }

    #[test]
    fn substring_lookup_returns_all_matches() {
        let results = lookup(&catalog(), "pel", 100.0).unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["apel", "jepelak"]);
    }

    #[test]
    fn lookup_without_match_is_not_found() {
        assert!(matches!(
            lookup(&catalog(), "durian", 100.0),
            Err(AggregateError::NotFound(_))
        ));
    }

    #[test]
    fn rollup_sums_ingredients_and_skips_missing() {
        let mut store = JsonStore::in_memory();
        store.put_food(food("a", &[("kalori", 10.0, "kkal")])).unwrap();
        store.put_food(food("b", &[("kalori", 20.0, "kkal")])).unwrap();

        let recipe = Recipe {
            title: "Campur".into(),
            description: String::new(),
            image: None,
            ingredients: vec![line("a", 100.0), line("b", 200.0), line("hilang", 50.0)],
        };

        let totals = recipe_rollup(&store, &recipe).unwrap();
        assert_eq!(totals.totals["kalori"], 50.0);
    }
}
