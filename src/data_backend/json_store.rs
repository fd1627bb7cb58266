//! Flat-file catalog backend. The whole catalog lives in one JSON document
//! which is read once on open and rewritten after every mutation.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    constants::DEFAULT_UNIT,
    data_backend::{normalize, CatalogStore},
    data_types::{Category, Food, IngredientLine, Nutrient, Recipe, StoreError},
};

/// Weight assumed for bare-string ingredient entries from legacy catalog files.
const LEGACY_INGREDIENT_WEIGHT: f64 = 100.0;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    foods: BTreeMap<String, FoodRecord>,
    #[serde(default)]
    recipes: BTreeMap<String, RecipeRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FoodRecord {
    category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    nutrients: BTreeMap<String, RawNutrient>,
}

// old exports stored some nutrients as a bare per-100g number without a unit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawNutrient {
    Full(Nutrient),
    Bare(f64),
}

impl From<RawNutrient> for Nutrient {
    fn from(raw: RawNutrient) -> Self {
        match raw {
            RawNutrient::Full(nutrient) => nutrient,
            RawNutrient::Bare(value) => Nutrient {
                value,
                unit: DEFAULT_UNIT.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecipeRecord {
    #[serde(default)]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    ingredients: Vec<RawIngredient>,
}

// old exports listed some ingredients as plain name strings without a weight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawIngredient {
    Line(IngredientLine),
    Legacy(String),
}

impl From<RawIngredient> for IngredientLine {
    fn from(raw: RawIngredient) -> Self {
        match raw {
            RawIngredient::Line(line) => line,
            RawIngredient::Legacy(name) => IngredientLine {
                name,
                weight: LEGACY_INGREDIENT_WEIGHT,
            },
        }
    }
}

pub struct JsonStore {
    path: Option<PathBuf>,
    data: CatalogDoc,
}

impl JsonStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let data = match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(doc) => doc,
                Err(e) => {
                    log::warn!("catalog file {} unparseable, starting empty: {}", path.display(), e);
                    CatalogDoc::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => CatalogDoc::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(JsonStore {
            path: Some(path.to_path_buf()),
            data,
        })
    }

    /// Catalog that never touches the filesystem.
    pub fn in_memory() -> Self {
        JsonStore {
            path: None,
            data: CatalogDoc::default(),
        }
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string_pretty(&self.data)?)?;
        }
        Ok(())
    }

    fn to_food(name: &str, record: &FoodRecord) -> Food {
        Food {
            name: name.to_string(),
            category: record.category,
            image: record.image.clone(),
            nutrients: record
                .nutrients
                .iter()
                .map(|(name, raw)| (name.clone(), Nutrient::from(raw.clone())))
                .collect(),
        }
    }

    fn to_recipe(title: &str, record: &RecipeRecord) -> Recipe {
        Recipe {
            title: title.to_string(),
            description: record.description.clone(),
            image: record.image.clone(),
            ingredients: record
                .ingredients
                .iter()
                .cloned()
                .map(IngredientLine::from)
                .collect(),
        }
    }
}

impl CatalogStore for JsonStore {
    fn food(&self, name: &str) -> Result<Option<Food>, StoreError> {
        let name = normalize(name);
        Ok(self.data.foods.get(&name).map(|r| Self::to_food(&name, r)))
    }

    fn all_foods(&self) -> Result<Vec<Food>, StoreError> {
        Ok(self
            .data
            .foods
            .iter()
            .map(|(name, record)| Self::to_food(name, record))
            .collect())
    }

    fn put_food(&mut self, food: Food) -> Result<(), StoreError> {
        self.data.foods.insert(
            normalize(&food.name),
            FoodRecord {
                category: food.category,
                image: food.image,
                nutrients: food
                    .nutrients
                    .into_iter()
                    .map(|(name, nutrient)| (name, RawNutrient::Full(nutrient)))
                    .collect(),
            },
        );
        self.persist()
    }

    fn delete_food(&mut self, name: &str) -> Result<bool, StoreError> {
        let existed = self.data.foods.remove(&normalize(name)).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }

    fn recipe(&self, title: &str) -> Result<Option<Recipe>, StoreError> {
        let title = title.trim();
        Ok(self
            .data
            .recipes
            .get(title)
            .map(|r| Self::to_recipe(title, r)))
    }

    fn all_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self
            .data
            .recipes
            .iter()
            .map(|(title, record)| Self::to_recipe(title, record))
            .collect())
    }

    fn put_recipe(&mut self, recipe: Recipe) -> Result<(), StoreError> {
        self.data.recipes.insert(
            recipe.title.trim().to_string(),
            RecipeRecord {
                description: recipe.description,
                image: recipe.image,
                ingredients: recipe
                    .ingredients
                    .into_iter()
                    .map(|mut line| {
                        line.name = normalize(&line.name);
                        RawIngredient::Line(line)
                    })
                    .collect(),
            },
        );
        self.persist()
    }

    fn delete_recipe(&mut self, title: &str) -> Result<bool, StoreError> {
        let existed = self.data.recipes.remove(title.trim()).is_some();
        if existed {
            self.persist()?;
        }
        Ok(existed)
    }
}
