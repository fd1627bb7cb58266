//! SQLite catalog backend. Foods and their nutrient rows live in separate
//! tables, recipe ingredient lines keep their insertion order via rowid.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::{
    data_backend::{normalize, CatalogStore},
    data_types::{Category, Food, IngredientLine, NutrientTable, Nutrient, Recipe, StoreError},
    db_operations::check_or_create_db_tables,
};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        check_or_create_db_tables(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        check_or_create_db_tables(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn nutrients_for(&self, food_id: i64) -> Result<NutrientTable, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, value, unit FROM nutrients WHERE food_id = ?1")?;

        let rows = stmt.query_map(params![food_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                Nutrient {
                    value: row.get(1)?,
                    unit: row.get(2)?,
                },
            ))
        })?;

        let mut table = NutrientTable::new();
        for row in rows {
            let (name, nutrient) = row?;
            table.insert(name, nutrient);
        }
        Ok(table)
    }

    fn ingredients_for(&self, recipe_id: i64) -> Result<Vec<IngredientLine>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT food_name, weight FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![recipe_id], |row| {
            Ok(IngredientLine {
                name: row.get(0)?,
                weight: row.get(1)?,
            })
        })?;

        let mut lines = Vec::new();
        for row in rows {
            lines.push(row?);
        }
        Ok(lines)
    }

    fn build_food(
        &self,
        id: i64,
        name: String,
        category: String,
        image: Option<String>,
    ) -> Result<Food, StoreError> {
        Ok(Food {
            name,
            category: category.parse::<Category>().map_err(StoreError::BadCategory)?,
            image,
            nutrients: self.nutrients_for(id)?,
        })
    }
}

impl CatalogStore for SqliteStore {
    fn food(&self, name: &str) -> Result<Option<Food>, StoreError> {
        let name = normalize(name);
        let row = self
            .conn
            .prepare_cached("SELECT id, name, category, image FROM foods WHERE name = ?1")?
            .query_row(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .optional()?;

        match row {
            Some((id, name, category, image)) => {
                Ok(Some(self.build_food(id, name, category, image)?))
            }
            None => Ok(None),
        }
    }

    fn all_foods(&self) -> Result<Vec<Food>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, name, category, image FROM foods ORDER BY name")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut foods = Vec::new();
        for row in rows {
            let (id, name, category, image) = row?;
            foods.push(self.build_food(id, name, category, image)?);
        }
        Ok(foods)
    }

    fn put_food(&mut self, food: Food) -> Result<(), StoreError> {
        let name = normalize(&food.name);
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM nutrients WHERE food_id IN (SELECT id FROM foods WHERE name = ?1)",
            params![name],
        )?;
        tx.execute(
            "REPLACE INTO foods (name, category, image) VALUES (?1, ?2, ?3)",
            params![name, food.category.as_str(), food.image],
        )?;
        let food_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO nutrients (food_id, name, value, unit) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (nutrient_name, nutrient) in &food.nutrients {
                stmt.execute(params![food_id, nutrient_name, nutrient.value, nutrient.unit])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_food(&mut self, name: &str) -> Result<bool, StoreError> {
        let name = normalize(name);
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM nutrients WHERE food_id IN (SELECT id FROM foods WHERE name = ?1)",
            params![name],
        )?;
        let deleted = tx.execute("DELETE FROM foods WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    fn recipe(&self, title: &str) -> Result<Option<Recipe>, StoreError> {
        let title = title.trim();
        let row = self
            .conn
            .prepare_cached("SELECT id, title, description, image FROM recipes WHERE title = ?1")?
            .query_row(params![title], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .optional()?;

        match row {
            Some((id, title, description, image)) => Ok(Some(Recipe {
                title,
                description,
                image,
                ingredients: self.ingredients_for(id)?,
            })),
            None => Ok(None),
        }
    }

    fn all_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, title, description, image FROM recipes ORDER BY title")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut recipes = Vec::new();
        for row in rows {
            let (id, title, description, image) = row?;
            recipes.push(Recipe {
                title,
                description,
                image,
                ingredients: self.ingredients_for(id)?,
            });
        }
        Ok(recipes)
    }

    fn put_recipe(&mut self, recipe: Recipe) -> Result<(), StoreError> {
        let title = recipe.title.trim();
        let tx = self.conn.transaction()?;

        tx.execute(
            "DELETE FROM recipe_ingredients
                WHERE recipe_id IN (SELECT id FROM recipes WHERE title = ?1)",
            params![title],
        )?;
        tx.execute(
            "REPLACE INTO recipes (title, description, image) VALUES (?1, ?2, ?3)",
            params![title, recipe.description, recipe.image],
        )?;
        let recipe_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO recipe_ingredients (recipe_id, food_name, weight) VALUES (?1, ?2, ?3)",
            )?;
            for line in &recipe.ingredients {
                stmt.execute(params![recipe_id, normalize(&line.name), line.weight])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_recipe(&mut self, title: &str) -> Result<bool, StoreError> {
        let title = title.trim();
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM recipe_ingredients
                WHERE recipe_id IN (SELECT id FROM recipes WHERE title = ?1)",
            params![title],
        )?;
        let deleted = tx.execute("DELETE FROM recipes WHERE title = ?1", params![title])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn nasi() -> Food {
        Food {
            name: "Nasi Putih".into(),
            category: Category::Beras,
            image: None,
            nutrients: BTreeMap::from([
                (
                    "kalori".to_string(),
                    Nutrient {
                        value: 130.0,
                        unit: "kkal".into(),
                    },
                ),
                (
                    "protein".to_string(),
                    Nutrient {
                        value: 2.7,
                        unit: "g".into(),
                    },
                ),
            ]),
        }
    }

    #[test]
    fn food_upsert_replaces_nutrient_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.put_food(nasi()).unwrap();

        let mut updated = nasi();
        updated.nutrients.remove("protein");
        store.put_food(updated).unwrap();

        let food = store.food("nasi putih").unwrap().unwrap();
        assert_eq!(food.nutrients.len(), 1);
        assert_eq!(food.category, Category::Beras);
    }

    #[test]
    fn delete_food_removes_nutrients() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.put_food(nasi()).unwrap();
        assert!(store.delete_food(" NASI PUTIH ").unwrap());
        assert!(store.food("nasi putih").unwrap().is_none());

        let orphans: i64 = store
            .connection()
            .query_row("SELECT count(*) FROM nutrients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn recipe_ingredient_order_is_preserved() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let recipe = Recipe {
            title: "Nasi Goreng".into(),
            description: "Goreng nasi.\nTambah telur.".into(),
            image: Some("nasgor.jpg".into()),
            ingredients: vec![
                IngredientLine {
                    name: "nasi putih".into(),
                    weight: 200.0,
                },
                IngredientLine {
                    name: "telur".into(),
                    weight: 60.0,
                },
                IngredientLine {
                    name: "bawang".into(),
                    weight: 10.0,
                },
            ],
        };
        store.put_recipe(recipe.clone()).unwrap();

        let loaded = store.recipe("Nasi Goreng").unwrap().unwrap();
        assert_eq!(loaded, recipe);

        // upsert keeps a single copy
        store.put_recipe(recipe).unwrap();
        assert_eq!(store.all_recipes().unwrap().len(), 1);
    }
}
