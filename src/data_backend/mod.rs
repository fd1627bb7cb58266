use std::sync::Arc;

use tokio::sync::Mutex;

use crate::data_types::{Food, Recipe, StoreError};

pub mod json_store;
pub mod sqlite_store;

/// Catalog names are compared lowercased and trimmed everywhere.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Read/write contract over the food/recipe catalog. The aggregator only ever
/// uses the read half and does not care which backing store it gets.
pub trait CatalogStore {
    fn food(&self, name: &str) -> Result<Option<Food>, StoreError>;
    fn all_foods(&self) -> Result<Vec<Food>, StoreError>;
    fn put_food(&mut self, food: Food) -> Result<(), StoreError>;
    /// Returns whether the food existed.
    fn delete_food(&mut self, name: &str) -> Result<bool, StoreError>;

    fn recipe(&self, title: &str) -> Result<Option<Recipe>, StoreError>;
    fn all_recipes(&self) -> Result<Vec<Recipe>, StoreError>;
    fn put_recipe(&mut self, recipe: Recipe) -> Result<(), StoreError>;
    /// Returns whether the recipe existed.
    fn delete_recipe(&mut self, title: &str) -> Result<bool, StoreError>;
}

// rusqlite connections are Send but not Sync, so the store is shared behind a
// mutex rather than a rwlock
pub type SharedStore = Arc<Mutex<Box<dyn CatalogStore + Send>>>;

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize("  Apel Merah "), "apel merah");
        assert_eq!(normalize("IKAN"), "ikan");
    }
}
