use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::model::{Recipe, RecipeFields};

/// Turns a keyed collection (`id -> fields`) into a recipe list with ids
/// filled in from the keys. Missing or non-object input yields an empty list.
pub fn normalize(value: Option<&Value>) -> Vec<Recipe> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, fields)| read_recipe(id, fields))
        .collect()
}

/// Reads one stored record; malformed records are logged and skipped.
pub fn read_recipe(id: &str, fields: &Value) -> Option<Recipe> {
    match RecipeFields::deserialize(fields) {
        Ok(fields) => Some(Recipe::new(id, fields)),
        Err(e) => {
            warn!(recipe_id = %id, error = %e, "skipping malformed recipe record");
            None
        }
    }
}
