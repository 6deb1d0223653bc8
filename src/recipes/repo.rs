use tracing::info;

use super::model::{Recipe, RecipeFields};
use super::normalize::{normalize, read_recipe};
use crate::error::AppError;
use crate::store::{path, StoreClient};

/// Add a recipe; the store assigns its id.
pub async fn create(store: &dyn StoreClient, fields: &RecipeFields) -> Result<String, AppError> {
    let value = serde_json::to_value(fields)
        .map_err(|e| AppError::write(path::RECIPES, None, e))?;
    let id = store.push_path(path::RECIPES, value).await?;
    info!(recipe_id = %id, name = %fields.recipe_name, "recipe created");
    Ok(id)
}

/// Fetch one recipe by id.
pub async fn get(store: &dyn StoreClient, recipe_id: &str) -> Result<Recipe, AppError> {
    path::validate_key(recipe_id)?;
    let recipe_path = path::recipe(recipe_id);
    let value = store
        .read_path(&recipe_path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("recipe {recipe_id}")))?;
    read_recipe(recipe_id, &value)
        .ok_or_else(|| AppError::read(&recipe_path, Some("malformed".into()), "unreadable recipe"))
}

/// The whole catalog, as a one-off read.
pub async fn list_all(store: &dyn StoreClient) -> Result<Vec<Recipe>, AppError> {
    let value = store.read_path(path::RECIPES).await?;
    Ok(normalize(value.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn dal() -> RecipeFields {
        RecipeFields {
            recipe_name: "Dal".into(),
            cuisine: "Indian".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = MemoryStore::new();
        let id = create(&store, &dal()).await.unwrap();
        let recipe = get(&store, &id).await.unwrap();
        assert_eq!(recipe.id, id);
        assert_eq!(recipe.fields, dal());

        let all = list_all(&store).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let store = MemoryStore::new();
        let err = get(&store, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn bad_ids_are_rejected_before_reading() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = get(&store, "../users").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_write_is_reported_once() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = create(&store, &dal()).await.unwrap_err();
        assert!(matches!(err, AppError::RemoteWrite { .. }));
        store.set_unavailable(false);
        assert!(list_all(&store).await.unwrap().is_empty());
    }
}
