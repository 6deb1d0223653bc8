//! Per-user saved recipes. A recipe is saved exactly when a copy of it exists
//! at `users/{uid}/savedRecipes/{recipeId}`; there is no flag field, so
//! unsaving must delete the copy rather than overwrite it.
//!
//! Toggles from two devices of the same user race: whichever write lands last
//! wins.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use axum::Router;

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::live::SubscriptionHandle;
use crate::notice::{Notice, Notifier};
use crate::recipes::{normalize, Recipe, RecipeFields};
use crate::state::AppState;
use crate::store::{path, Snapshot, SnapshotCallback, StoreClient};

pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::saved_routes()
}

#[derive(Clone)]
pub struct SavedRecipes {
    store: Arc<dyn StoreClient>,
    notifier: Arc<dyn Notifier>,
}

impl SavedRecipes {
    pub fn new(store: Arc<dyn StoreClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// One-off membership check.
    pub async fn is_saved(
        &self,
        user: Option<&CurrentUser>,
        recipe_id: &str,
    ) -> Result<bool, AppError> {
        let user = user.ok_or(AppError::AuthRequired)?;
        path::validate_key(recipe_id)?;
        let value = self
            .store
            .read_path(&path::saved_recipe(user.uid, recipe_id))
            .await?;
        Ok(value.is_some())
    }

    pub async fn list(&self, user: Option<&CurrentUser>) -> Result<Vec<Recipe>, AppError> {
        let user = user.ok_or(AppError::AuthRequired)?;
        let value = self.store.read_path(&path::saved_recipes(user.uid)).await?;
        Ok(normalize(value.as_ref()))
    }

    /// Flips membership based on what the store holds right now. Returns the
    /// new state: `true` when the recipe ended up saved.
    pub async fn toggle(
        &self,
        user: Option<&CurrentUser>,
        recipe_id: &str,
        snapshot: &RecipeFields,
    ) -> Result<bool, AppError> {
        let result = async {
            let user = user.ok_or(AppError::AuthRequired)?;
            path::validate_key(recipe_id)?;
            let current = self
                .store
                .read_path(&path::saved_recipe(user.uid, recipe_id))
                .await?
                .is_some();
            self.apply(user.uid, recipe_id, current, snapshot).await
        }
        .await;
        self.notifier.notify(&Notice::for_toggle(&result));
        result
    }

    /// Live membership for one recipe.
    pub async fn watch(
        &self,
        user: Option<&CurrentUser>,
        recipe_id: &str,
    ) -> Result<SavedFlag, AppError> {
        let user = user.ok_or(AppError::AuthRequired)?;
        path::validate_key(recipe_id)?;

        let (tx, rx) = watch::channel(false);
        let state = Arc::new(tx);
        let sink = state.clone();
        let callback: SnapshotCallback = Arc::new(move |snap: Snapshot| {
            sink.send_replace(snap.exists());
        });
        let handle = SubscriptionHandle::attach(
            self.store.clone(),
            &path::saved_recipe(user.uid, recipe_id),
            callback,
        )
        .await?;

        Ok(SavedFlag {
            service: self.clone(),
            uid: user.uid,
            recipe_id: recipe_id.to_string(),
            handle,
            state,
            changes: rx,
        })
    }

    async fn apply(
        &self,
        uid: Uuid,
        recipe_id: &str,
        currently_saved: bool,
        snapshot: &RecipeFields,
    ) -> Result<bool, AppError> {
        let ref_path = path::saved_recipe(uid, recipe_id);
        if currently_saved {
            self.store.delete_path(&ref_path).await?;
            info!(user_id = %uid, recipe_id, "recipe unsaved");
            Ok(false)
        } else {
            let value = serde_json::to_value(snapshot)
                .map_err(|e| AppError::write(&ref_path, None, e))?;
            self.store.write_path(&ref_path, value).await?;
            info!(user_id = %uid, recipe_id, "recipe saved");
            Ok(true)
        }
    }
}

/// Live saved state of one recipe for one user.
pub struct SavedFlag {
    service: SavedRecipes,
    uid: Uuid,
    recipe_id: String,
    handle: SubscriptionHandle,
    state: Arc<watch::Sender<bool>>,
    changes: watch::Receiver<bool>,
}

impl SavedFlag {
    pub fn is_saved(&self) -> bool {
        *self.changes.borrow()
    }

    pub fn changes(&self) -> watch::Receiver<bool> {
        self.changes.clone()
    }

    pub fn recipe_id(&self) -> &str {
        &self.recipe_id
    }

    /// Flips membership based on the last state this flag observed.
    pub async fn toggle(&mut self, snapshot: &RecipeFields) -> Result<bool, AppError> {
        let current = self.is_saved();
        let result = self
            .service
            .apply(self.uid, &self.recipe_id, current, snapshot)
            .await;
        if let Ok(saved) = result {
            self.state.send_replace(saved);
        }
        self.service.notifier.notify(&Notice::for_toggle(&result));
        result
    }

    pub fn detach(&mut self) {
        self.handle.detach();
    }
}
