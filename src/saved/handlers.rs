use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::AuthUser,
    error::AppError,
    notice::Notice,
    recipes::{repo, Recipe},
    state::AppState,
};

pub fn saved_routes() -> Router<AppState> {
    Router::new()
        .route("/me/saved", get(list_saved))
        .route("/recipes/:id/saved", get(saved_status))
        .route("/recipes/:id/save", post(toggle_saved))
}

#[derive(Debug, Serialize)]
pub struct SavedStatus {
    pub saved: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub saved: bool,
    pub notice: Notice,
}

#[instrument(skip(state, user))]
pub async fn list_saved(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.saved.list(Some(&user)).await?))
}

#[instrument(skip(state, user))]
pub async fn saved_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SavedStatus>, AppError> {
    let saved = state.saved.is_saved(Some(&user), &id).await?;
    Ok(Json(SavedStatus { saved }))
}

/// POST /recipes/:id/save flips the caller's saved state for the recipe.
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn toggle_saved(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ToggleResponse>, AppError> {
    let snapshot = match repo::get(state.store.as_ref(), &id).await {
        Ok(recipe) => recipe.fields,
        Err(AppError::NotFound(what)) => {
            // gone from the catalog; a saved copy can still be removed
            if !state.saved.is_saved(Some(&user), &id).await? {
                return Err(AppError::NotFound(what));
            }
            Default::default()
        }
        Err(e) => return Err(e),
    };
    let saved = state.saved.toggle(Some(&user), &id, &snapshot).await?;
    Ok(Json(ToggleResponse {
        saved,
        notice: Notice::for_toggle(&Ok(saved)),
    }))
}
