use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{CreatedRecipeResponse, DiscoverQuery, RecipeDetails, SearchQuery};
use super::{filter, repo, sample, Recipe, RecipeDraft};
use crate::{error::AppError, notice::Notice, state::AppState};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(search_recipes).post(create_recipe))
        .route("/recipes/discover", get(discover_recipes))
        .route("/recipes/:id", get(get_recipe))
}

/// GET /recipes?q=
#[instrument(skip(state))]
pub async fn search_recipes(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<Recipe>> {
    let results = filter(&state.catalog.borrow(), &params.q);
    info!(query = %params.q, matches = results.len(), "catalog searched");
    Json(results)
}

/// GET /recipes/discover?n=
#[instrument(skip(state))]
pub async fn discover_recipes(
    State(state): State<AppState>,
    Query(params): Query<DiscoverQuery>,
) -> Json<Vec<Recipe>> {
    let n = params.n.unwrap_or(state.config.discovery_size);
    Json(sample(&state.catalog.borrow(), n))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RecipeDetails>, AppError> {
    let recipe = repo::get(state.store.as_ref(), &id).await?;
    Ok(Json(recipe.into()))
}

/// POST /recipes, raw add-recipe form input.
#[instrument(skip(state, draft))]
pub async fn create_recipe(
    State(state): State<AppState>,
    Json(draft): Json<RecipeDraft>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CreatedRecipeResponse>), AppError>
{
    let fields = draft.into_fields()?;
    match repo::create(state.store.as_ref(), &fields).await {
        Ok(id) => {
            let notice = Notice::recipe_created();
            state.notifier.notify(&notice);
            Ok((
                StatusCode::CREATED,
                [(header::LOCATION, format!("/api/v1/recipes/{id}"))],
                Json(CreatedRecipeResponse { id, notice }),
            ))
        }
        Err(e) => {
            state.notifier.notify(&Notice::recipe_create_failed(&e));
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::RecipeFields;
    use serde_json::json;

    async fn seeded() -> AppState {
        let state = AppState::fake().await;
        state
            .store
            .write_path(
                "recipes",
                json!({
                    "r1": {"recipeName": "Spicy Chickpea Curry", "cuisine": "Indian",
                           "prepTime": 20, "cookTime": 55},
                    "r2": {"recipeName": "Pad Thai", "cuisine": "Thai"},
                    "r3": {"recipeName": "Shakshuka", "cuisine": "Middle Eastern"}
                }),
            )
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn search_reads_the_live_catalog() {
        let state = seeded().await;
        let Json(hits) = search_recipes(
            State(state.clone()),
            Query(SearchQuery { q: "chick".into() }),
        )
        .await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "r1");

        let Json(none) = search_recipes(State(state), Query(SearchQuery::default())).await;
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn discover_defaults_to_configured_size() {
        let state = seeded().await;
        let Json(all) =
            discover_recipes(State(state.clone()), Query(DiscoverQuery::default())).await;
        assert_eq!(all.len(), 3);

        let Json(two) = discover_recipes(State(state), Query(DiscoverQuery { n: Some(2) })).await;
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn details_include_total_time_and_missing_is_not_found() {
        let state = seeded().await;
        let Json(details) = get_recipe(State(state.clone()), Path("r1".into()))
            .await
            .unwrap();
        assert_eq!(details.total_minutes, 75);
        assert_eq!(details.total_time, "1 hours 15 minutes");

        let err = get_recipe(State(state), Path("nope".into())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_pushes_a_parsed_draft() {
        let state = AppState::fake().await;
        let draft = RecipeDraft {
            recipe_name: "Dal".into(),
            ingredients: "lentils, turmeric ,".into(),
            prep_time: "10 mins".into(),
            ..Default::default()
        };
        let (status, [(_, location)], Json(created)) =
            create_recipe(State(state.clone()), Json(draft)).await.unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(location, format!("/api/v1/recipes/{}", created.id));
        assert_eq!(created.notice.title, "Recipe added!");

        let stored = repo::get(state.store.as_ref(), &created.id).await.unwrap();
        assert_eq!(
            stored.fields,
            RecipeFields {
                recipe_name: "Dal".into(),
                ingredients: vec!["lentils".into(), "turmeric".into()],
                prep_time: Some(10),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn huge_times_do_not_break_details() {
        let state = AppState::fake().await;
        let draft = RecipeDraft {
            recipe_name: "Slow Stock".into(),
            prep_time: "4294967295".into(),
            cook_time: "1".into(),
            ..Default::default()
        };
        let (_, _, Json(created)) = create_recipe(State(state.clone()), Json(draft))
            .await
            .unwrap();
        let Json(details) = get_recipe(State(state), Path(created.id)).await.unwrap();
        assert_eq!(details.total_minutes, u32::MAX);
    }

    #[tokio::test]
    async fn create_without_a_name_is_rejected() {
        let state = AppState::fake().await;
        let err = create_recipe(State(state), Json(RecipeDraft::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
