mod draft;
mod dto;
pub mod filter;
pub mod handlers;
mod model;
mod normalize;
pub mod repo;
pub mod sample;

use crate::state::AppState;
use axum::Router;

pub use draft::RecipeDraft;
pub use filter::filter;
pub use model::{format_duration, Recipe, RecipeFields};
pub use normalize::{normalize, read_recipe};
pub use sample::{sample, DEFAULT_DISCOVERY_SIZE};

pub fn router() -> Router<AppState> {
    handlers::recipe_routes()
}
