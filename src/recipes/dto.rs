use serde::{Deserialize, Serialize};

use super::model::{Recipe, RecipeFields};
use crate::notice::Notice;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeDetails {
    pub id: String,
    #[serde(flatten)]
    pub fields: RecipeFields,
    pub total_minutes: u32,
    pub total_time: String,
}

impl From<Recipe> for RecipeDetails {
    fn from(recipe: Recipe) -> Self {
        Self {
            total_minutes: recipe.fields.total_minutes(),
            total_time: recipe.fields.total_time(),
            id: recipe.id,
            fields: recipe.fields,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedRecipeResponse {
    pub id: String,
    pub notice: Notice,
}
