use serde::Deserialize;

use super::model::RecipeFields;
use crate::error::AppError;

/// Raw add-recipe form input. List fields are comma separated, numeric fields
/// are whatever the user typed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDraft {
    pub recipe_name: String,
    pub description: String,
    pub image: String,
    pub ingredients: String,
    pub servings: String,
    pub instructions: String,
    pub cuisine: String,
    pub prep_time: String,
    pub cook_time: String,
    pub meal_type: String,
    pub difficulty: String,
    pub dietary_requirements: String,
}

impl RecipeDraft {
    pub fn into_fields(self) -> Result<RecipeFields, AppError> {
        let recipe_name = self.recipe_name.trim().to_string();
        if recipe_name.is_empty() {
            return Err(AppError::validation("Recipe name is required."));
        }
        let image = Some(self.image.trim().to_string()).filter(|s| !s.is_empty());

        Ok(RecipeFields {
            recipe_name,
            description: self.description.trim().to_string(),
            image,
            servings: parse_count(&self.servings),
            prep_time: parse_count(&self.prep_time),
            cook_time: parse_count(&self.cook_time),
            cuisine: self.cuisine.trim().to_string(),
            meal_type: self.meal_type.trim().to_string(),
            difficulty: self.difficulty.trim().to_string(),
            ingredients: split_list(&self.ingredients),
            instructions: split_list(&self.instructions),
            dietary_requirements: split_list(&self.dietary_requirements),
        })
    }
}

/// Comma-separated input to a list of trimmed, non-empty entries.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Reads the leading run of ASCII digits the user typed, so "10 mins" is 10
/// and "2.5" is 2. No leading digits means no value.
pub fn parse_count(input: &str) -> Option<u32> {
    let digits: String = input
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
