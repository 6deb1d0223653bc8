use uuid::Uuid;

use crate::error::AppError;

pub const RECIPES: &str = "recipes";

pub fn recipe(recipe_id: &str) -> String {
    format!("{RECIPES}/{recipe_id}")
}

pub fn saved_recipes(uid: Uuid) -> String {
    format!("users/{uid}/savedRecipes")
}

pub fn saved_recipe(uid: Uuid, recipe_id: &str) -> String {
    format!("users/{uid}/savedRecipes/{recipe_id}")
}

pub fn child(parent: &str, key: &str) -> String {
    let parent = normalize(parent);
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}/{key}")
    }
}

pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Strips leading, trailing and repeated slashes.
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("")
}

/// True when a change at `changed` can alter the value seen at `watched`:
/// one path is the other, or an ancestor of it.
pub fn is_related(watched: &str, changed: &str) -> bool {
    let w = segments(watched);
    let c = segments(changed);
    w.iter().zip(c.iter()).all(|(a, b)| a == b)
}

/// Keys are single path segments and may not contain reserved characters.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    const RESERVED: &[char] = &['/', '.', '#', '$', '[', ']'];
    if key.trim().is_empty() {
        return Err(AppError::validation("key must not be empty"));
    }
    if key.chars().any(|c| RESERVED.contains(&c) || c.is_control()) {
        return Err(AppError::validation(format!("invalid key: {key}")));
    }
    Ok(())
}
