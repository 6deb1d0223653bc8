use serde::{Deserialize, Deserializer, Serialize};

/// Stored form of a recipe. The key it lives under is its id, so the id is
/// not part of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFields {
    #[serde(default, deserialize_with = "null_as_default")]
    pub recipe_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    #[serde(default)]
    pub prep_time: Option<u32>,
    #[serde(default)]
    pub cook_time: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuisine: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meal_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ingredients: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dietary_requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    #[serde(flatten)]
    pub fields: RecipeFields,
}

impl Recipe {
    pub fn new(id: impl Into<String>, fields: RecipeFields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

impl RecipeFields {
    pub fn total_minutes(&self) -> u32 {
        self.prep_time
            .unwrap_or(0)
            .saturating_add(self.cook_time.unwrap_or(0))
    }

    pub fn total_time(&self) -> String {
        format_duration(self.total_minutes())
    }
}

/// "1 hours 15 minutes", or just "45 minutes" under an hour.
pub fn format_duration(total_minutes: u32) -> String {
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{hours} hours {minutes} minutes")
    } else {
        format!("{minutes} minutes")
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
