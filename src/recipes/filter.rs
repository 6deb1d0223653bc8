use super::model::{Recipe, RecipeFields};

/// Keyword search over the catalog. A blank query selects nothing; otherwise
/// a recipe matches when the query, case-insensitively, is a substring of its
/// name, description, meal type, cuisine, difficulty, or any ingredient or
/// dietary tag. Input order is preserved.
pub fn filter(recipes: &[Recipe], query: &str) -> Vec<Recipe> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    recipes
        .iter()
        .filter(|r| matches(&r.fields, &needle))
        .cloned()
        .collect()
}

/// `needle` must already be lower-cased.
pub fn matches(fields: &RecipeFields, needle: &str) -> bool {
    let hit = |haystack: &str| haystack.to_lowercase().contains(needle);

    hit(&fields.recipe_name)
        || hit(&fields.description)
        || fields.ingredients.iter().any(|i| hit(i))
        || hit(&fields.meal_type)
        || hit(&fields.cuisine)
        || hit(&fields.difficulty)
        || fields.dietary_requirements.iter().any(|d| hit(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curry() -> Recipe {
        Recipe::new(
            "r1",
            RecipeFields {
                recipe_name: "Spicy Chickpea Curry".into(),
                cuisine: "Indian".into(),
                ingredients: vec!["chickpeas".into(), "cumin".into()],
                ..Default::default()
            },
        )
    }

    fn salad() -> Recipe {
        Recipe::new(
            "r2",
            RecipeFields {
                recipe_name: "Green Salad".into(),
                description: "Crunchy and fresh".into(),
                meal_type: "Lunch".into(),
                difficulty: "Easy".into(),
                dietary_requirements: vec!["Vegan".into(), "Gluten Free".into()],
                ..Default::default()
            },
        )
    }

    #[test]
    fn chickpea_scenario() {
        let recipes = vec![curry()];
        assert_eq!(filter(&recipes, "chick"), recipes);
        assert_eq!(filter(&recipes, "CHICK"), recipes);
        assert!(filter(&recipes, "thai").is_empty());
    }

    #[test]
    fn blank_query_selects_nothing() {
        let recipes = vec![curry(), salad()];
        assert!(filter(&recipes, "").is_empty());
        assert!(filter(&recipes, "   ").is_empty());
    }

    #[test]
    fn name_substring_always_matches() {
        let recipes = vec![curry(), salad()];
        for q in ["s", "Spicy", "pea cu", "curry", "en sal"] {
            let found = filter(&recipes, q);
            assert!(
                found.iter().any(|r| r.fields.recipe_name.to_lowercase().contains(&q.to_lowercase())),
                "query {q:?}"
            );
        }
    }

    #[test]
    fn every_searchable_field_is_considered() {
        let recipes = vec![curry(), salad()];
        let ids = |q: &str| filter(&recipes, q).into_iter().map(|r| r.id).collect::<Vec<_>>();

        assert_eq!(ids("crunchy"), vec!["r2"]); // description
        assert_eq!(ids("cumin"), vec!["r1"]); // ingredient
        assert_eq!(ids("lunch"), vec!["r2"]); // meal type
        assert_eq!(ids("indian"), vec!["r1"]); // cuisine
        assert_eq!(ids("easy"), vec!["r2"]); // difficulty
        assert_eq!(ids("gluten"), vec!["r2"]); // dietary
    }

    #[test]
    fn keeps_input_order_and_tolerates_empty_fields() {
        let bare = Recipe::new("r0", RecipeFields::default());
        let recipes = vec![salad(), bare, curry()];
        let ids: Vec<_> = filter(&recipes, "c").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
    }
}
