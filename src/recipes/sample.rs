use rand::{seq::SliceRandom, Rng};

use super::model::Recipe;

pub const DEFAULT_DISCOVERY_SIZE: usize = 5;

/// Up to `n` recipes drawn without replacement, in random order.
pub fn sample(recipes: &[Recipe], n: usize) -> Vec<Recipe> {
    sample_with(recipes, n, &mut rand::thread_rng())
}

pub fn sample_with<R: Rng + ?Sized>(recipes: &[Recipe], n: usize, rng: &mut R) -> Vec<Recipe> {
    let mut picked = recipes.to_vec();
    picked.shuffle(rng);
    picked.truncate(n);
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::model::RecipeFields;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashSet;

    fn catalog(len: usize) -> Vec<Recipe> {
        (0..len)
            .map(|i| {
                Recipe::new(
                    format!("r{i}"),
                    RecipeFields {
                        recipe_name: format!("Recipe {i}"),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn returns_min_of_n_and_len_without_duplicates() {
        for len in [0, 1, 3, 5, 12] {
            let recipes = catalog(len);
            let ids: HashSet<_> = recipes.iter().map(|r| r.id.clone()).collect();
            for n in [0, 1, 5, 20] {
                let picked = sample(&recipes, n);
                assert_eq!(picked.len(), n.min(len));
                let unique: HashSet<_> = picked.iter().map(|r| r.id.clone()).collect();
                assert_eq!(unique.len(), picked.len());
                assert!(unique.is_subset(&ids));
            }
        }
    }

    #[test]
    fn input_is_left_untouched() {
        let recipes = catalog(10);
        let before = recipes.clone();
        let _ = sample(&recipes, 3);
        assert_eq!(recipes, before);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let recipes = catalog(10);
        let a = sample_with(&recipes, DEFAULT_DISCOVERY_SIZE, &mut StdRng::seed_from_u64(7));
        let b = sample_with(&recipes, DEFAULT_DISCOVERY_SIZE, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.len(), DEFAULT_DISCOVERY_SIZE);
    }
}
