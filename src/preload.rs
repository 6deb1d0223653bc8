use tracing::debug;

use crate::recipes::Recipe;

/// Best-effort image cache warmer. Nothing waits on it.
pub trait ImagePreloader: Send + Sync {
    fn preload(&self, uris: &[String]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPreloader;

impl ImagePreloader for TracingPreloader {
    fn preload(&self, uris: &[String]) {
        debug!(count = uris.len(), "preloading recipe images");
    }
}

pub fn image_uris(recipes: &[Recipe]) -> Vec<String> {
    recipes
        .iter()
        .filter_map(|r| r.fields.image.clone())
        .filter(|uri| !uri.trim().is_empty())
        .collect()
}
