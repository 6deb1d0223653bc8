//! View state derived from live subscriptions. Every view re-derives its
//! state from the full collection on each snapshot and publishes it through a
//! `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::SubscriptionManager;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::preload::{image_uris, ImagePreloader};
use crate::recipes::{filter, normalize, read_recipe, sample, Recipe, RecipeFields};
use crate::saved::{SavedFlag, SavedRecipes};
use crate::store::{path, Snapshot, SnapshotCallback, StoreClient};

pub type Feed = watch::Receiver<Vec<Recipe>>;

/// Attaches `path` and republishes `derive(normalized records)` on every
/// snapshot.
async fn attach_feed<F>(live: &SubscriptionManager, path: &str, derive: F) -> Result<Feed, AppError>
where
    F: Fn(Vec<Recipe>) -> Vec<Recipe> + Send + Sync + 'static,
{
    let (tx, rx) = watch::channel(Vec::new());
    let callback: SnapshotCallback = Arc::new(move |snap: Snapshot| {
        tx.send_replace(derive(normalize(snap.val())));
    });
    live.attach(path, callback).await?;
    Ok(rx)
}

/// The whole catalog, optionally warming the image cache on each change.
pub async fn watch_catalog(
    live: &SubscriptionManager,
    preloader: Option<Arc<dyn ImagePreloader>>,
) -> Result<Feed, AppError> {
    attach_feed(live, path::RECIPES, move |recipes| {
        if let Some(preloader) = &preloader {
            preloader.preload(&image_uris(&recipes));
        }
        recipes
    })
    .await
}

pub async fn watch_discovery(live: &SubscriptionManager, size: usize) -> Result<Feed, AppError> {
    attach_feed(live, path::RECIPES, move |recipes| sample(&recipes, size)).await
}

pub async fn watch_saved(
    live: &SubscriptionManager,
    user: Option<&CurrentUser>,
) -> Result<Feed, AppError> {
    let user = user.ok_or(AppError::AuthRequired)?;
    attach_feed(live, &path::saved_recipes(user.uid), |recipes| recipes).await
}

/// A single recipe. The last known value is kept if the record disappears.
pub async fn watch_recipe(
    live: &SubscriptionManager,
    recipe_id: &str,
) -> Result<watch::Receiver<Option<Recipe>>, AppError> {
    path::validate_key(recipe_id)?;
    let (tx, rx) = watch::channel(None);
    let id = recipe_id.to_string();
    let callback: SnapshotCallback = Arc::new(move |snap: Snapshot| {
        if let Some(recipe) = snap.val().and_then(|v| read_recipe(&id, v)) {
            tx.send_replace(Some(recipe));
        }
    });
    live.attach(&path::recipe(recipe_id), callback).await?;
    Ok(rx)
}

/// Home screen: the user's saved recipes and a discovery sample, attached
/// independently. Guests only get the discovery feed.
pub struct HomeView {
    live: SubscriptionManager,
    pub saved: Feed,
    pub discovery: Feed,
    pub greeting: String,
}

impl HomeView {
    pub async fn open(
        store: Arc<dyn StoreClient>,
        user: Option<&CurrentUser>,
        discovery_size: usize,
    ) -> Result<Self, AppError> {
        let live = SubscriptionManager::new(store);
        let saved = match user {
            Some(_) => watch_saved(&live, user).await?,
            None => watch::channel(Vec::new()).1,
        };
        let discovery = watch_discovery(&live, discovery_size).await?;
        let greeting = match user {
            Some(u) => format!("Welcome {}!", u.display_name()),
            None => "Welcome!".to_string(),
        };
        Ok(Self {
            live,
            saved,
            discovery,
            greeting,
        })
    }

    pub fn attached_paths(&self) -> Vec<String> {
        self.live.attached_paths()
    }

    pub fn close(self) {
        self.live.detach_all();
    }
}

/// Search screen. Changing the query re-attaches; a blank query clears the
/// results without subscribing at all.
pub struct SearchView {
    live: SubscriptionManager,
    results: Arc<watch::Sender<Vec<Recipe>>>,
    query: String,
}

impl SearchView {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        let (results, _) = watch::channel(Vec::new());
        Self {
            live: SubscriptionManager::new(store),
            results: Arc::new(results),
            query: String::new(),
        }
    }

    pub async fn open(store: Arc<dyn StoreClient>, query: &str) -> Result<Self, AppError> {
        let mut view = Self::new(store);
        view.set_query(query).await?;
        Ok(view)
    }

    pub fn results(&self) -> Feed {
        self.results.subscribe()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub async fn set_query(&mut self, query: &str) -> Result<(), AppError> {
        self.query = query.to_string();
        if query.trim().is_empty() {
            self.live.detach(path::RECIPES);
            self.results.send_replace(Vec::new());
            return Ok(());
        }

        debug!(query, "search attached");
        let results = self.results.clone();
        let query = query.to_string();
        let callback: SnapshotCallback = Arc::new(move |snap: Snapshot| {
            results.send_replace(filter(&normalize(snap.val()), &query));
        });
        self.live.attach(path::RECIPES, callback).await
    }

    pub fn is_attached(&self) -> bool {
        !self.live.attached_paths().is_empty()
    }

    pub fn close(self) {
        self.live.detach_all();
    }
}

/// Recipe details plus, for signed-in users, the live saved flag.
pub struct RecipeView {
    live: SubscriptionManager,
    pub recipe: watch::Receiver<Option<Recipe>>,
    saved: Option<SavedFlag>,
}

impl RecipeView {
    pub async fn open(
        store: Arc<dyn StoreClient>,
        saved: &SavedRecipes,
        user: Option<&CurrentUser>,
        recipe_id: &str,
    ) -> Result<Self, AppError> {
        let live = SubscriptionManager::new(store);
        let recipe = watch_recipe(&live, recipe_id).await?;
        let saved = match user {
            Some(_) => Some(saved.watch(user, recipe_id).await?),
            None => None,
        };
        Ok(Self {
            live,
            recipe,
            saved,
        })
    }

    pub fn is_saved(&self) -> bool {
        self.saved.as_ref().is_some_and(SavedFlag::is_saved)
    }

    /// Saves a copy of the recipe as currently shown, or removes the saved
    /// copy.
    pub async fn toggle_save(&mut self) -> Result<bool, AppError> {
        let flag = self.saved.as_mut().ok_or(AppError::AuthRequired)?;
        let snapshot: RecipeFields = self
            .recipe
            .borrow()
            .as_ref()
            .map(|r| r.fields.clone())
            .ok_or_else(|| AppError::NotFound("recipe".into()))?;
        flag.toggle(&snapshot).await
    }

    pub fn close(mut self) {
        if let Some(flag) = self.saved.as_mut() {
            flag.detach();
        }
        self.live.detach_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::TracingNotifier;
    use crate::store::MemoryStore;
    use serde_json::json;
    use uuid::Uuid;

    fn user() -> CurrentUser {
        CurrentUser {
            uid: Uuid::new_v4(),
            email: "ada.lovelace@example.com".into(),
        }
    }

    async fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (id, name, cuisine) in [
            ("r1", "Spicy Chickpea Curry", "Indian"),
            ("r2", "Green Thai Curry", "Thai"),
            ("r3", "Margherita Pizza", "Italian"),
        ] {
            store
                .write_path(
                    &path::recipe(id),
                    json!({"recipeName": name, "cuisine": cuisine, "image": format!("https://img/{id}.jpg")}),
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn catalog_feed_follows_writes_and_preloads() {
        struct Counting(std::sync::Mutex<Vec<usize>>);
        impl ImagePreloader for Counting {
            fn preload(&self, uris: &[String]) {
                self.0.lock().unwrap().push(uris.len());
            }
        }

        let store = seeded().await;
        let live = SubscriptionManager::new(store.clone());
        let preloader = Arc::new(Counting(Default::default()));
        let feed = watch_catalog(&live, Some(preloader.clone())).await.unwrap();
        assert_eq!(feed.borrow().len(), 3);

        store
            .write_path(&path::recipe("r4"), json!({"recipeName": "Pho"}))
            .await
            .unwrap();
        assert_eq!(feed.borrow().len(), 4);
        assert_eq!(*preloader.0.lock().unwrap(), vec![3, 3]);
    }

    #[tokio::test]
    async fn search_view_reattaches_on_query_change() {
        let store = seeded().await;
        let mut view = SearchView::open(store.clone(), "curry").await.unwrap();
        let results = view.results();
        assert_eq!(results.borrow().len(), 2);

        view.set_query("thai").await.unwrap();
        assert_eq!(results.borrow().len(), 1);
        assert_eq!(store.watcher_count(), 1);

        store
            .write_path(&path::recipe("r5"), json!({"recipeName": "Thai Basil Chicken"}))
            .await
            .unwrap();
        assert_eq!(results.borrow().len(), 2);

        view.set_query("  ").await.unwrap();
        assert!(results.borrow().is_empty());
        assert!(!view.is_attached());
        assert_eq!(store.watcher_count(), 0);
    }

    #[tokio::test]
    async fn home_view_attaches_saved_and_discovery_independently() {
        let store = seeded().await;
        let user = user();
        let home = HomeView::open(store.clone(), Some(&user), 2).await.unwrap();
        assert_eq!(home.greeting, "Welcome Ada!");
        assert_eq!(home.discovery.borrow().len(), 2);
        assert!(home.saved.borrow().is_empty());
        assert_eq!(home.attached_paths().len(), 2);

        store
            .write_path(
                &path::saved_recipe(user.uid, "r1"),
                json!({"recipeName": "Spicy Chickpea Curry"}),
            )
            .await
            .unwrap();
        assert_eq!(home.saved.borrow().len(), 1);
        assert_eq!(home.saved.borrow()[0].id, "r1");

        home.close();
        assert_eq!(store.watcher_count(), 0);
    }

    #[tokio::test]
    async fn guest_home_only_discovers() {
        let store = seeded().await;
        let home = HomeView::open(store, None, 5).await.unwrap();
        assert_eq!(home.greeting, "Welcome!");
        assert_eq!(home.attached_paths(), vec!["recipes".to_string()]);
        assert_eq!(home.discovery.borrow().len(), 3);
    }

    #[tokio::test]
    async fn saved_feed_requires_a_user() {
        let store = seeded().await;
        let live = SubscriptionManager::new(store);
        let err = watch_saved(&live, None).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert!(live.attached_paths().is_empty());
    }

    #[tokio::test]
    async fn recipe_view_toggles_saved_copy() {
        let store = seeded().await;
        let saved = SavedRecipes::new(store.clone(), Arc::new(TracingNotifier));
        let user = user();
        let mut view = RecipeView::open(store.clone(), &saved, Some(&user), "r3")
            .await
            .unwrap();
        assert_eq!(
            view.recipe.borrow().as_ref().unwrap().fields.recipe_name,
            "Margherita Pizza"
        );
        assert!(!view.is_saved());

        assert!(view.toggle_save().await.unwrap());
        assert!(view.is_saved());
        let copy = store
            .read_path(&path::saved_recipe(user.uid, "r3"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(copy["recipeName"], "Margherita Pizza");

        view.close();
        assert_eq!(store.watcher_count(), 0);
    }

    #[tokio::test]
    async fn guest_recipe_view_cannot_save() {
        let store = seeded().await;
        let saved = SavedRecipes::new(store.clone(), Arc::new(TracingNotifier));
        let mut view = RecipeView::open(store.clone(), &saved, None, "r1").await.unwrap();
        let err = view.toggle_save().await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired));
        assert!(store
            .read_path("users")
            .await
            .unwrap()
            .is_none());
    }
}
