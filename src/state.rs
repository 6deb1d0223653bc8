use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{IdentityProvider, MemoryIdentity, PgIdentity};
use crate::config::{AppConfig, StoreBackend};
use crate::live::views::{watch_catalog, Feed};
use crate::live::SubscriptionManager;
use crate::notice::{Notifier, TracingNotifier};
use crate::preload::{ImagePreloader, TracingPreloader};
use crate::saved::SavedRecipes;
use crate::store::{MemoryStore, PgStore, StoreClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn StoreClient>,
    pub identity: Arc<dyn IdentityProvider>,
    pub saved: SavedRecipes,
    pub notifier: Arc<dyn Notifier>,
    /// Server-wide attachments; the catalog feed lives here.
    pub live: Arc<SubscriptionManager>,
    pub catalog: Feed,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (store, identity): (Arc<dyn StoreClient>, Arc<dyn IdentityProvider>) =
            match config.store_backend {
                StoreBackend::Memory => {
                    tracing::warn!("using in-memory store; data is lost on restart");
                    (Arc::new(MemoryStore::new()), Arc::new(MemoryIdentity::new()))
                }
                StoreBackend::Postgres => {
                    let url = config
                        .database_url
                        .as_deref()
                        .context("DATABASE_URL is not set")?;
                    let db = PgPoolOptions::new()
                        .max_connections(10)
                        .connect(url)
                        .await
                        .context("connect to database")?;
                    sqlx::migrate!("./migrations")
                        .run(&db)
                        .await
                        .context("run migrations")?;
                    let store = PgStore::connect(db.clone()).await?;
                    (Arc::new(store), Arc::new(PgIdentity::new(db)))
                }
            };

        Self::from_parts(
            config,
            store,
            identity,
            Arc::new(TracingNotifier),
            Arc::new(TracingPreloader),
        )
        .await
    }

    /// Wires the shared services and attaches the live catalog.
    pub async fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn StoreClient>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        preloader: Arc<dyn ImagePreloader>,
    ) -> anyhow::Result<Self> {
        let live = Arc::new(SubscriptionManager::new(store.clone()));
        let catalog = watch_catalog(&live, Some(preloader))
            .await
            .context("attach catalog")?;
        tracing::info!(backend = store.backend_tag(), "catalog attached");

        Ok(Self {
            saved: SavedRecipes::new(store.clone(), notifier.clone()),
            config,
            store,
            identity,
            notifier,
            live,
            catalog,
        })
    }

    /// In-memory state for tests.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::config::JwtConfig;

        let config = Arc::new(AppConfig {
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            discovery_size: crate::recipes::DEFAULT_DISCOVERY_SIZE,
        });

        Self::from_parts(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryIdentity::new()),
            Arc::new(TracingNotifier),
            Arc::new(TracingPreloader),
        )
        .await
        .expect("in-memory state always attaches")
    }
}
