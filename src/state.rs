use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::cache::{CacheBackend, MemoryCache, ResponseCache};
use crate::clients::{MovieProvider, TmdbClient};
use crate::config::{CacheBackendKind, Config};
use crate::db::Store;
use crate::services::{CatalogService, Reconciler, SeaOrmCatalogService, SyncSettings};

/// Everything a command or the daemon needs, built once per process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Arc<Store>,

    pub cache: Arc<dyn CacheBackend>,

    pub provider: Arc<TmdbClient>,

    pub response_cache: ResponseCache,

    pub catalog: Arc<SeaOrmCatalogService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Arc::new(
            Store::with_pool_options(
                &config.general.database_path,
                config.general.max_db_connections,
                config.general.min_db_connections,
            )
            .await
            .context("Failed to open catalog database")?,
        );

        let cache: Arc<dyn CacheBackend> = match config.cache.backend {
            CacheBackendKind::Memory => Arc::new(MemoryCache::new()),
            CacheBackendKind::Database => store.cache_backend(),
        };

        let provider = Arc::new(
            TmdbClient::new(&config.provider, cache.clone(), config.cache.raw_ttls())
                .context("Failed to build provider client")?,
        );

        Ok(Self::assemble(config, store, cache, provider))
    }

    /// Wires the services around already constructed parts.
    #[must_use]
    pub fn assemble(
        config: Config,
        store: Arc<Store>,
        cache: Arc<dyn CacheBackend>,
        provider: Arc<TmdbClient>,
    ) -> Self {
        let response_cache = ResponseCache::new(cache.clone(), config.cache.response_ttls());
        let catalog = Arc::new(SeaOrmCatalogService::new(
            store.clone(),
            provider.clone() as Arc<dyn MovieProvider>,
            cache.clone(),
            response_cache.clone(),
            SyncSettings::from_config(&config),
        ));

        info!(
            backend = ?config.cache.backend,
            provider = provider.base_url(),
            "Catalog services ready"
        );

        Self {
            config: Arc::new(config),
            store,
            cache,
            provider,
            response_cache,
            catalog,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn CatalogService> {
        self.catalog.clone()
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        self.catalog.reconciler()
    }
}
