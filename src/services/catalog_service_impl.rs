//! `SeaORM` implementation of the `CatalogService` trait.
//!
//! A detail sync flows through three cache tiers: the response cache (fully
//! formatted views), the transformed-record cache (`transformed:movie:{id}`)
//! and the Provider client's raw cache. The write itself (movie upsert, genre
//! assignment and relationship edges) is one transaction per movie.

use crate::cache::{CacheBackend, ResponseCache, ResponseKind};
use crate::clients::{FetchMode, MovieProvider, ProviderError, ProviderRequest};
use crate::config::Config;
use crate::db::{ChartOrder, GenreRepository, MoviePage, MovieRepository, Store};
use crate::domain::{MovieId, ProviderId};
use crate::models::{
    Genre, Movie, MovieDetail, MovieSummary, PagedResult, Pagination, RelationType,
    StalenessPolicy, SyncStatus,
};
use crate::services::catalog_service::{BulkSyncReport, CatalogService, DiscoverList, SyncError};
use crate::services::reconciler::Reconciler;
use crate::transform::{self, BasicMovieRecord, CompleteMovieRecord, Listing, TransformError};
use chrono::Utc;
use futures::{StreamExt, stream};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const TRANSFORMED_NAMESPACE: &str = "transformed";

/// Tunables for the sync pipeline.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub staleness: StalenessPolicy,
    pub bulk_concurrency: usize,
    pub failure_cooldown: Duration,
    pub transformed_ttl: Duration,
    pub related_limit: usize,
    pub include_adult: bool,
    pub page_size: u64,
    pub image_base_url: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut staleness = config.sync.staleness_policy();
        // A retry inside the transformed TTL would only replay the cached record.
        if let Ok(transformed) = chrono::Duration::from_std(config.cache.transformed_ttl()) {
            staleness.incomplete_window = staleness.incomplete_window.max(transformed);
        }

        Self {
            staleness,
            bulk_concurrency: config.sync.bulk_concurrency.max(1),
            failure_cooldown: Duration::from_secs(config.sync.failure_cooldown_seconds),
            transformed_ttl: config.cache.transformed_ttl(),
            related_limit: config.provider.related_limit,
            include_adult: config.provider.include_adult,
            page_size: config.sync.page_size.max(1),
            image_base_url: config.provider.image_base_url.clone(),
        }
    }
}

/// How a single-item sync ended.
enum SyncOutcome {
    /// The local record was fresh; no Provider call was made.
    Fresh(Movie),
    Synced(Movie),
    /// The sync failed; the best local record is served instead.
    Degraded(Movie, SyncError),
}

impl SyncOutcome {
    fn into_movie(self) -> Movie {
        match self {
            Self::Fresh(movie) | Self::Synced(movie) | Self::Degraded(movie, _) => movie,
        }
    }
}

/// A paused Provider id. `not_found` remembers that the Provider had no
/// such movie, so callers keep seeing `NotFound` while it lasts.
#[derive(Debug, Clone, Copy)]
struct Cooldown {
    started: Instant,
    not_found: bool,
}

/// Either a stored movie or a listing entry that was not stored.
enum ListingEntry<'a> {
    Local(Movie),
    Remote(&'a BasicMovieRecord),
}

/// SeaORM-based implementation of [`CatalogService`].
pub struct SeaOrmCatalogService {
    store: Arc<Store>,
    provider: Arc<dyn MovieProvider>,
    cache: Arc<dyn CacheBackend>,
    response_cache: ResponseCache,
    reconciler: Reconciler,
    settings: SyncSettings,
    cooldowns: Arc<std::sync::RwLock<HashMap<ProviderId, Cooldown>>>,
}

impl SeaOrmCatalogService {
    /// Creates a new instance of the service.
    ///
    /// `cache` backs the transformed-record tier; the response cache usually
    /// shares the same backend under its own namespace.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        provider: Arc<dyn MovieProvider>,
        cache: Arc<dyn CacheBackend>,
        response_cache: ResponseCache,
        settings: SyncSettings,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone(), response_cache.clone()),
            store,
            provider,
            cache,
            response_cache,
            settings,
            cooldowns: Arc::new(std::sync::RwLock::new(HashMap::new())),
        }
    }

    #[must_use]
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    fn transformed_key(provider_id: ProviderId) -> String {
        format!("{TRANSFORMED_NAMESPACE}:movie:{provider_id}")
    }

    fn active_cooldown(&self, provider_id: ProviderId) -> Option<Cooldown> {
        self.cooldowns
            .read()
            .ok()
            .and_then(|guard| guard.get(&provider_id).copied())
            .filter(|cooldown| cooldown.started.elapsed() < self.settings.failure_cooldown)
    }

    fn start_cooldown(&self, provider_id: ProviderId, not_found: bool) {
        let window = self.settings.failure_cooldown;
        if let Ok(mut guard) = self.cooldowns.write() {
            guard.retain(|_, cooldown| cooldown.started.elapsed() < window);
            guard.insert(
                provider_id,
                Cooldown {
                    started: Instant::now(),
                    not_found,
                },
            );
        }
    }

    fn clear_cooldown(&self, provider_id: ProviderId) {
        if let Ok(mut guard) = self.cooldowns.write() {
            guard.remove(&provider_id);
        }
    }

    /// Complete record for `provider_id`, from the transformed tier unless
    /// `force` is set.
    async fn load_record(
        &self,
        provider_id: ProviderId,
        force: bool,
    ) -> Result<CompleteMovieRecord, SyncError> {
        let key = Self::transformed_key(provider_id);

        if !force {
            match self.cache.get(&key).await {
                Ok(Some(body)) => match serde_json::from_str(&body) {
                    Ok(record) => {
                        debug!(%provider_id, "Transformed record cache hit");
                        return Ok(record);
                    }
                    Err(e) => debug!(error = %e, "Ignoring undecodable transformed record"),
                },
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Transformed cache read failed"),
            }
        }

        let mode = if force {
            FetchMode::Fresh
        } else {
            FetchMode::Cached
        };
        let payload = self
            .provider
            .fetch(&ProviderRequest::movie_details(provider_id), mode)
            .await?;

        let record = transform::complete_movie(&payload, self.settings.related_limit)?;
        if record.basic.provider_id != provider_id {
            return Err(TransformError::InvalidField {
                field: "id",
                reason: format!(
                    "requested {provider_id}, payload carries {}",
                    record.basic.provider_id
                ),
            }
            .into());
        }

        match serde_json::to_string(&record) {
            Ok(body) => {
                if let Err(e) = self
                    .cache
                    .set(&key, &body, self.settings.transformed_ttl)
                    .await
                {
                    warn!(error = %e, "Transformed cache write failed");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode transformed record"),
        }

        Ok(record)
    }

    /// Writes a complete record with its genres and edges in one transaction.
    async fn persist(&self, record: &CompleteMovieRecord) -> Result<Movie, SyncError> {
        let now = Utc::now();

        let related: Vec<(RelationType, &[ProviderId])> = [
            (
                RelationType::ProviderRecommendation,
                record.recommendation_ids.as_deref(),
            ),
            (RelationType::ProviderSimilar, record.similar_ids.as_deref()),
        ]
        .into_iter()
        .filter_map(|(relation_type, ids)| ids.map(|ids| (relation_type, ids)))
        .collect();

        let wanted: Vec<ProviderId> = related
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        let resolved = self.store.get_movies_by_provider_ids(&wanted).await?;

        let txn = self.store.begin().await?;

        GenreRepository::upsert_all(&txn, &record.genres).await?;
        let movie = MovieRepository::upsert_complete(&txn, record, now).await?;
        Reconciler::assign_genres_in(&txn, &movie, &record.basic.genre_ids, now).await?;
        for (relation_type, ids) in related {
            Reconciler::sync_relationships_in(&txn, &movie, ids, relation_type, &resolved, now)
                .await?;
        }

        txn.commit().await?;
        Ok(movie)
    }

    async fn sync_one(&self, provider_id: ProviderId, force: bool) -> Result<SyncOutcome, SyncError> {
        let existing = self.store.get_movie_by_provider_id(provider_id).await?;

        if let Some(movie) = &existing {
            if !movie.is_active {
                return Err(SyncError::Inactive(provider_id));
            }
            if !force && !self.needs_sync(movie) {
                metrics::counter!("catalog_sync_total", "outcome" => "fresh").increment(1);
                return Ok(SyncOutcome::Fresh(movie.clone()));
            }
        }

        if !force && let Some(cooldown) = self.active_cooldown(provider_id) {
            debug!(%provider_id, "Skipping provider call during failure cooldown");
            metrics::counter!("catalog_sync_total", "outcome" => "cooldown").increment(1);
            return match existing {
                Some(movie) => Ok(SyncOutcome::Degraded(
                    movie,
                    SyncError::CoolingDown(provider_id),
                )),
                None if cooldown.not_found => Err(SyncError::NotFound(provider_id)),
                None => Err(SyncError::CoolingDown(provider_id)),
            };
        }

        let result = match self.load_record(provider_id, force).await {
            Ok(record) => self.persist(&record).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(movie) => {
                self.clear_cooldown(provider_id);
                self.response_cache.invalidate_movie(provider_id).await;
                metrics::counter!("catalog_sync_total", "outcome" => "synced").increment(1);
                info!(%provider_id, title = %movie.title, "Movie synced");
                Ok(SyncOutcome::Synced(movie))
            }
            Err(error) => self.recover(provider_id, existing, error).await,
        }
    }

    /// Keeps reads available after a failed sync: fatal errors propagate,
    /// everything else degrades to the stored record when there is one.
    async fn recover(
        &self,
        provider_id: ProviderId,
        existing: Option<Movie>,
        error: SyncError,
    ) -> Result<SyncOutcome, SyncError> {
        metrics::counter!(
            "catalog_sync_total",
            "outcome" => "failed",
            "reason" => error.label()
        )
        .increment(1);

        if error.is_fatal() {
            error!(%provider_id, error = %error, "Movie sync failed");
            return Err(error);
        }

        let not_found = matches!(error, SyncError::Provider(ProviderError::NotFound(_)));
        self.start_cooldown(provider_id, not_found);

        let Some(movie) = existing else {
            warn!(%provider_id, error = %error, "Movie sync failed with no local record");
            return Err(match error {
                SyncError::Provider(ProviderError::NotFound(_)) => SyncError::NotFound(provider_id),
                other => other,
            });
        };

        warn!(%provider_id, error = %error, "Movie sync failed; serving local record");

        let mark_failed = match &error {
            SyncError::Transform(_) | SyncError::Relationship(_) => true,
            SyncError::Provider(ProviderError::NotFound(_)) => self.needs_sync(&movie),
            _ => false,
        };

        if let Err(e) = self
            .store
            .record_sync_failure(provider_id, &error.to_string(), mark_failed, Utc::now())
            .await
        {
            warn!(%provider_id, error = %e, "Failed to record sync failure");
        }

        let current = match self.store.get_movie_by_provider_id(provider_id).await {
            Ok(Some(current)) => current,
            _ => movie,
        };
        Ok(SyncOutcome::Degraded(current, error))
    }

    /// Listing entries in Provider order. Known movies are shown from their
    /// local record and inactive ones are left out.
    async fn resolve_listing<'a>(
        &self,
        records: &'a [BasicMovieRecord],
        store_results: bool,
    ) -> Result<Vec<ListingEntry<'a>>, SyncError> {
        let ids: Vec<ProviderId> = records.iter().map(|r| r.provider_id).collect();
        let mut known = self.store.get_movies_by_provider_ids(&ids).await?;
        let now = Utc::now();

        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            if let Some(movie) = known.remove(&record.provider_id) {
                if movie.is_active {
                    entries.push(ListingEntry::Local(movie));
                }
            } else if store_results {
                let movie = self.store.insert_partial_movie(record, now).await?;
                if !record.genre_ids.is_empty() && movie.sync_status == SyncStatus::Partial {
                    self.reconciler
                        .assign_genres(&movie, &record.genre_ids)
                        .await?;
                }
                entries.push(ListingEntry::Local(movie));
            } else {
                entries.push(ListingEntry::Remote(record));
            }
        }

        Ok(entries)
    }

    async fn summarize_listing(
        &self,
        records: &[BasicMovieRecord],
        store_results: bool,
    ) -> Result<Vec<MovieSummary>, SyncError> {
        let entries = self.resolve_listing(records, store_results).await?;

        let local_ids: Vec<MovieId> = entries
            .iter()
            .filter_map(|entry| match entry {
                ListingEntry::Local(movie) => Some(movie.id),
                ListingEntry::Remote(_) => None,
            })
            .collect();
        let mut genre_ids = self.store.provider_genre_ids_for(&local_ids).await?;

        let base = &self.settings.image_base_url;
        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                ListingEntry::Local(movie) => MovieSummary::from_movie(
                    &movie,
                    genre_ids.remove(&movie.id).unwrap_or_default(),
                    base,
                ),
                ListingEntry::Remote(record) => MovieSummary::from_record(record, base),
            })
            .collect())
    }

    async fn summarize_movies(&self, movies: &[Movie]) -> Result<Vec<MovieSummary>, SyncError> {
        let ids: Vec<MovieId> = movies.iter().map(|m| m.id).collect();
        let mut genre_ids = self.store.provider_genre_ids_for(&ids).await?;

        Ok(movies
            .iter()
            .map(|movie| {
                MovieSummary::from_movie(
                    movie,
                    genre_ids.remove(&movie.id).unwrap_or_default(),
                    &self.settings.image_base_url,
                )
            })
            .collect())
    }

    async fn local_page(
        &self,
        found: MoviePage,
        page: u32,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let results = self.summarize_movies(&found.movies).await?;

        Ok(PagedResult::new(
            Pagination::new(
                page,
                u32::try_from(found.total_pages).unwrap_or(u32::MAX),
                found.total_results,
            ),
            results,
        ))
    }

    async fn local_search(
        &self,
        query: &str,
        page: u32,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let found = self
            .store
            .search_movies_by_title(query, u64::from(page), self.settings.page_size)
            .await?;
        self.local_page(found, page).await
    }

    async fn local_chart(
        &self,
        list: DiscoverList,
        page: u32,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let order = match list {
            DiscoverList::TopRated => ChartOrder::Rating,
            DiscoverList::Popular | DiscoverList::Trending(_) => ChartOrder::Popularity,
        };
        let found = self
            .store
            .list_active_movies(order, u64::from(page), self.settings.page_size)
            .await?;
        self.local_page(found, page).await
    }

    /// One parsed listing page, or `None` when the Provider could not serve
    /// a usable page and the caller should fall back to local data.
    async fn fetch_listing(&self, request: &ProviderRequest) -> Result<Option<Listing>, SyncError> {
        let endpoint = request.endpoint.label();
        let payload = match self.provider.fetch(request, FetchMode::Cached).await {
            Ok(payload) => payload,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, endpoint, "Provider listing failed; serving local data");
                return Ok(None);
            }
        };

        match transform::listing(&payload) {
            Ok(listing) => {
                if listing.skipped > 0 {
                    debug!(skipped = listing.skipped, endpoint, "Dropped listing entries without an id");
                }
                Ok(Some(listing))
            }
            Err(e) => {
                warn!(error = %e, endpoint, "Unreadable provider listing; serving local data");
                Ok(None)
            }
        }
    }

    /// Drops cached related lists of every movie linking to `movie`.
    async fn invalidate_sources(&self, sources: &[ProviderId]) {
        for source in sources {
            self.response_cache.invalidate_movie(*source).await;
        }
    }

    async fn sources_of(&self, movie: &Movie) -> Vec<ProviderId> {
        match self.store.relationship_sources(movie.id).await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(provider_id = %movie.provider_id, error = %e, "Failed to load linking movies");
                Vec::new()
            }
        }
    }

    async fn require_local(&self, provider_id: ProviderId) -> Result<Movie, SyncError> {
        self.store
            .get_movie_by_provider_id(provider_id)
            .await?
            .ok_or(SyncError::NotFound(provider_id))
    }
}

#[async_trait::async_trait]
impl CatalogService for SeaOrmCatalogService {
    async fn get_or_sync(&self, provider_id: ProviderId, force: bool) -> Result<Movie, SyncError> {
        self.sync_one(provider_id, force)
            .await
            .map(SyncOutcome::into_movie)
    }

    fn needs_sync(&self, movie: &Movie) -> bool {
        movie.needs_sync(&self.settings.staleness, Utc::now())
    }

    async fn bulk_sync(&self, provider_ids: &[ProviderId]) -> Result<BulkSyncReport, SyncError> {
        let mut seen = HashSet::new();
        let ids: Vec<ProviderId> = provider_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        #[allow(clippy::cast_precision_loss)]
        metrics::histogram!("catalog_bulk_sync_size").record(ids.len() as f64);

        let mut outcomes = stream::iter(ids)
            .map(|id| async move { (id, self.sync_one(id, false).await) })
            .buffered(self.settings.bulk_concurrency);

        let mut report = BulkSyncReport::default();
        while let Some((id, outcome)) = outcomes.next().await {
            match outcome {
                Ok(SyncOutcome::Fresh(movie) | SyncOutcome::Synced(movie)) => {
                    report.synced.push(movie);
                }
                Ok(SyncOutcome::Degraded(_, e)) => {
                    debug!(provider_id = %id, error = %e, "Bulk item degraded");
                    report.failed.push(id);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!(provider_id = %id, error = %e, "Bulk item failed");
                    report.failed.push(id);
                }
            }
        }

        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            "Bulk sync finished"
        );
        Ok(report)
    }

    async fn search_and_store(
        &self,
        query: &str,
        page: u32,
        store_results: bool,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SyncError::Validation(
                "search query must not be empty".to_string(),
            ));
        }
        let page = page.max(1);

        let key = ResponseCache::search_key(query, page, store_results);
        if let Some(hit) = self.response_cache.get(ResponseKind::Search, &key).await {
            return Ok(hit);
        }

        let request = ProviderRequest::search(query, page, self.settings.include_adult);
        let Some(listing) = self.fetch_listing(&request).await? else {
            return self.local_search(query, page).await;
        };

        let results = self
            .summarize_listing(&listing.records, store_results)
            .await?;
        let result = PagedResult::new(listing.pagination, results);

        self.response_cache
            .put(ResponseKind::Search, &key, &result)
            .await;
        Ok(result)
    }

    async fn movie_details(
        &self,
        provider_id: ProviderId,
        force: bool,
    ) -> Result<MovieDetail, SyncError> {
        let key = ResponseCache::detail_key(provider_id);
        if !force
            && let Some(hit) = self.response_cache.get(ResponseKind::Detail, &key).await
        {
            return Ok(hit);
        }

        let movie = self.get_or_sync(provider_id, force).await?;
        let assignments = self.store.genre_assignments(movie.id).await?;
        let detail = MovieDetail::build(&movie, &assignments, &self.settings.image_base_url);

        if !self.needs_sync(&movie) {
            self.response_cache
                .put(ResponseKind::Detail, &key, &detail)
                .await;
        }
        Ok(detail)
    }

    async fn discover(
        &self,
        list: DiscoverList,
        page: u32,
        store_results: bool,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let page = page.max(1);
        let (kind, request) = match list {
            DiscoverList::Popular => (ResponseKind::List, ProviderRequest::popular(page)),
            DiscoverList::TopRated => (ResponseKind::List, ProviderRequest::top_rated(page)),
            DiscoverList::Trending(window) => (
                ResponseKind::Trending,
                ProviderRequest::trending(window, page),
            ),
        };

        let key = ResponseCache::list_key(list.as_str(), page, store_results);
        if let Some(hit) = self.response_cache.get(kind, &key).await {
            return Ok(hit);
        }

        let Some(listing) = self.fetch_listing(&request).await? else {
            return self.local_chart(list, page).await;
        };

        let results = self
            .summarize_listing(&listing.records, store_results)
            .await?;
        let result = PagedResult::new(listing.pagination, results);

        self.response_cache.put(kind, &key, &result).await;
        Ok(result)
    }

    async fn sync_genre_taxonomy(&self) -> Result<Vec<Genre>, SyncError> {
        let payload = self
            .provider
            .fetch(&ProviderRequest::genre_list(), FetchMode::Fresh)
            .await?;
        let records = transform::genre_list(&payload)?;

        let count = self.reconciler.upsert_genres(&records).await?;
        info!(count, "Genre taxonomy synced");

        Ok(self.store.list_genres().await?)
    }

    async fn refresh_stale(&self, limit: usize) -> Result<BulkSyncReport, SyncError> {
        let stale = self
            .store
            .stale_movies(&self.settings.staleness, Utc::now(), limit)
            .await?;

        if stale.is_empty() {
            debug!("No stale movies to refresh");
            return Ok(BulkSyncReport::default());
        }

        let ids: Vec<ProviderId> = stale.iter().map(|m| m.provider_id).collect();
        info!(count = ids.len(), "Refreshing stale movies");
        self.bulk_sync(&ids).await
    }

    async fn related_movies(
        &self,
        provider_id: ProviderId,
        relation_type: RelationType,
        limit: usize,
    ) -> Result<Vec<MovieSummary>, SyncError> {
        let key = ResponseCache::related_key(provider_id, relation_type);

        let all: Vec<MovieSummary> =
            if let Some(hit) = self.response_cache.get(ResponseKind::Related, &key).await {
                hit
            } else {
                let movie = self.get_or_sync(provider_id, false).await?;
                let targets = self.store.related_targets(movie.id, relation_type).await?;
                let summaries = self.summarize_movies(&targets).await?;

                if !self.needs_sync(&movie) {
                    self.response_cache
                        .put(ResponseKind::Related, &key, &summaries)
                        .await;
                }
                summaries
            };

        Ok(all.into_iter().take(limit).collect())
    }

    async fn movies_by_genre(
        &self,
        slug: &str,
        page: u32,
    ) -> Result<PagedResult<MovieSummary>, SyncError> {
        let genre = self
            .store
            .get_genre_by_slug(slug.trim())
            .await?
            .ok_or_else(|| SyncError::Validation(format!("unknown genre: {slug}")))?;

        let page = page.max(1);
        let found = self
            .store
            .list_movies_by_genre(genre.id, u64::from(page), self.settings.page_size)
            .await?;
        let results = self.summarize_movies(&found.movies).await?;

        Ok(PagedResult::new(
            Pagination::new(
                page,
                u32::try_from(found.total_pages).unwrap_or(u32::MAX),
                found.total_results,
            ),
            results,
        ))
    }

    async fn deactivate(&self, provider_id: ProviderId) -> Result<(), SyncError> {
        let movie = self.require_local(provider_id).await?;
        self.store
            .set_movie_active(provider_id, false, Utc::now())
            .await?;

        self.response_cache.invalidate_movie(provider_id).await;
        let sources = self.sources_of(&movie).await;
        self.invalidate_sources(&sources).await;

        info!(%provider_id, "Movie deactivated");
        Ok(())
    }

    async fn reactivate(&self, provider_id: ProviderId) -> Result<(), SyncError> {
        let movie = self.require_local(provider_id).await?;
        self.store
            .set_movie_active(provider_id, true, Utc::now())
            .await?;

        self.response_cache.invalidate_movie(provider_id).await;
        let sources = self.sources_of(&movie).await;
        self.invalidate_sources(&sources).await;

        info!(%provider_id, "Movie reactivated");
        Ok(())
    }

    async fn delete(&self, provider_id: ProviderId) -> Result<(), SyncError> {
        let movie = self.require_local(provider_id).await?;
        let sources = self.sources_of(&movie).await;

        self.store.delete_movie(movie.id).await?;

        self.response_cache.invalidate_movie(provider_id).await;
        self.invalidate_sources(&sources).await;
        if let Err(e) = self.cache.delete(&Self::transformed_key(provider_id)).await {
            warn!(error = %e, "Transformed cache delete failed");
        }
        self.clear_cooldown(provider_id);

        info!(%provider_id, "Movie deleted");
        Ok(())
    }
}
