//! Shared fixtures: a scripted provider and a throwaway catalog database.

#![allow(dead_code)]

use async_trait::async_trait;
use movie_nexus::cache::{CacheBackend, MemoryCache, ResponseCache, ResponseTtls};
use movie_nexus::clients::{FetchMode, MovieProvider, ProviderError, ProviderRequest};
use movie_nexus::db::Store;
use movie_nexus::services::{SeaOrmCatalogService, SyncSettings};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Answers by endpoint path; unscripted paths are `NotFound`.
#[derive(Default)]
pub struct FakeProvider {
    responses: Mutex<HashMap<String, Result<Value, ProviderError>>>,
    calls: AtomicUsize,
    paths: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, path: &str, payload: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(payload));
    }

    pub fn fail(&self, path: &str, error: ProviderError) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.paths
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

#[async_trait]
impl MovieProvider for FakeProvider {
    async fn fetch(
        &self,
        request: &ProviderRequest,
        _mode: FetchMode,
    ) -> Result<Value, ProviderError> {
        let path = request.endpoint.path();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.paths.lock().unwrap().push(path.clone());

        self.responses
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .unwrap_or(Err(ProviderError::NotFound(path)))
    }
}

pub async fn temp_store(name: &str) -> Arc<Store> {
    let db_path = std::env::temp_dir().join(format!(
        "movie-nexus-{name}-test-{}.db",
        uuid::Uuid::new_v4()
    ));
    let store = Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("Failed to create test store");
    Arc::new(store)
}

pub struct Harness {
    pub store: Arc<Store>,
    pub provider: Arc<FakeProvider>,
    pub cache: Arc<dyn CacheBackend>,
    pub service: Arc<SeaOrmCatalogService>,
}

pub async fn harness(name: &str) -> Harness {
    harness_with(name, SyncSettings::default()).await
}

pub async fn harness_with(name: &str, settings: SyncSettings) -> Harness {
    let store = temp_store(name).await;
    let provider = FakeProvider::new();
    let cache: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
    let response_cache = ResponseCache::new(cache.clone(), ResponseTtls::default());

    let service = Arc::new(SeaOrmCatalogService::new(
        store.clone(),
        provider.clone(),
        cache.clone(),
        response_cache,
        settings,
    ));

    Harness {
        store,
        provider,
        cache,
        service,
    }
}

/// A released, fully populated detail payload.
pub fn detail_payload(id: i32, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_title": title,
        "overview": format!("{title} overview"),
        "tagline": "Tagline",
        "release_date": "1999-03-30",
        "status": "Released",
        "runtime": 136,
        "budget": 63000000,
        "revenue": 463517383,
        "imdb_id": "tt0133093",
        "original_language": "en",
        "adult": false,
        "popularity": 80.5,
        "vote_average": 8.2,
        "vote_count": 24000,
        "poster_path": format!("/{id}.jpg"),
        "backdrop_path": null,
        "genres": [
            {"id": 28, "name": "Action"},
            {"id": 878, "name": "Science Fiction"}
        ],
        "credits": {
            "cast": [
                {"id": 6384, "name": "Keanu Reeves", "character": "Neo", "order": 0}
            ],
            "crew": [
                {"id": 9339, "name": "Lana Wachowski", "job": "Director", "department": "Directing"}
            ]
        },
        "videos": {"results": []},
        "recommendations": {"page": 1, "results": []},
        "similar": {"page": 1, "results": []}
    })
}

pub fn with_recommendations(mut payload: Value, ids: &[i32]) -> Value {
    let results: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    payload["recommendations"] = json!({"page": 1, "results": results});
    payload
}

pub fn listing_entry(id: i32, title: &str, genre_ids: &[i32]) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_title": title,
        "overview": "",
        "release_date": "2001-01-01",
        "popularity": 10.0,
        "vote_average": 6.5,
        "vote_count": 100,
        "genre_ids": genre_ids,
        "poster_path": null
    })
}

pub fn listing_payload(entries: Vec<Value>) -> Value {
    let total = entries.len();
    json!({
        "page": 1,
        "total_pages": 1,
        "total_results": total,
        "results": entries
    })
}
