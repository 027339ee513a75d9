//! Drives the TMDb client against a local stub server.

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use movie_nexus::cache::{CacheBackend, MemoryCache};
use movie_nexus::clients::tmdb::RawTtls;
use movie_nexus::clients::{
    FetchMode, MovieProvider, ProviderError, ProviderRequest, TmdbClient,
};
use movie_nexus::config::ProviderConfig;
use movie_nexus::domain::ProviderId;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Hit {
    path: String,
    query: String,
    authorization: Option<String>,
}

#[derive(Clone, Default)]
struct Recorder {
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Recorder {
    fn record(&self, path: String, query: Option<String>, headers: &HeaderMap) {
        self.hits.lock().unwrap().push(Hit {
            path,
            query: query.unwrap_or_default(),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        });
    }

    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }
}

async fn movie(
    State(recorder): State<Recorder>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    recorder.record(format!("movie/{id}"), query, &headers);

    match id.as_str() {
        "401" => StatusCode::UNAUTHORIZED.into_response(),
        "404" => StatusCode::NOT_FOUND.into_response(),
        "429" => (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "7")]).into_response(),
        "503" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        "418" => StatusCode::IM_A_TEAPOT.into_response(),
        "999" => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        _ => Json(json!({"id": id.parse::<i64>().unwrap_or_default(), "title": "Stub"}))
            .into_response(),
    }
}

async fn configuration(
    State(recorder): State<Recorder>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    recorder.record("configuration".to_string(), query, &headers);
    Json(json!({"images": {"secure_base_url": "https://image.tmdb.org/t/p/"}}))
}

async fn spawn_stub() -> (String, Recorder) {
    let recorder = Recorder::default();
    let app = Router::new()
        .route("/3/movie/{id}", get(movie))
        .route("/3/configuration", get(configuration))
        .with_state(recorder.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/3"), recorder)
}

fn provider_config(base_url: &str) -> ProviderConfig {
    ProviderConfig {
        base_url: base_url.to_string(),
        api_key: "stub-key".to_string(),
        min_request_interval_ms: 0,
        timeout_seconds: 5,
        ..ProviderConfig::default()
    }
}

fn client(config: &ProviderConfig) -> (TmdbClient, Arc<dyn CacheBackend>) {
    let cache: Arc<dyn CacheBackend> = Arc::new(MemoryCache::new());
    let client = TmdbClient::new(config, cache.clone(), RawTtls::default()).unwrap();
    (client, cache)
}

fn details(id: i32) -> ProviderRequest {
    ProviderRequest::movie_details(ProviderId::new(id))
}

#[tokio::test]
async fn test_cached_fetch_reuses_raw_response() {
    let (base, recorder) = spawn_stub().await;
    let (client, _) = client(&provider_config(&base));

    let first = client.fetch(&details(603), FetchMode::Cached).await.unwrap();
    let second = client.fetch(&details(603), FetchMode::Cached).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["id"], 603);
    assert_eq!(recorder.hits().len(), 1);

    client.fetch(&details(603), FetchMode::Fresh).await.unwrap();
    assert_eq!(recorder.hits().len(), 2);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let (base, recorder) = spawn_stub().await;
    let (client, _) = client(&provider_config(&base));

    for _ in 0..2 {
        let err = client
            .fetch(&details(503), FetchMode::Cached)
            .await
            .unwrap_err();
        assert_eq!(err, ProviderError::Server { status: 503 });
    }
    assert_eq!(recorder.hits().len(), 2);
}

#[tokio::test]
async fn test_api_key_sent_as_query_parameter() {
    let (base, recorder) = spawn_stub().await;
    let (client, _) = client(&provider_config(&base));

    client.fetch(&details(603), FetchMode::Fresh).await.unwrap();

    let hit = &recorder.hits()[0];
    assert_eq!(hit.path, "movie/603");
    assert!(hit.query.contains("api_key=stub-key"));
    assert!(hit.query.contains("language=en-US"));
    assert!(hit.query.contains("append_to_response="));
    assert!(hit.authorization.is_none());
}

#[tokio::test]
async fn test_read_access_token_sent_as_bearer() {
    let (base, recorder) = spawn_stub().await;
    let config = ProviderConfig {
        read_access_token: "stub-token".to_string(),
        ..provider_config(&base)
    };
    let (client, _) = client(&config);

    client.check_connection().await.unwrap();

    let hit = &recorder.hits()[0];
    assert_eq!(hit.path, "configuration");
    assert_eq!(hit.authorization.as_deref(), Some("Bearer stub-token"));
    assert!(!hit.query.contains("api_key"));
}

#[tokio::test]
async fn test_http_errors_are_classified() {
    let (base, _) = spawn_stub().await;
    let (client, _) = client(&provider_config(&base));

    let err = client.fetch(&details(401), FetchMode::Fresh).await.unwrap_err();
    assert!(matches!(err, ProviderError::Auth(_)));
    assert!(err.is_fatal());

    let err = client.fetch(&details(404), FetchMode::Fresh).await.unwrap_err();
    assert_eq!(err, ProviderError::NotFound("movie/404".to_string()));

    let err = client.fetch(&details(429), FetchMode::Fresh).await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::RateLimited {
            retry_after: Some(7)
        }
    );
    assert!(err.is_retryable());

    let err = client.fetch(&details(418), FetchMode::Fresh).await.unwrap_err();
    assert_eq!(err, ProviderError::UnexpectedStatus { status: 418 });
}

#[tokio::test]
async fn test_non_json_body_is_invalid_payload() {
    let (base, _) = spawn_stub().await;
    let (client, _) = client(&provider_config(&base));

    let err = client.fetch(&details(999), FetchMode::Fresh).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidPayload(_)));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_unreachable_provider_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, _) = client(&provider_config(&format!("http://{addr}/3")));
    let err = client.fetch(&details(603), FetchMode::Fresh).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transient(_)));
}

#[tokio::test]
async fn test_calls_are_spaced_by_min_interval() {
    let (base, recorder) = spawn_stub().await;
    let config = ProviderConfig {
        min_request_interval_ms: 60,
        ..provider_config(&base)
    };
    let (client, _) = client(&config);
    let client = Arc::new(client);

    let started = Instant::now();
    let calls = (0..3).map(|i| {
        let client = client.clone();
        tokio::spawn(async move { client.fetch(&details(600 + i), FetchMode::Fresh).await })
    });
    for call in futures::future::join_all(calls).await {
        call.unwrap().unwrap();
    }

    assert_eq!(recorder.hits().len(), 3);
    assert!(started.elapsed() >= Duration::from_millis(120));
}
