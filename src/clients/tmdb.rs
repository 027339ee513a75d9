use super::{CacheClass, Endpoint, FetchMode, MovieProvider, ProviderError, ProviderRequest};
use crate::cache::{CacheBackend, cache_key};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

pub const TMDB_API: &str = "https://api.themoviedb.org/3";
pub const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/";
const USER_AGENT: &str = concat!("movie-nexus/", env!("CARGO_PKG_VERSION"));
const RAW_NAMESPACE: &str = "raw";

/// Process-wide spacing between Provider calls.
///
/// The lock is held across the sleep, so concurrent callers queue behind one
/// another instead of all waking on the same stale timestamp.
pub struct Throttle {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// Raw-response lifetimes per endpoint class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTtls {
    pub static_data: Duration,
    pub details: Duration,
    pub listing: Duration,
    pub trending: Duration,
    pub search: Duration,
}

impl Default for RawTtls {
    fn default() -> Self {
        Self {
            static_data: Duration::from_secs(7 * 24 * 60 * 60),
            details: Duration::from_secs(24 * 60 * 60),
            listing: Duration::from_secs(30 * 60),
            trending: Duration::from_secs(5 * 60),
            search: Duration::from_secs(30 * 60),
        }
    }
}

impl RawTtls {
    #[must_use]
    pub const fn for_class(&self, class: CacheClass) -> Duration {
        match class {
            CacheClass::Static => self.static_data,
            CacheClass::Details => self.details,
            CacheClass::Listing => self.listing,
            CacheClass::Trending => self.trending,
            CacheClass::Search => self.search,
        }
    }
}

#[derive(Clone)]
enum Credentials {
    Bearer(String),
    ApiKey(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

/// HTTP client for The Movie Database API.
///
/// Construct once per process and share it: the throttle cursor lives on
/// the instance.
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    language: String,
    region: Option<String>,
    throttle: Arc<Throttle>,
    raw_cache: Arc<dyn CacheBackend>,
    ttls: RawTtls,
}

impl TmdbClient {
    /// Builds a client from configuration. A read access token is preferred
    /// over an API key when both are present.
    pub fn new(
        config: &ProviderConfig,
        raw_cache: Arc<dyn CacheBackend>,
        ttls: RawTtls,
    ) -> Result<Self, ProviderError> {
        let credentials = if !config.read_access_token.trim().is_empty() {
            Credentials::Bearer(config.read_access_token.trim().to_string())
        } else if !config.api_key.trim().is_empty() {
            Credentials::ApiKey(config.api_key.trim().to_string())
        } else {
            return Err(ProviderError::Auth(
                "no API key or read access token configured".to_string(),
            ));
        };

        Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Configuration(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            language: config.language.clone(),
            region: Some(config.region.clone()).filter(|r| !r.trim().is_empty()),
            throttle: Arc::new(Throttle::new(Duration::from_millis(
                config.min_request_interval_ms,
            ))),
            raw_cache,
            ttls,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Parameters actually sent, minus credentials.
    fn effective_params(&self, request: &ProviderRequest) -> BTreeMap<String, String> {
        let mut params = request.params.clone();
        if !self.language.is_empty() {
            params
                .entry("language".to_string())
                .or_insert_with(|| self.language.clone());
        }
        if let Some(region) = &self.region
            && matches!(request.endpoint, Endpoint::Popular | Endpoint::TopRated)
        {
            params
                .entry("region".to_string())
                .or_insert_with(|| region.clone());
        }
        params
    }

    fn build_url(
        &self,
        request: &ProviderRequest,
        params: &BTreeMap<String, String>,
    ) -> Result<Url, ProviderError> {
        let raw = format!("{}/{}", self.base_url, request.endpoint.path());
        let mut url =
            Url::parse(&raw).map_err(|e| ProviderError::Configuration(format!("{raw}: {e}")))?;

        {
            let mut query = url.query_pairs_mut();
            for (name, value) in params {
                query.append_pair(name, value);
            }
            if let Credentials::ApiKey(key) = &self.credentials {
                query.append_pair("api_key", key);
            }
        }

        Ok(url)
    }

    async fn send(
        &self,
        request: &ProviderRequest,
        params: &BTreeMap<String, String>,
    ) -> Result<Value, ProviderError> {
        let url = self.build_url(request, params)?;
        let label = request.endpoint.label();

        self.throttle.acquire().await;

        let mut builder = self.client.get(url).header(ACCEPT, "application/json");
        if let Credentials::Bearer(token) = &self.credentials {
            builder = builder.bearer_auth(token);
        }

        debug!(endpoint = label, path = %request.endpoint.path(), "Calling provider");
        let started = Instant::now();
        let result = builder.send().await;
        metrics::histogram!("provider_request_duration_seconds", "endpoint" => label)
            .record(started.elapsed().as_secs_f64());

        let response = result.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Transient(format!("request timed out: {e}"))
            } else {
                ProviderError::Transient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(map_status(status, &request.endpoint.path(), retry_after));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        serde_json::from_str(&body).map_err(|e| ProviderError::InvalidPayload(e.to_string()))
    }

    /// Probes the configuration endpoint, bypassing the cache.
    pub async fn check_connection(&self) -> Result<(), ProviderError> {
        self.fetch(&ProviderRequest::new(Endpoint::Configuration), FetchMode::Fresh)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl MovieProvider for TmdbClient {
    async fn fetch(
        &self,
        request: &ProviderRequest,
        mode: FetchMode,
    ) -> Result<Value, ProviderError> {
        let label = request.endpoint.label();
        let params = self.effective_params(request);
        let key = cache_key(RAW_NAMESPACE, &request.endpoint.path(), &params);

        if mode == FetchMode::Cached {
            match self.raw_cache.get(&key).await {
                Ok(Some(body)) => match serde_json::from_str(&body) {
                    Ok(value) => {
                        metrics::counter!("provider_raw_cache_hits_total", "endpoint" => label)
                            .increment(1);
                        return Ok(value);
                    }
                    Err(e) => debug!(error = %e, "Ignoring undecodable raw cache entry"),
                },
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Raw cache read failed"),
            }
            metrics::counter!("provider_raw_cache_misses_total", "endpoint" => label)
                .increment(1);
        }

        let outcome = self.send(request, &params).await;
        let outcome_label = outcome.as_ref().map_or_else(ProviderError::label, |_| "ok");
        metrics::counter!(
            "provider_requests_total",
            "endpoint" => label,
            "outcome" => outcome_label
        )
        .increment(1);

        let value = outcome?;
        let ttl = self.ttls.for_class(request.endpoint.cache_class());
        if let Err(e) = self.raw_cache.set(&key, &value.to_string(), ttl).await {
            warn!(error = %e, "Raw cache write failed");
        }

        Ok(value)
    }
}

fn map_status(status: StatusCode, path: &str, retry_after: Option<u64>) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::Auth(format!("HTTP {} for {path}", status.as_u16()))
        }
        StatusCode::NOT_FOUND => ProviderError::NotFound(path.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        s if s.is_server_error() => ProviderError::Server { status: s.as_u16() },
        s => ProviderError::UnexpectedStatus { status: s.as_u16() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::domain::ProviderId;

    fn config() -> ProviderConfig {
        ProviderConfig {
            api_key: "secret-key".to_string(),
            ..ProviderConfig::default()
        }
    }

    fn client(config: &ProviderConfig) -> TmdbClient {
        TmdbClient::new(config, Arc::new(MemoryCache::new()), RawTtls::default()).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, "movie/1", None),
            ProviderError::Auth(_)
        ));
        assert_eq!(
            map_status(StatusCode::NOT_FOUND, "movie/1", None),
            ProviderError::NotFound("movie/1".to_string())
        );
        assert_eq!(
            map_status(StatusCode::TOO_MANY_REQUESTS, "movie/1", Some(3)),
            ProviderError::RateLimited {
                retry_after: Some(3)
            }
        );
        assert_eq!(
            map_status(StatusCode::BAD_GATEWAY, "movie/1", None),
            ProviderError::Server { status: 502 }
        );
        assert_eq!(
            map_status(StatusCode::BAD_REQUEST, "movie/1", None),
            ProviderError::UnexpectedStatus { status: 400 }
        );
    }

    #[test]
    fn test_missing_credentials_is_auth_error() {
        let result = TmdbClient::new(
            &ProviderConfig::default(),
            Arc::new(MemoryCache::new()),
            RawTtls::default(),
        );
        assert!(matches!(result, Err(ProviderError::Auth(_))));
    }

    #[test]
    fn test_api_key_goes_in_query_but_not_in_params() {
        let client = client(&config());
        let request = ProviderRequest::movie_details(ProviderId::new(603));
        let params = client.effective_params(&request);

        assert!(!params.contains_key("api_key"));
        assert_eq!(params.get("language").map(String::as_str), Some("en-US"));

        let url = client.build_url(&request, &params).unwrap();
        assert_eq!(url.path(), "/3/movie/603");
        assert!(url.query_pairs().any(|(k, v)| k == "api_key" && v == "secret-key"));
    }

    #[test]
    fn test_region_only_added_to_chart_endpoints() {
        let client = client(&config());
        let popular = client.effective_params(&ProviderRequest::popular(1));
        assert_eq!(popular.get("region").map(String::as_str), Some("US"));

        let search = client.effective_params(&ProviderRequest::search("alien", 1, false));
        assert!(!search.contains_key("region"));
    }

    #[test]
    fn test_bearer_token_preferred() {
        let config = ProviderConfig {
            read_access_token: "token".to_string(),
            ..config()
        };
        let client = client(&config);
        let request = ProviderRequest::genre_list();
        let url = client
            .build_url(&request, &client.effective_params(&request))
            .unwrap();
        assert!(!url.query_pairs().any(|(k, _)| k == "api_key"));
    }

    #[tokio::test]
    async fn test_throttle_spaces_calls() {
        let throttle = Throttle::new(Duration::from_millis(50));
        let started = Instant::now();
        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
