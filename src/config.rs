use crate::cache::ResponseTtls;
use crate::clients::tmdb::{RawTtls, TMDB_API, TMDB_IMAGE_BASE};
use crate::models::StalenessPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const ENV_API_KEY: &str = "TMDB_API_KEY";
pub const ENV_READ_ACCESS_TOKEN: &str = "TMDB_READ_ACCESS_TOKEN";
pub const ENV_DATABASE_PATH: &str = "MOVIE_NEXUS_DATABASE_PATH";

/// Upper bound for cache TTLs and cooldowns (one year).
pub const MAX_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;
/// Upper bound for staleness windows (ten years).
pub const MAX_WINDOW_HOURS: i64 = 10 * 365 * 24;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub provider: ProviderConfig,

    pub cache: CacheConfig,

    pub sync: SyncConfig,

    pub scheduler: SchedulerConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/movie-nexus.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,

    pub image_base_url: String,

    /// v3 API key, sent as a query parameter.
    pub api_key: String,

    /// v4 read access token, sent as a bearer token. Wins over `api_key`.
    pub read_access_token: String,

    pub language: String,

    /// Region applied to popular/top rated charts.
    pub region: String,

    pub timeout_seconds: u64,

    /// Minimum spacing between any two Provider calls, process-wide.
    pub min_request_interval_ms: u64,

    pub include_adult: bool,

    /// Maximum recommendation/similar ids kept per movie.
    pub related_limit: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: TMDB_API.to_string(),
            image_base_url: TMDB_IMAGE_BASE.to_string(),
            api_key: String::new(),
            read_access_token: String::new(),
            language: "en-US".to_string(),
            region: "US".to_string(),
            timeout_seconds: 10,
            min_request_interval_ms: 250,
            include_adult: false,
            related_limit: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,

    pub raw_static_ttl_seconds: u64,
    pub raw_details_ttl_seconds: u64,
    pub raw_listing_ttl_seconds: u64,
    pub raw_trending_ttl_seconds: u64,
    pub raw_search_ttl_seconds: u64,

    pub transformed_ttl_seconds: u64,

    pub response_detail_ttl_seconds: u64,
    pub response_list_ttl_seconds: u64,
    pub response_trending_ttl_seconds: u64,
    pub response_search_ttl_seconds: u64,
    pub response_related_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            raw_static_ttl_seconds: 7 * 24 * 60 * 60,
            raw_details_ttl_seconds: 24 * 60 * 60,
            raw_listing_ttl_seconds: 30 * 60,
            raw_trending_ttl_seconds: 5 * 60,
            raw_search_ttl_seconds: 30 * 60,
            transformed_ttl_seconds: 24 * 60 * 60,
            response_detail_ttl_seconds: 60 * 60,
            response_list_ttl_seconds: 30 * 60,
            response_trending_ttl_seconds: 5 * 60,
            response_search_ttl_seconds: 30 * 60,
            response_related_ttl_seconds: 60 * 60,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub const fn raw_ttls(&self) -> RawTtls {
        RawTtls {
            static_data: Duration::from_secs(self.raw_static_ttl_seconds),
            details: Duration::from_secs(self.raw_details_ttl_seconds),
            listing: Duration::from_secs(self.raw_listing_ttl_seconds),
            trending: Duration::from_secs(self.raw_trending_ttl_seconds),
            search: Duration::from_secs(self.raw_search_ttl_seconds),
        }
    }

    #[must_use]
    pub const fn response_ttls(&self) -> ResponseTtls {
        ResponseTtls {
            detail: Duration::from_secs(self.response_detail_ttl_seconds),
            list: Duration::from_secs(self.response_list_ttl_seconds),
            trending: Duration::from_secs(self.response_trending_ttl_seconds),
            search: Duration::from_secs(self.response_search_ttl_seconds),
            related: Duration::from_secs(self.response_related_ttl_seconds),
        }
    }

    #[must_use]
    pub const fn transformed_ttl(&self) -> Duration {
        Duration::from_secs(self.transformed_ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Refresh window for titles that are not yet released.
    pub unreleased_refresh_hours: i64,

    /// Refresh window for released titles with complete metadata.
    pub released_refresh_days: i64,

    /// Retry window for released titles missing runtime, overview or poster.
    pub incomplete_refresh_hours: i64,

    /// Parallel item syncs within one bulk sync.
    pub bulk_concurrency: usize,

    /// After a failed Provider call for a movie, further calls for it are
    /// skipped for this long.
    pub failure_cooldown_seconds: u64,

    /// Movies refreshed per scheduled run.
    pub refresh_batch_size: usize,

    /// Page size for local listings.
    pub page_size: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            unreleased_refresh_hours: 24,
            released_refresh_days: 7,
            incomplete_refresh_hours: 24,
            bulk_concurrency: 4,
            failure_cooldown_seconds: 300,
            refresh_batch_size: 50,
            page_size: 20,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn staleness_policy(&self) -> StalenessPolicy {
        StalenessPolicy {
            unreleased_window: chrono::Duration::hours(self.unreleased_refresh_hours),
            released_window: chrono::Duration::days(self.released_refresh_days),
            incomplete_window: chrono::Duration::hours(self.incomplete_refresh_hours),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub refresh_interval_minutes: u32,

    /// Overrides the interval when set, e.g. "0 0 */6 * * *".
    pub cron_expression: Option<String>,

    /// Daily genre taxonomy refresh.
    pub sync_genres: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_minutes: 60,
            cron_expression: None,
            sync_genres: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub json_logs: bool,

    pub metrics_enabled: bool,

    /// Port for the Prometheus scrape endpoint.
    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            metrics_enabled: false,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("movie-nexus").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".movie-nexus").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    /// Credentials are secrets and may come from the environment (or a
    /// `.env` file) instead of the config file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY) {
            self.provider.api_key = key;
        }
        if let Some(token) = lookup(ENV_READ_ACCESS_TOKEN) {
            self.provider.read_access_token = token;
        }
        if let Some(path) = lookup(ENV_DATABASE_PATH) {
            self.general.database_path = path;
        }
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.provider.api_key.trim().is_empty()
            || !self.provider.read_access_token.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.provider.timeout_seconds == 0 {
            anyhow::bail!("Provider timeout must be > 0 seconds");
        }

        url::Url::parse(&self.provider.base_url).context("Invalid provider base URL")?;

        if self.sync.bulk_concurrency == 0 {
            anyhow::bail!("Bulk sync concurrency must be > 0");
        }

        let windows = [
            self.sync.unreleased_refresh_hours,
            self.sync.released_refresh_days.saturating_mul(24),
            self.sync.incomplete_refresh_hours,
        ];
        if windows.iter().any(|&hours| hours <= 0 || hours > MAX_WINDOW_HOURS) {
            anyhow::bail!("Refresh windows must be between 1 hour and {MAX_WINDOW_HOURS} hours");
        }

        if self.sync.failure_cooldown_seconds > MAX_TTL_SECONDS {
            anyhow::bail!("Failure cooldown must be <= {MAX_TTL_SECONDS} seconds");
        }

        let cache = &self.cache;
        let ttls = [
            ("raw_static", cache.raw_static_ttl_seconds),
            ("raw_details", cache.raw_details_ttl_seconds),
            ("raw_listing", cache.raw_listing_ttl_seconds),
            ("raw_trending", cache.raw_trending_ttl_seconds),
            ("raw_search", cache.raw_search_ttl_seconds),
            ("transformed", cache.transformed_ttl_seconds),
            ("response_detail", cache.response_detail_ttl_seconds),
            ("response_list", cache.response_list_ttl_seconds),
            ("response_trending", cache.response_trending_ttl_seconds),
            ("response_search", cache.response_search_ttl_seconds),
            ("response_related", cache.response_related_ttl_seconds),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl > MAX_TTL_SECONDS) {
            anyhow::bail!("Cache TTL {name} must be <= {MAX_TTL_SECONDS} seconds");
        }

        if self.sync.page_size == 0 {
            anyhow::bail!("Page size must be > 0");
        }

        if self.scheduler.enabled
            && self.scheduler.refresh_interval_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.timeout_seconds, 10);
        assert_eq!(config.provider.min_request_interval_ms, 250);
        assert_eq!(config.sync.unreleased_refresh_hours, 24);
        assert_eq!(config.sync.released_refresh_days, 7);
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[provider]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[sync]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [cache]
            backend = "database"

            [sync]
            unreleased_refresh_hours = 6
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.cache.backend, CacheBackendKind::Database);
        assert_eq!(
            config.sync.staleness_policy().unreleased_window,
            chrono::Duration::hours(6)
        );

        assert_eq!(config.provider.language, "en-US");
        assert_eq!(config.sync.released_refresh_days, 7);
    }

    #[test]
    fn test_env_overrides_fill_credentials() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_READ_ACCESS_TOKEN, "token-from-env"),
            (ENV_API_KEY, "   "),
        ]);
        let mut config = Config::default();
        config.provider.api_key = "file-key".to_string();

        config.apply_overrides(|name| env.get(name).map(|v| (*v).to_string()));

        assert_eq!(config.provider.read_access_token, "token-from-env");
        assert_eq!(config.provider.api_key, "file-key");
        assert!(config.has_credentials());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.sync.bulk_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_windows_and_ttls() {
        let mut config = Config::default();
        config.sync.released_refresh_days = i64::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sync.incomplete_refresh_hours = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.response_detail_ttl_seconds = u64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("response_detail"));

        let mut config = Config::default();
        config.sync.failure_cooldown_seconds = MAX_TTL_SECONDS + 1;
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "movie-nexus-config-{}.toml",
            uuid::Uuid::new_v4()
        ));
        let mut config = Config::default();
        config.sync.bulk_concurrency = 9;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.sync.bulk_concurrency, 9);
        std::fs::remove_file(&path).ok();
    }
}
