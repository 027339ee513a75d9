use crate::domain::{MovieId, ProviderId};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Completeness of a locally cached movie record.
///
/// `Partial` records come from listing or search contexts and only carry the
/// basic fields. `Complete` records come from a detail fetch; only then are
/// `tagline`, `release_status`, `runtime`, `budget`, `revenue`, `homepage`,
/// `imdb_id`, credits and videos populated from the Provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Never,
    Partial,
    Complete,
    Failed,
}

impl SyncStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Partial => "partial",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "never" => Ok(Self::Never),
            "partial" => Ok(Self::Partial),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown sync status: {other}")),
        }
    }
}

/// Production stage reported by the Provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Rumored,
    Planned,
    InProduction,
    PostProduction,
    Released,
    Canceled,
}

impl ReleaseStatus {
    /// Maps the Provider's human readable status ("Post Production").
    #[must_use]
    pub fn from_provider(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::from_str(&normalized).ok()
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rumored => "rumored",
            Self::Planned => "planned",
            Self::InProduction => "in_production",
            Self::PostProduction => "post_production",
            Self::Released => "released",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rumored" => Ok(Self::Rumored),
            "planned" => Ok(Self::Planned),
            "in_production" => Ok(Self::InProduction),
            "post_production" => Ok(Self::PostProduction),
            "released" => Ok(Self::Released),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            other => Err(format!("unknown release status: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub provider_id: i32,
    pub name: String,
    pub character: String,
    pub order: i32,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub provider_id: i32,
    pub name: String,
    pub job: String,
    pub department: String,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
    pub director: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub key: String,
    pub name: String,
    pub site: String,
    pub kind: String,
    pub official: bool,
}

impl VideoRef {
    #[must_use]
    pub fn url(&self) -> Option<String> {
        match self.site.as_str() {
            "YouTube" => Some(format!("https://www.youtube.com/watch?v={}", self.key)),
            "Vimeo" => Some(format!("https://vimeo.com/{}", self.key)),
            _ => None,
        }
    }

    #[must_use]
    pub fn embed_url(&self) -> Option<String> {
        match self.site.as_str() {
            "YouTube" => Some(format!("https://www.youtube.com/embed/{}", self.key)),
            "Vimeo" => Some(format!("https://player.vimeo.com/video/{}", self.key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Videos {
    pub trailers: Vec<VideoRef>,
    pub teasers: Vec<VideoRef>,
    pub main_trailer: Option<VideoRef>,
}

/// A locally cached catalog record.
///
/// `is_active` and `created_at` are owned by the local store and are never
/// overwritten by a Provider sync. Every other descriptive field is owned by
/// the Provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub provider_id: ProviderId,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub tagline: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_status: Option<ReleaseStatus>,
    pub runtime: Option<i32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub original_language: String,
    pub adult: bool,
    pub popularity: f64,
    pub vote_average: f64,
    pub vote_count: i32,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub credits: Credits,
    pub videos: Videos,
    pub sync_status: SyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    /// Released titles are assumed largely immutable upstream.
    ///
    /// Without an explicit status the release date decides.
    #[must_use]
    pub fn is_released(&self, today: NaiveDate) -> bool {
        match self.release_status {
            Some(status) => status == ReleaseStatus::Released,
            None => self.release_date.is_some_and(|d| d <= today),
        }
    }

    /// Fields a complete record is expected to carry for a released title.
    #[must_use]
    pub fn missing_critical_fields(&self) -> bool {
        self.runtime.is_none()
            || self.overview.trim().is_empty()
            || self.poster_path.as_deref().is_none_or(str::is_empty)
    }

    #[must_use]
    pub fn needs_sync(&self, policy: &StalenessPolicy, now: DateTime<Utc>) -> bool {
        match self.sync_status {
            SyncStatus::Never | SyncStatus::Partial | SyncStatus::Failed => return true,
            SyncStatus::Complete => {}
        }

        let Some(last_synced) = self.last_synced_at else {
            return true;
        };

        if self.is_released(now.date_naive()) {
            last_synced < now - policy.released_window
                || (self.missing_critical_fields() && last_synced < now - policy.incomplete_window)
        } else {
            last_synced < now - policy.unreleased_window
        }
    }
}

/// Refresh windows for complete records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub unreleased_window: Duration,
    pub released_window: Duration,
    /// Retry window for released titles the Provider left incomplete.
    pub incomplete_window: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            unreleased_window: Duration::hours(24),
            released_window: Duration::days(7),
            incomplete_window: Duration::hours(24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_links_per_site() {
        let video = |site: &str| VideoRef {
            key: "abc".to_string(),
            name: "Trailer".to_string(),
            site: site.to_string(),
            kind: "Trailer".to_string(),
            official: true,
        };

        let youtube = video("YouTube");
        assert_eq!(youtube.url().as_deref(), Some("https://www.youtube.com/watch?v=abc"));
        assert_eq!(youtube.embed_url().as_deref(), Some("https://www.youtube.com/embed/abc"));
        assert_eq!(
            video("Vimeo").embed_url().as_deref(),
            Some("https://player.vimeo.com/video/abc")
        );
        assert!(video("Dailymotion").embed_url().is_none());
    }

    fn complete_movie(now: DateTime<Utc>) -> Movie {
        Movie {
            id: MovieId::new(1),
            provider_id: ProviderId::new(603),
            title: "The Matrix".to_string(),
            original_title: "The Matrix".to_string(),
            overview: "A hacker learns the truth.".to_string(),
            tagline: Some("Welcome to the Real World.".to_string()),
            release_date: NaiveDate::from_ymd_opt(1999, 3, 30),
            release_status: Some(ReleaseStatus::Released),
            runtime: Some(136),
            budget: Some(63_000_000),
            revenue: Some(463_517_383),
            homepage: None,
            imdb_id: Some("tt0133093".to_string()),
            original_language: "en".to_string(),
            adult: false,
            popularity: 80.5,
            vote_average: 8.2,
            vote_count: 24000,
            poster_path: Some("/matrix.jpg".to_string()),
            backdrop_path: None,
            credits: Credits::default(),
            videos: Videos::default(),
            sync_status: SyncStatus::Complete,
            last_synced_at: Some(now),
            last_sync_error: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_never_partial_failed_always_need_sync() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        for status in [SyncStatus::Never, SyncStatus::Partial, SyncStatus::Failed] {
            let mut movie = complete_movie(now);
            movie.sync_status = status;
            assert!(movie.needs_sync(&policy, now), "{status} should need sync");
        }
    }

    #[test]
    fn test_fresh_released_movie_does_not_need_sync() {
        let now = Utc::now();
        let movie = complete_movie(now - Duration::days(3));
        assert!(!movie.needs_sync(&StalenessPolicy::default(), now));
    }

    #[test]
    fn test_released_movie_refreshes_after_long_window() {
        let now = Utc::now();
        let mut movie = complete_movie(now);
        movie.last_synced_at = Some(now - Duration::days(8));
        assert!(movie.needs_sync(&StalenessPolicy::default(), now));
    }

    #[test]
    fn test_released_movie_missing_fields_retries_after_incomplete_window() {
        let now = Utc::now();
        let policy = StalenessPolicy::default();
        let synced = now - Duration::hours(25);

        let mut movie = complete_movie(synced);
        movie.runtime = None;
        assert!(movie.needs_sync(&policy, now));

        let mut movie = complete_movie(synced);
        movie.poster_path = None;
        assert!(movie.needs_sync(&policy, now));

        let mut movie = complete_movie(synced);
        movie.overview = "   ".to_string();
        assert!(movie.needs_sync(&policy, now));
    }

    #[test]
    fn test_recently_synced_incomplete_movie_is_fresh() {
        let now = Utc::now();
        let mut movie = complete_movie(now - Duration::hours(1));
        movie.poster_path = None;
        assert!(!movie.needs_sync(&StalenessPolicy::default(), now));
    }

    #[test]
    fn test_unreleased_movie_uses_short_window() {
        let now = Utc::now();
        let mut movie = complete_movie(now);
        movie.release_status = Some(ReleaseStatus::PostProduction);
        movie.runtime = None;

        movie.last_synced_at = Some(now - Duration::hours(2));
        assert!(!movie.needs_sync(&StalenessPolicy::default(), now));

        movie.last_synced_at = Some(now - Duration::hours(25));
        assert!(movie.needs_sync(&StalenessPolicy::default(), now));
    }

    #[test]
    fn test_release_date_decides_without_status() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let mut movie = complete_movie(Utc::now());
        movie.release_status = None;

        movie.release_date = NaiveDate::from_ymd_opt(2026, 1, 9);
        assert!(movie.is_released(today));

        movie.release_date = NaiveDate::from_ymd_opt(2026, 2, 1);
        assert!(!movie.is_released(today));

        movie.release_date = None;
        assert!(!movie.is_released(today));
    }

    #[test]
    fn test_release_status_from_provider_labels() {
        assert_eq!(
            ReleaseStatus::from_provider("Post Production"),
            Some(ReleaseStatus::PostProduction)
        );
        assert_eq!(
            ReleaseStatus::from_provider("Released"),
            Some(ReleaseStatus::Released)
        );
        assert_eq!(ReleaseStatus::from_provider("Unknown"), None);
    }
}
