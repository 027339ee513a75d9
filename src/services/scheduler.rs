use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::services::CatalogService;

const GENRE_SYNC_CRON: &str = "0 30 3 * * *";
const GENRE_SYNC_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct Scheduler {
    catalog: Arc<dyn CatalogService>,
    config: SchedulerConfig,
    batch_size: usize,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(catalog: Arc<dyn CatalogService>, config: SchedulerConfig, batch_size: usize) -> Self {
        Self {
            catalog,
            config,
            batch_size: batch_size.max(1),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting background scheduler");

        if let Some(cron_expr) = &self.config.cron_expression {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let catalog = Arc::clone(&self.catalog);
        let running = Arc::clone(&self.running);
        let batch_size = self.batch_size;

        let refresh_job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let catalog = Arc::clone(&catalog);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                refresh_stale_job(catalog.as_ref(), batch_size).await;
            })
        })?;
        sched.add(refresh_job).await?;

        if self.config.sync_genres {
            let catalog = Arc::clone(&self.catalog);
            let running = Arc::clone(&self.running);
            let genre_job = Job::new_async(GENRE_SYNC_CRON, move |_uuid, _lock| {
                let catalog = Arc::clone(&catalog);
                let running = Arc::clone(&running);
                Box::pin(async move {
                    if !*running.read().await {
                        return;
                    }
                    sync_genres_job(catalog.as_ref()).await;
                })
            })?;
            sched.add(genre_job).await?;
            info!("Genre taxonomy sync scheduled: {}", GENRE_SYNC_CRON);
        }

        sched.start().await?;
        info!("Scheduler running with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.refresh_interval_minutes.max(1);

        info!(
            "Scheduler running: stale refresh every {}m (batch {})",
            interval_mins, self.batch_size
        );

        let mut refresh_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        let mut genre_interval = interval(GENRE_SYNC_INTERVAL);

        loop {
            tokio::select! {
                _ = refresh_interval.tick() => {
                    if !*self.running.read().await {
                        break;
                    }
                    refresh_stale_job(self.catalog.as_ref(), self.batch_size).await;
                }
                _ = genre_interval.tick(), if self.config.sync_genres => {
                    if !*self.running.read().await {
                        break;
                    }
                    sync_genres_job(self.catalog.as_ref()).await;
                }
            }
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

async fn refresh_stale_job(catalog: &dyn CatalogService, batch_size: usize) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "refresh_stale", "Starting scheduled stale refresh");

    match catalog.refresh_stale(batch_size).await {
        Ok(report) => info!(
            event = "job_finished",
            job_name = "refresh_stale",
            synced = report.synced.len(),
            failed = report.failed.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled stale refresh finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = "refresh_stale",
            error = %e,
            "Scheduled stale refresh failed"
        ),
    }
}

async fn sync_genres_job(catalog: &dyn CatalogService) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "sync_genres", "Starting scheduled genre sync");

    match catalog.sync_genre_taxonomy().await {
        Ok(genres) => info!(
            event = "job_finished",
            job_name = "sync_genres",
            count = genres.len(),
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Scheduled genre sync finished"
        ),
        Err(e) => error!(
            event = "job_failed",
            job_name = "sync_genres",
            error = %e,
            "Scheduled genre sync failed"
        ),
    }
}
