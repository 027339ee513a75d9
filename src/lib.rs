pub mod cache;
pub mod cli;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;
pub mod transform;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
pub use config::Config;
use services::Scheduler;
use state::SharedState;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Layer};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = Config::load()?;
    config.apply_env_overrides();
    config.validate()?;

    init_metrics(&config)?;
    init_tracing(&config)?;

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        print_help();
        return Ok(());
    };

    if matches!(command, Commands::Init) {
        if Config::create_default_if_missing()? {
            println!("✓ Config file created. Set TMDB_API_KEY or edit config.toml and run again.");
        } else {
            println!("config.toml already exists.");
        }
        return Ok(());
    }

    if !config.has_credentials() {
        println!("No TMDb credentials configured.");
        println!("Set TMDB_API_KEY or TMDB_READ_ACCESS_TOKEN (a .env file works too),");
        println!("or fill in [provider] in config.toml.");
        return Ok(());
    }

    let state = SharedState::new(config).await?;

    match command {
        Commands::Init => Ok(()),
        Commands::Daemon => run_daemon(state).await,
        Commands::Show { id, force } => cli::cmd_show(&state, id, force).await,
        Commands::Sync { ids } => cli::cmd_sync(&state, &ids).await,
        Commands::Search {
            query,
            page,
            no_store,
        } => cli::cmd_search(&state, &query.join(" "), page, !no_store).await,
        Commands::Discover {
            list,
            page,
            no_store,
        } => cli::cmd_discover(&state, list, page, !no_store).await,
        Commands::Genres {
            slug,
            page,
            popular,
        } => match popular {
            Some(limit) => cli::cmd_popular_genres(&state, limit).await,
            None => cli::cmd_genres(&state, slug.as_deref(), page).await,
        },
        Commands::Related { id, similar, limit } => {
            cli::cmd_related(&state, id, similar, limit).await
        }
        Commands::Refresh { limit } => cli::cmd_refresh(&state, limit).await,
        Commands::Deactivate { id } => cli::cmd_deactivate(&state, id).await,
        Commands::Reactivate { id } => cli::cmd_reactivate(&state, id).await,
        Commands::Delete { id } => cli::cmd_delete(&state, id).await,
        Commands::Check => cli::cmd_check(&state).await,
    }
}

fn init_metrics(config: &Config) -> anyhow::Result<()> {
    if !config.observability.metrics_enabled {
        return Ok(());
    }

    use metrics_exporter_prometheus::PrometheusBuilder;
    let builder = PrometheusBuilder::new();

    if let Some(port) = config.observability.metrics_port {
        builder
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics exporter listening on port {}", port);
    } else {
        builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
    }

    Ok(())
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = if config.observability.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "movie-nexus")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    Ok(())
}

fn print_help() {
    println!("movie-nexus - local movie catalog synced from TMDb");
    println!();
    println!("USAGE:");
    println!("  movie-nexus <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  show <id> [--force]        Show a movie, syncing it when stale");
    println!("  sync <ids...>              Sync movies by TMDb ID");
    println!("  search <query> [--page N]  Search TMDb (--no-store to skip storing)");
    println!("  discover <list> [--page N] popular, top-rated, trending-day, trending-week");
    println!("  genres [slug]              Sync and list genres, or list a genre's movies");
    println!("  genres --popular 5         Genres with the most catalog movies");
    println!("  related <id> [--similar]   Show recommended or similar movies");
    println!("  refresh [--limit N]        Refresh stale movies");
    println!("  deactivate <id>            Hide a movie from syncs and reads");
    println!("  reactivate <id>            Undo a deactivation");
    println!("  delete <id>                Delete a movie and its links");
    println!("  check                      Check database and provider connectivity");
    println!("  daemon                     Run the refresh scheduler in the background");
    println!("  init                       Create default config file");
    println!();
    println!("EXAMPLES:");
    println!("  movie-nexus show 603                # The Matrix");
    println!("  movie-nexus search \"blade runner\"   # Search and store results");
    println!("  movie-nexus related 603 --similar   # Similar titles already in the catalog");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml; TMDB_API_KEY / TMDB_READ_ACCESS_TOKEN override credentials.");
}

async fn run_daemon(state: SharedState) -> anyhow::Result<()> {
    info!(
        "movie-nexus v{} starting in daemon mode...",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = state.provider.check_connection().await {
        if e.is_fatal() {
            return Err(e).context("Provider rejected the configured credentials");
        }
        warn!("Provider not reachable at startup: {}", e);
    }

    let scheduler = Arc::new(Scheduler::new(
        state.catalog(),
        state.config.scheduler.clone(),
        state.config.sync.refresh_batch_size,
    ));

    let scheduler_handle = {
        let sched = Arc::clone(&scheduler);
        tokio::spawn(async move {
            if let Err(e) = sched.start().await {
                error!("Scheduler error: {}", e);
            }
        })
    };

    info!("Daemon running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    scheduler.stop().await;
    scheduler_handle.abort();
    info!("Daemon stopped");

    Ok(())
}
