//! CLI module - Command-line interface for movie-nexus
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::domain::ProviderId;
use crate::services::DiscoverList;

/// movie-nexus - local movie catalog synced from TMDb
#[derive(Parser)]
#[command(name = "movie-nexus")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Run as background daemon with the refresh scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Show a movie, syncing it first when stale
    #[command(alias = "info", alias = "i")]
    Show {
        /// Provider movie ID
        id: ProviderId,
        /// Bypass caches and refresh from the provider
        #[arg(long)]
        force: bool,
    },

    /// Sync one or more movies by provider ID
    Sync {
        /// Provider movie IDs
        #[arg(required = true)]
        ids: Vec<ProviderId>,
    },

    /// Search the provider for movies
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
        /// Result page
        #[arg(long, default_value = "1")]
        page: u32,
        /// Do not store unknown results as partial records
        #[arg(long)]
        no_store: bool,
    },

    /// Browse a provider chart (popular, top-rated, trending-day, trending-week)
    Discover {
        list: DiscoverList,
        /// Result page
        #[arg(long, default_value = "1")]
        page: u32,
        /// Do not store unknown results as partial records
        #[arg(long)]
        no_store: bool,
    },

    /// Sync the genre taxonomy and list genres, or list one genre's movies
    Genres {
        /// Genre slug to list movies for
        slug: Option<String>,
        /// Result page
        #[arg(long, default_value = "1")]
        page: u32,
        /// Rank the N genres with the most catalog movies instead
        #[arg(long, value_name = "N", conflicts_with = "slug")]
        popular: Option<usize>,
    },

    /// Show movies related to a movie
    Related {
        /// Provider movie ID
        id: ProviderId,
        /// Use similar titles instead of recommendations
        #[arg(long)]
        similar: bool,
        /// Maximum number of movies to show
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Refresh movies whose local data is stale
    Refresh {
        /// Maximum number of movies to refresh
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Exclude a movie from syncs and reads
    Deactivate {
        /// Provider movie ID
        id: ProviderId,
    },

    /// Undo a deactivation
    Reactivate {
        /// Provider movie ID
        id: ProviderId,
    },

    /// Delete a movie with its genre assignments and relationships
    #[command(alias = "rm")]
    Delete {
        /// Provider movie ID
        id: ProviderId,
    },

    /// Check provider connectivity and report catalog state
    #[command(alias = "-c", alias = "--check")]
    Check,
}

pub use commands::*;
