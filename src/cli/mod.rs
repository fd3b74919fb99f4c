//! CLI module - Command-line interface for pahe-relay
//!
//! Every command except `serve` and `init` prints pretty JSON to stdout.

mod commands;

use clap::{Parser, Subcommand};

/// pahe-relay - Anime streaming-site relay and link resolver
#[derive(Parser)]
#[command(name = "pahe-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Scrape one page of episode links for an anime session
    Links {
        /// Anime session on the scrape target
        session: String,
        /// Listing page
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Fetch, reconcile and store the catalog document for a provider id
    #[command(alias = "i")]
    Info {
        /// Metadata-provider id
        id: String,
    },

    /// Show one episode with direct links resolved
    Episode {
        /// Anime session on the scrape target
        session: String,
        /// Episode session on the scrape target
        episode_session: String,
        /// Episode number
        number: f64,
    },

    /// Resolve a single redirector or mirror link
    Resolve {
        /// Redirector (or mirror page) URL
        url: String,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
