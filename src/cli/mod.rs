//! CLI module - Command-line interface for animenya
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// animenya - cached anime catalog over a scraped upstream site
#[derive(Parser)]
#[command(name = "animenya")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve {
        /// Keep the cache in memory only
        #[arg(long)]
        ephemeral: bool,
    },

    /// Show the newest episodes across all anime
    #[command(alias = "l")]
    Latest {
        /// Feed page, starting at 1
        #[arg(long)]
        page: Option<u32>,
    },

    /// Show (and refresh when stale) one anime
    #[command(alias = "i", alias = "info")]
    Anime {
        /// Anime ID
        id: i64,
        /// Also resolve the streaming mirrors of every episode
        #[arg(long)]
        resolve_watches: bool,
    },

    /// Show the streaming mirrors of one episode
    #[command(alias = "e")]
    Episode {
        /// Anime ID
        anime_id: i64,
        /// Episode ID
        episode_id: i64,
    },

    /// Search upstream for anime
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },

    /// Create default config file
    Init,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from(["animenya", "anime", "42", "--resolve-watches"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Anime {
                id: 42,
                resolve_watches: true
            })
        ));

        let cli = Cli::parse_from(["animenya", "s", "sousou", "no", "frieren"]);
        let Some(Commands::Search { query }) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(query.join(" "), "sousou no frieren");

        let cli = Cli::parse_from(["animenya", "serve", "--ephemeral"]);
        assert!(matches!(cli.command, Some(Commands::Serve { ephemeral: true })));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
