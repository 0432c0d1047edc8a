//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// shortvault - operate a short-link entry store directly
#[derive(Parser)]
#[command(name = "shortvault")]
#[command(version)]
#[command(
    about = "Create, resolve and delete short links in a local or Redis store",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a short link
    Create {
        /// Target URL
        url: String,

        /// Use this id instead of a random one
        #[arg(long)]
        id: Option<String>,

        /// Password protection
        #[arg(long)]
        password: Option<String>,

        /// Expiration time (RFC3339 or relative like "1d", "2h30m")
        #[arg(long)]
        expire: Option<String>,

        /// Owner identity provider
        #[arg(long, default_value = "")]
        provider: String,

        /// Owner id within the provider
        #[arg(long, default_value = "")]
        owner: String,

        /// Address of the client that requested the link
        #[arg(long)]
        remote_addr: Option<String>,
    },

    /// Show an entry without counting a visit
    Get {
        id: String,
    },

    /// Resolve an entry the way a redirect does, recording the visit
    Visit {
        id: String,

        /// Client address to record
        #[arg(long, default_value = "127.0.0.1")]
        ip: String,

        #[arg(long, default_value = "")]
        referer: String,

        #[arg(long, default_value = "")]
        user_agent: String,

        /// Password for gated entries
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete an entry using its deletion token
    Delete {
        id: String,

        /// Token printed when the entry was created
        token: String,
    },

    /// Print the deletion token of an id
    Token {
        id: String,
    },

    /// List the visitor log of an entry
    Visitors {
        id: String,
    },

    /// List entries, optionally only those of one owner
    List {
        #[arg(long, requires = "owner")]
        provider: Option<String>,

        #[arg(long, requires = "provider")]
        owner: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
