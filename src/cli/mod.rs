//! Command Line Interface module
//!
//! Implements the CLI commands and argument parsing for cryptopanel.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "cryptopanel")]
#[command(about = "Cryptocurrency market dashboard")]
#[command(
    long_about = "A terminal dashboard that refreshes crypto market data progressively, plus a CSV price tracker"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(long, default_value = "config.toml")]
    pub config_file: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Dry-run mode: show configuration without starting the dashboard
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the dashboard for the configured assets
    Dashboard {
        /// Use simple line output instead of the full TUI
        #[arg(long)]
        simple: bool,

        /// Use synthetic market data instead of the network
        #[arg(long)]
        demo: bool,
    },

    /// Pick assets from the most popular ones, then start the dashboard
    Select {
        /// Number of assets to pick (3 or 4)
        #[arg(long, default_value_t = 3)]
        count: usize,

        /// Comma separated asset ids, skipping the interactive picker
        #[arg(long)]
        assets: Option<String>,

        /// History period in days, skipping the period choice
        #[arg(long)]
        days: Option<u32>,
    },

    /// Record spot prices to the history CSV on a fixed interval
    Track {
        /// Record a single round and exit
        #[arg(long)]
        once: bool,
    },

    /// Summarize the recorded price history
    Chart,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Dashboard {
            simple: false,
            demo: false,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the actual command, using default if none provided
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or_default()
    }

    /// Whether the command takes over the terminal with the full-screen UI
    pub fn uses_tui(&self) -> bool {
        match self.command() {
            Commands::Dashboard { simple, .. } => !simple,
            Commands::Select { .. } => true,
            _ => false,
        }
    }

    /// Adjust log level based on verbose flag
    pub fn effective_log_level(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Check if we're running in dry-run mode
    pub fn is_dry_run_mode(&self) -> bool {
        self.dry_run
    }
}
