//! Command-line argument parsing for query-batch.

use crate::batch::BatchOptions;
use crate::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Executes batches of analytics queries with as few round trips as possible.
#[derive(Parser, Debug)]
#[command(name = "query-batch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use the in-memory mock store instead of the configured backend
    #[arg(long, global = true)]
    pub mock: bool,

    /// Enable debug logging for query-batch
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Execute a JSON array of requests and print the results
    Run {
        /// Request file, or `-` for stdin
        #[arg(value_name = "FILE")]
        input: String,

        /// Timezone for requests that do not set one
        #[arg(long, value_name = "TZ")]
        timezone: Option<String>,

        /// Website domain passed to post-processing plugins
        #[arg(long, value_name = "DOMAIN")]
        website_domain: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print every schema signature with the types that share it
    Groups,

    /// Print the types compatible with TYPE, or whether TYPE and OTHER are compatible
    Compatible {
        #[arg(value_name = "TYPE")]
        query_type: String,

        #[arg(value_name = "OTHER")]
        other: Option<String>,
    },

    /// Validate the registry and ping the store
    Check,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path, using the default if not specified.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Batch options for `run`: command-line flags over config defaults.
    pub fn batch_options(&self, config: &Config) -> BatchOptions {
        let mut options = config.batch_options();
        if let Command::Run {
            timezone,
            website_domain,
            ..
        } = &self.command
        {
            if timezone.is_some() {
                options.timezone = timezone.clone();
            }
            if website_domain.is_some() {
                options.website_domain = website_domain.clone();
            }
        }
        options
    }
}
