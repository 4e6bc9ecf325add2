//! CLI configuration module
//!
//! Validated runtime configuration derived from the parsed arguments.

use crate::cli::args::CliArgs;
use std::path::PathBuf;
use anyhow::Result;

use crate::error::TorrentError;

/// Configuration for the torrent client
#[derive(Debug, Clone)]
pub struct Config {
    /// Download directory
    pub output_dir: PathBuf,
    /// Port reported to the tracker
    pub port: u16,
    /// Maximum number of concurrent peer connections
    pub max_peers: usize,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Config {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Self {
        let output_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./downloads"));

        Self {
            output_dir,
            port: args.port,
            max_peers: args.max_peers,
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(TorrentError::config_error_with_field("port cannot be 0", "port").into());
        }

        if self.max_peers == 0 {
            return Err(TorrentError::config_error_with_field(
                "max_peers must be at least 1",
                "max_peers",
            )
            .into());
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(TorrentError::config_error_with_field(
                "output_dir cannot be empty",
                "output_dir",
            )
            .into());
        }

        Ok(())
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
