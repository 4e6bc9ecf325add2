//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the torrent client
#[derive(Debug, Parser)]
#[command(name = "minitorrent")]
#[command(about = "A minimal BitTorrent downloader", long_about = None)]
pub struct CliArgs {
    /// Path to the .torrent file
    #[arg(value_name = "TORRENT_FILE")]
    pub torrent_file: PathBuf,

    /// Download directory
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Port reported to the tracker
    #[arg(short, long, default_value_t = 6881)]
    pub port: u16,

    /// Maximum number of peers downloaded from concurrently
    #[arg(short, long, default_value_t = 30)]
    pub max_peers: usize,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no output except errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let args = CliArgs::parse_from(["minitorrent", "test.torrent"]);

        assert_eq!(args.torrent_file, PathBuf::from("test.torrent"));
        assert!(args.output_dir.is_none());
        assert_eq!(args.port, 6881);
        assert_eq!(args.max_peers, 30);
        assert!(!args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn test_log_level() {
        let mut args = CliArgs::parse_from(["minitorrent", "test.torrent"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
