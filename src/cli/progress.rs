//! Progress display module
//!
//! Handles displaying download progress in the CLI.

use std::io::{self, Write};

/// Download statistics for progress display
#[derive(Debug, Clone, Default)]
pub struct DownloadStats {
    /// Total bytes downloaded
    pub downloaded: u64,
    /// Pieces completed
    pub pieces_completed: usize,
    /// Pieces failed so far
    pub pieces_failed: usize,
    /// Number of peers used
    pub peers: usize,
    /// Download progress (0.0 to 1.0)
    pub progress: f64,
}

impl DownloadStats {
    /// Format bytes to human readable string
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Progress display for CLI
pub struct ProgressDisplay {
    /// Suppress all non-error output
    quiet: bool,
}

impl ProgressDisplay {
    /// Create a new progress display
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Print a status line
    pub fn print_status(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        println!("{}", message);
        io::stdout().flush()
    }

    /// Print the current download statistics
    pub fn update(&self, stats: &DownloadStats, total: u64) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        println!(
            "  {:.1}% ({} / {}) - {} pieces done, {} failed, {} peers",
            stats.progress * 100.0,
            DownloadStats::format_bytes(stats.downloaded),
            DownloadStats::format_bytes(total),
            stats.pieces_completed,
            stats.pieces_failed,
            stats.peers
        );
        io::stdout().flush()
    }

    /// Print the completion summary
    pub fn print_complete(&self, stats: &DownloadStats, total: u64) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        println!(
            "Download complete: {} in {} pieces",
            DownloadStats::format_bytes(total),
            stats.pieces_completed
        );
        io::stdout().flush()
    }

    /// Print an error message
    pub fn print_error(&self, message: &str) -> io::Result<()> {
        eprintln!("Error: {}", message);
        io::stderr().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(DownloadStats::format_bytes(0), "0.00 B");
        assert_eq!(DownloadStats::format_bytes(512), "512.00 B");
        assert_eq!(DownloadStats::format_bytes(1024), "1.00 KB");
        assert_eq!(DownloadStats::format_bytes(16 * 1024), "16.00 KB");
        assert_eq!(DownloadStats::format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(DownloadStats::format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_quiet_display_prints_nothing() {
        let display = ProgressDisplay::new(true);
        assert!(display.print_status("hidden").is_ok());
        assert!(display.update(&DownloadStats::default(), 0).is_ok());
        assert!(display.print_complete(&DownloadStats::default(), 0).is_ok());
    }
}
