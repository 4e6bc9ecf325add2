//! minitorrent - Main entry point
//!
//! Loads a torrent, announces to its tracker, downloads every piece from
//! the offered peers, and writes the assembled file.

use anyhow::{Context, Result};
use minitorrent::{
    assemble_file, CliArgs, CompletedPiece, Config, DownloadStats, Downloader, Handshake,
    MetaInfo, ProgressDisplay, TorrentError, TorrentParser, TrackerClient,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse_args();
    init_logging(&args);
    info!("minitorrent starting");

    let config = Config::from_args(&args);
    config.validate().context("Invalid configuration")?;

    let meta = load_torrent_file(&args.torrent_file).context("Failed to load torrent file")?;
    display_torrent_info(&meta, &config);

    let progress = ProgressDisplay::new(config.is_quiet());
    let our_peer_id = Handshake::generate_peer_id();

    // Tracker failure and an empty peer list are both fatal: without peers
    // there is nothing to download from
    let tracker = TrackerClient::new(our_peer_id, config.port)?;
    let announce = tracker
        .announce(&meta)
        .await
        .context("Tracker announce failed")?;
    if announce.peers.is_empty() {
        anyhow::bail!(
            "tracker {} returned zero peers; nothing to download from",
            meta.announce
        );
    }

    let peers: Vec<SocketAddr> = announce.peers.into_iter().take(config.max_peers).collect();
    progress.print_status(&format!("Downloading from up to {} peers...", peers.len()))?;

    let completed = run_download(&meta, our_peer_id, &peers, &progress).await?;

    let file = assemble_file(&completed, &meta.info)?;
    let output_path = write_output(&config, &meta, &file).await?;
    progress.print_complete(
        &DownloadStats {
            downloaded: meta.info.length,
            pieces_completed: completed.len(),
            pieces_failed: 0,
            peers: peers.len(),
            progress: 1.0,
        },
        meta.info.length,
    )?;
    progress.print_status(&format!("Saved to {}", output_path.display()))?;

    info!("minitorrent finished");
    Ok(())
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

/// Load and parse the torrent file
fn load_torrent_file(path: &Path) -> Result<MetaInfo> {
    let meta = TorrentParser::parse_file(path)?;
    info!("Loaded torrent: {}", meta.info.name);
    Ok(meta)
}

/// Display torrent information
fn display_torrent_info(meta: &MetaInfo, config: &Config) {
    if config.is_quiet() {
        return;
    }
    println!("Torrent Information:");
    println!("  Name: {}", meta.info.name);
    println!(
        "  Size: {} ({} bytes)",
        DownloadStats::format_bytes(meta.info.length),
        meta.info.length
    );
    println!(
        "  Pieces: {} x {}",
        meta.info.piece_count(),
        DownloadStats::format_bytes(meta.info.piece_length)
    );
    println!("  Info hash: {}", meta.info.info_hash_hex());
    println!("  Tracker: {}", meta.announce);
    if let Some(created_by) = &meta.created_by {
        println!("  Created by: {}", created_by);
    }
    println!();
}

/// Download every piece, batching assignments over the peer list.
///
/// Each batch pairs one pending piece with one peer; pieces that fail are
/// reported at the end rather than retried. A batch that completes nothing
/// aborts the run with a diagnostic instead of spinning.
async fn run_download(
    meta: &MetaInfo,
    our_peer_id: [u8; 20],
    peers: &[SocketAddr],
    progress: &ProgressDisplay,
) -> Result<Vec<CompletedPiece>> {
    let info = Arc::new(meta.info.clone());
    let downloader = Downloader::new(Arc::clone(&info), our_peer_id);

    let mut pending: Vec<u32> = (0..info.piece_count() as u32).collect();
    let mut completed: Vec<CompletedPiece> = Vec::new();
    let mut failed_indices: Vec<u32> = Vec::new();

    while !pending.is_empty() {
        let batch: Vec<u32> = pending.iter().copied().take(peers.len()).collect();
        pending.drain(..batch.len());
        debug!("Starting batch of {} pieces", batch.len());

        let report = downloader.run(&peers[..batch.len()], &batch).await;
        let made_progress = !report.completed.is_empty();

        for failure in &report.failed {
            warn!(
                "Piece {} failed on {}: {}",
                failure.index, failure.peer, failure.error
            );
        }
        failed_indices.extend(report.failed_indices());
        completed.extend(report.completed);

        let downloaded: u64 = completed.iter().map(|p| p.data.len() as u64).sum();
        progress.update(
            &DownloadStats {
                downloaded,
                pieces_completed: completed.len(),
                pieces_failed: failed_indices.len(),
                peers: peers.len(),
                progress: completed.len() as f64 / info.piece_count().max(1) as f64,
            },
            info.length,
        )?;

        if !made_progress && !pending.is_empty() {
            failed_indices.extend(pending.iter().copied());
            break;
        }
    }

    if !failed_indices.is_empty() {
        failed_indices.sort_unstable();
        anyhow::bail!(
            "{} of {} pieces failed to download (indices: {:?})",
            failed_indices.len(),
            info.piece_count(),
            failed_indices
        );
    }

    Ok(completed)
}

/// Write the assembled file into the output directory
async fn write_output(
    config: &Config,
    meta: &MetaInfo,
    file: &[u8],
) -> Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| {
            TorrentError::storage_error_full(
                "Failed to create output directory",
                config.output_dir.display().to_string(),
                e.to_string(),
            )
        })?;

    let path = config.output_dir.join(&meta.info.name);
    tokio::fs::write(&path, file).await.map_err(|e| {
        TorrentError::storage_error_full(
            "Failed to write downloaded file",
            path.display().to_string(),
            e.to_string(),
        )
    })?;

    info!("Wrote {} bytes to {}", file.len(), path.display());
    Ok(path)
}
