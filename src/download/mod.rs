//! Download orchestrator
//!
//! Fans out one task per peer connection, each assigned a distinct piece,
//! and collects results over a completion channel. A failing peer yields a
//! per-piece failure report and never takes down its siblings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Result;
use sha1::{Digest, Sha1};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::peer::PeerConnection;
use crate::torrent::TorrentInfo;

/// A piece that arrived and passed hash verification
#[derive(Debug, Clone)]
pub struct CompletedPiece {
    /// Piece index
    pub index: u32,
    /// Peer the piece came from
    pub peer: SocketAddr,
    /// Verified piece bytes
    pub data: Vec<u8>,
}

/// A piece that could not be fetched from its assigned peer
#[derive(Debug, Clone)]
pub struct PieceFailure {
    /// Piece index
    pub index: u32,
    /// Peer the piece was assigned to
    pub peer: SocketAddr,
    /// What went wrong
    pub error: String,
    /// Whether retrying the piece against another peer could help
    pub retryable: bool,
}

/// Outcome of one orchestrator batch
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub completed: Vec<CompletedPiece>,
    pub failed: Vec<PieceFailure>,
}

impl DownloadReport {
    /// Piece indices that did not complete in this batch
    pub fn failed_indices(&self) -> Vec<u32> {
        self.failed.iter().map(|f| f.index).collect()
    }
}

/// Orchestrates concurrent piece downloads across peer connections
pub struct Downloader {
    info: Arc<TorrentInfo>,
    our_peer_id: [u8; 20],
}

impl Downloader {
    /// Create a new downloader for a torrent
    pub fn new(info: Arc<TorrentInfo>, our_peer_id: [u8; 20]) -> Self {
        Self { info, our_peer_id }
    }

    /// Fetch `pieces` from `peers`, pairing peer and piece by position.
    ///
    /// One task is spawned per pair; each owns its connection exclusively.
    /// The wait loop receives exactly one result per launched task over a
    /// channel sized by the task count, in whatever order tasks finish.
    /// Pieces left without a peer are reported as failures, not silently
    /// dropped.
    pub async fn run(&self, peers: &[SocketAddr], pieces: &[u32]) -> DownloadReport {
        let mut report = DownloadReport::default();

        let assignments: Vec<(SocketAddr, u32)> =
            peers.iter().copied().zip(pieces.iter().copied()).collect();
        for &index in pieces.iter().skip(assignments.len()) {
            report.failed.push(PieceFailure {
                index,
                peer: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
                error: "no peer available for this piece".to_string(),
                retryable: true,
            });
        }
        if assignments.is_empty() {
            return report;
        }

        info!("Launching {} piece downloads, one per peer", assignments.len());

        let (tx, mut rx) = mpsc::channel(assignments.len());
        let launched = assignments.len();

        for (peer, index) in assignments {
            let tx = tx.clone();
            let info = Arc::clone(&self.info);
            let our_peer_id = self.our_peer_id;

            tokio::spawn(async move {
                let result = fetch_piece(peer, index, info, our_peer_id).await;
                // The receiver outlives every sender; a send only fails if
                // the orchestrator itself is gone
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        for _ in 0..launched {
            match rx.recv().await {
                Some(Ok(piece)) => {
                    debug!("Piece {} completed by {}", piece.index, piece.peer);
                    report.completed.push(piece);
                }
                Some(Err(failure)) => {
                    warn!(
                        "Piece {} failed on {}: {}",
                        failure.index, failure.peer, failure.error
                    );
                    report.failed.push(failure);
                }
                None => break,
            }
        }

        info!(
            "Batch finished: {} completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        report
    }
}

/// Connect, drive the state machine for one piece, and verify the result
async fn fetch_piece(
    peer: SocketAddr,
    index: u32,
    info: Arc<TorrentInfo>,
    our_peer_id: [u8; 20],
) -> Result<CompletedPiece, PieceFailure> {
    let piece_len = info.piece_size(index).ok_or_else(|| PieceFailure {
        index,
        peer,
        error: format!("piece index {} out of range", index),
        retryable: false,
    })?;

    let mut connection = PeerConnection::connect(peer, info.info_hash(), our_peer_id)
        .await
        .map_err(|e| PieceFailure {
            index,
            peer,
            error: e.to_string(),
            retryable: true,
        })?;

    let data = connection
        .download_piece(index, piece_len)
        .await
        .map_err(|e| PieceFailure {
            index,
            peer,
            error: e.to_string(),
            retryable: true,
        })?;

    let expected = info.piece_hash(index).ok_or_else(|| PieceFailure {
        index,
        peer,
        error: format!("no hash recorded for piece {}", index),
        retryable: false,
    })?;
    let mut hasher = Sha1::new();
    hasher.update(&data);
    let actual: [u8; 20] = hasher.finalize().into();
    if actual != expected {
        return Err(PieceFailure {
            index,
            peer,
            error: format!(
                "hash mismatch: expected {}, got {}",
                hex::encode(expected),
                hex::encode(actual)
            ),
            retryable: true,
        });
    }

    Ok(CompletedPiece { index, peer, data })
}

/// Stitch completed pieces into the final file buffer.
///
/// Every piece index must be present; pieces land at
/// `index * piece_length`.
pub fn assemble_file(completed: &[CompletedPiece], info: &TorrentInfo) -> Result<Vec<u8>> {
    let mut present = vec![false; info.piece_count()];
    let mut file = vec![0u8; info.length as usize];

    for piece in completed {
        let index = piece.index as usize;
        if index >= present.len() {
            return Err(anyhow::anyhow!("piece index {} out of range", piece.index));
        }
        let start = piece.index as u64 * info.piece_length;
        let end = start + piece.data.len() as u64;
        if end > info.length {
            return Err(anyhow::anyhow!(
                "piece {} overruns file length ({} > {})",
                piece.index,
                end,
                info.length
            ));
        }
        file[start as usize..end as usize].copy_from_slice(&piece.data);
        present[index] = true;
    }

    if let Some(missing) = present.iter().position(|&p| !p) {
        return Err(anyhow::anyhow!("piece {} was never downloaded", missing));
    }

    Ok(file)
}
