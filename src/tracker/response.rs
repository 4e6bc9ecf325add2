//! Tracker response parsing
//!
//! Decodes the bencoded announce response body: an `interval` and a
//! compact peer list (6 bytes per peer: 4-byte IPv4 + 2-byte big-endian
//! port).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::Result;
use tracing::debug;

use crate::bencode::decode;
use crate::error::TorrentError;

/// A parsed tracker announce response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerResponse {
    /// Seconds the tracker asks us to wait between announces
    pub interval: u64,
    /// Peers offered by the tracker
    pub peers: Vec<SocketAddr>,
}

impl TrackerResponse {
    /// Parse a bencoded announce response body
    pub fn from_bencode(data: &[u8]) -> Result<Self> {
        let value = decode(data)?;
        let dict = value.as_dict().ok_or_else(|| {
            TorrentError::protocol_mismatch("tracker response is not a dictionary")
        })?;

        if let Some(reason) = dict.get(b"failure reason".as_slice()) {
            let text = reason.as_str().unwrap_or("(unreadable reason)");
            return Err(TorrentError::tracker_error(format!("tracker rejected announce: {}", text)).into());
        }

        let interval = dict
            .get(b"interval".as_slice())
            .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", "interval"))?
            .as_integer()
            .ok_or_else(|| TorrentError::protocol_mismatch_for("expected an integer", "interval"))?;
        if interval < 0 {
            return Err(
                TorrentError::protocol_mismatch_for("interval is negative", "interval").into(),
            );
        }

        let peers_bytes = dict
            .get(b"peers".as_slice())
            .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", "peers"))?
            .as_bytes()
            .ok_or_else(|| {
                TorrentError::protocol_mismatch_for("expected a byte string", "peers")
            })?;

        let peers = parse_compact_peers(peers_bytes)?;
        debug!("Tracker offered {} peers, interval {}s", peers.len(), interval);

        Ok(Self {
            interval: interval as u64,
            peers,
        })
    }
}

/// Split a compact peer list into socket addresses
pub fn parse_compact_peers(bytes: &[u8]) -> Result<Vec<SocketAddr>> {
    if bytes.len() % 6 != 0 {
        return Err(TorrentError::protocol_mismatch_for(
            format!("compact peer list length {} is not a multiple of 6", bytes.len()),
            "peers",
        )
        .into());
    }

    let peers = bytes
        .chunks_exact(6)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddr::new(IpAddr::V4(ip), port)
        })
        .collect();

    Ok(peers)
}
