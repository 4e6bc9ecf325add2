//! Tracker client
//!
//! Announces to an HTTP tracker and hands the bencoded response body to the
//! response parser. The raw 20-byte info-hash and peer-id go into the query
//! string percent-encoded byte-for-byte.

use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};
use url::Url;

use crate::error::TorrentError;
use crate::torrent::MetaInfo;
use crate::tracker::response::TrackerResponse;

/// Bound on the whole announce round-trip
const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP tracker client
pub struct TrackerClient {
    client: reqwest::Client,
    peer_id: [u8; 20],
    port: u16,
}

impl TrackerClient {
    /// Create a new tracker client announcing under `peer_id` and `port`
    pub fn new(peer_id: [u8; 20], port: u16) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(ANNOUNCE_TIMEOUT)
            .build()
            .map_err(TorrentError::from)?;

        Ok(Self {
            client,
            peer_id,
            port,
        })
    }

    /// Announce the torrent and return the tracker's peer list
    pub async fn announce(&self, meta: &MetaInfo) -> Result<TrackerResponse> {
        let url = build_announce_url(
            &meta.announce,
            &meta.info_hash(),
            &self.peer_id,
            self.port,
            meta.info.length,
        )?;
        debug!("Announcing to tracker: {}", url);

        let response = self.client.get(&url).send().await.map_err(TorrentError::from)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TorrentError::tracker_error_with_url(
                format!("tracker returned HTTP {}", status),
                meta.announce.clone(),
            )
            .into());
        }

        let body = response.bytes().await.map_err(TorrentError::from)?;
        let parsed = TrackerResponse::from_bencode(&body)?;
        info!(
            "Tracker announce ok: {} peers, interval {}s",
            parsed.peers.len(),
            parsed.interval
        );
        Ok(parsed)
    }
}

/// Build the announce GET URL.
///
/// `info_hash` and `peer_id` are raw bytes, not UTF-8, so they bypass the
/// `Url` query builder and are percent-encoded directly.
fn build_announce_url(
    announce: &str,
    info_hash: &[u8; 20],
    peer_id: &[u8; 20],
    port: u16,
    left: u64,
) -> Result<String> {
    let base = Url::parse(announce).map_err(|e| {
        TorrentError::tracker_error_with_url(
            format!("invalid announce URL: {}", e),
            announce.to_string(),
        )
    })?;
    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(TorrentError::tracker_error_with_url(
            format!("unsupported announce scheme: {}", base.scheme()),
            announce.to_string(),
        )
        .into());
    }

    let separator = if base.query().is_some() { '&' } else { '?' };
    Ok(format!(
        "{}{}info_hash={}&peer_id={}&port={}&uploaded=0&downloaded=0&compact=1&left={}",
        announce,
        separator,
        urlencoding::encode_binary(info_hash),
        urlencoding::encode_binary(peer_id),
        port,
        left
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_announce_url() {
        let url = build_announce_url(
            "http://tracker.example.com/announce",
            &[0xab; 20],
            &[0x2d; 20],
            6881,
            92063,
        )
        .unwrap();

        assert!(url.starts_with("http://tracker.example.com/announce?info_hash="));
        assert!(url.contains(&"%AB".repeat(20)));
        // 0x2d is '-' and needs no escaping
        assert!(url.contains(&format!("peer_id={}", "-".repeat(20))));
        assert!(url.contains("port=6881"));
        assert!(url.contains("uploaded=0"));
        assert!(url.contains("downloaded=0"));
        assert!(url.contains("compact=1"));
        assert!(url.contains("left=92063"));
    }

    #[test]
    fn test_build_announce_url_appends_to_existing_query() {
        let url = build_announce_url(
            "http://tracker.example.com/announce?key=abc",
            &[0x01; 20],
            &[0x02; 20],
            6881,
            1,
        )
        .unwrap();
        assert!(url.starts_with("http://tracker.example.com/announce?key=abc&info_hash="));
    }

    #[test]
    fn test_build_announce_url_rejects_bad_url() {
        assert!(build_announce_url("not a url", &[0; 20], &[0; 20], 6881, 0).is_err());
        assert!(build_announce_url("udp://tracker/announce", &[0; 20], &[0; 20], 6881, 0).is_err());
    }
}
