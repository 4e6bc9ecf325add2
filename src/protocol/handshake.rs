//! BitTorrent handshake protocol
//!
//! The fixed 68-byte frame that opens every peer connection:
//! `[1 byte = 19]["BitTorrent protocol"][8 reserved][20-byte info-hash]
//! [20-byte peer-id]`. Agreement on the info-hash is what proves both sides
//! are talking about the same torrent.

use bytes::{BufMut, BytesMut};
use anyhow::Result;
use tracing::{debug, warn};

use crate::error::TorrentError;

/// BitTorrent protocol identifier string
pub const PROTOCOL_STRING: &str = "BitTorrent protocol";

/// Length of the protocol string
pub const PROTOCOL_LENGTH: u8 = 19;

/// Total size of a handshake frame in bytes
pub const HANDSHAKE_LENGTH: usize = 68;

/// BitTorrent handshake message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Torrent info hash
    pub info_hash: [u8; 20],
    /// Sender's peer ID
    pub peer_id: [u8; 20],
}

impl Handshake {
    /// Create a new handshake with info_hash and peer_id
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        Self { info_hash, peer_id }
    }

    /// Generate a random peer ID with an "-MT" client prefix
    pub fn generate_peer_id() -> [u8; 20] {
        let mut peer_id = [0u8; 20];
        peer_id[0..8].copy_from_slice(b"-MT0100-");
        peer_id[8..].copy_from_slice(&rand::random::<[u8; 12]>());
        debug!("Generated peer ID: {}", hex::encode(peer_id));
        peer_id
    }

    /// Serialize the handshake to its 68-byte wire form
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HANDSHAKE_LENGTH);
        buf.put_u8(PROTOCOL_LENGTH);
        buf.put_slice(PROTOCOL_STRING.as_bytes());
        buf.put_slice(&[0u8; 8]); // Reserved bytes
        buf.put_slice(&self.info_hash);
        buf.put_slice(&self.peer_id);
        buf.to_vec()
    }

    /// Deserialize a handshake from bytes
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        if data.len() < HANDSHAKE_LENGTH {
            return Err(TorrentError::invalid_message_with_source(
                "Handshake frame too short",
                format!("expected {} bytes, got {}", HANDSHAKE_LENGTH, data.len()),
            )
            .into());
        }

        if data[0] != PROTOCOL_LENGTH {
            return Err(TorrentError::invalid_message_with_source(
                "Invalid protocol length",
                format!("expected {}, got {}", PROTOCOL_LENGTH, data[0]),
            )
            .into());
        }

        if &data[1..20] != PROTOCOL_STRING.as_bytes() {
            return Err(TorrentError::invalid_message("Invalid protocol string").into());
        }

        // data[20..28] are reserved extension bits; ignored here
        let mut info_hash = [0u8; 20];
        info_hash.copy_from_slice(&data[28..48]);
        let mut peer_id = [0u8; 20];
        peer_id.copy_from_slice(&data[48..68]);

        Ok(Self { info_hash, peer_id })
    }

    /// Check the handshake against the info-hash we expect to be discussing
    pub fn validate(&self, expected_info_hash: &[u8; 20]) -> bool {
        if self.info_hash != *expected_info_hash {
            warn!(
                "Handshake info hash mismatch: expected {}, got {}",
                hex::encode(expected_info_hash),
                hex::encode(self.info_hash)
            );
            return false;
        }
        true
    }
}
