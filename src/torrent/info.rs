//! Torrent information structures
//!
//! Typed records extracted from a metainfo file, plus the canonical
//! re-encoding of the info dictionary that the info-hash is derived from.

use std::collections::BTreeMap;

use anyhow::Result;
use sha1::{Digest, Sha1};

use crate::bencode::{encode, BencodeValue};

/// The `info` dictionary of a single-file torrent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentInfo {
    /// Total byte length of the file
    pub length: u64,
    /// Suggested file name
    pub name: String,
    /// Bytes per piece; the last piece may be shorter
    pub piece_length: u64,
    /// SHA-1 hash of each piece, in piece order
    pub pieces: Vec<[u8; 20]>,
}

impl TorrentInfo {
    /// Number of pieces in the torrent
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Byte length of the piece at `index`, shorter for the final piece
    pub fn piece_size(&self, index: u32) -> Option<u64> {
        if (index as usize) >= self.pieces.len() {
            return None;
        }
        let start = index as u64 * self.piece_length;
        Some(std::cmp::min(self.piece_length, self.length - start))
    }

    /// Expected SHA-1 hash of the piece at `index`
    pub fn piece_hash(&self, index: u32) -> Option<[u8; 20]> {
        self.pieces.get(index as usize).copied()
    }

    /// Split the raw `pieces` byte string into 20-byte hashes
    pub fn parse_piece_hashes(pieces_bytes: &[u8]) -> Result<Vec<[u8; 20]>> {
        if pieces_bytes.len() % 20 != 0 {
            return Err(anyhow::anyhow!(
                "pieces field length must be a multiple of 20, got {}",
                pieces_bytes.len()
            ));
        }

        let mut pieces = Vec::with_capacity(pieces_bytes.len() / 20);
        for chunk in pieces_bytes.chunks_exact(20) {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(chunk);
            pieces.push(hash);
        }

        Ok(pieces)
    }

    /// Re-build the info dictionary as a bencode value.
    ///
    /// Each struct field maps to its wire key explicitly; the `BTreeMap`
    /// emits the pairs in sorted byte order, which is what trackers and
    /// peers hash against.
    pub fn to_bencode(&self) -> BencodeValue {
        let mut pieces_bytes = Vec::with_capacity(self.pieces.len() * 20);
        for hash in &self.pieces {
            pieces_bytes.extend_from_slice(hash);
        }

        let mut entries = BTreeMap::new();
        entries.insert(b"length".to_vec(), BencodeValue::Integer(self.length as i64));
        entries.insert(b"name".to_vec(), BencodeValue::bytes(self.name.as_bytes()));
        entries.insert(
            b"piece length".to_vec(),
            BencodeValue::Integer(self.piece_length as i64),
        );
        entries.insert(b"pieces".to_vec(), BencodeValue::Bytes(pieces_bytes));
        BencodeValue::Dict(entries)
    }

    /// SHA-1 of the canonical bencode encoding of the info dictionary
    pub fn info_hash(&self) -> [u8; 20] {
        let encoded = encode(&self.to_bencode());
        let mut hasher = Sha1::new();
        hasher.update(&encoded);
        hasher.finalize().into()
    }

    /// Info hash as a hex string, for diagnostics
    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash())
    }
}

/// A parsed metainfo file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaInfo {
    /// Tracker announce URL
    pub announce: String,
    /// Optional creator tag from the metainfo
    pub created_by: Option<String>,
    /// The info dictionary
    pub info: TorrentInfo,
}

impl MetaInfo {
    /// Info hash identifying this torrent to trackers and peers
    pub fn info_hash(&self) -> [u8; 20] {
        self.info.info_hash()
    }
}
