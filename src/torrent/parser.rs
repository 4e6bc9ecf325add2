//! Torrent file parser
//!
//! Decodes a `.torrent` metainfo file and extracts the typed records.
//! Missing required fields and wrong-shaped values are reported as typed
//! errors; they are fatal for the run at the call site.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{debug, info};

use crate::bencode::{decode, BencodeValue};
use crate::error::TorrentError;
use crate::torrent::info::{MetaInfo, TorrentInfo};

/// Parser for .torrent files
pub struct TorrentParser;

impl TorrentParser {
    /// Parse a .torrent file from bytes
    pub fn parse_bytes(data: &[u8]) -> Result<MetaInfo> {
        debug!("Parsing metainfo from {} bytes", data.len());

        let root = decode(data)?;
        let root_dict = root
            .as_dict()
            .ok_or_else(|| TorrentError::protocol_mismatch("metainfo root is not a dictionary"))?;

        let announce = require_str(root_dict, b"announce")?;
        // `created by` is optional but must be a string when present
        let created_by = match root_dict.get(b"created by".as_slice()) {
            Some(value) => Some(
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        TorrentError::protocol_mismatch_for("expected a string", "created by")
                    })?,
            ),
            None => None,
        };

        let info_dict = root_dict
            .get(b"info".as_slice())
            .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", "info"))?
            .as_dict()
            .ok_or_else(|| TorrentError::protocol_mismatch_for("expected a dictionary", "info"))?;

        let name = require_str(info_dict, b"name")?;
        let length = require_integer(info_dict, b"length")?;
        let piece_length = require_integer(info_dict, b"piece length")?;
        let pieces_bytes = info_dict
            .get(b"pieces".as_slice())
            .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", "pieces"))?
            .as_bytes()
            .ok_or_else(|| {
                TorrentError::protocol_mismatch_for("expected a byte string", "pieces")
            })?;

        if length < 0 {
            return Err(TorrentError::protocol_mismatch_for("length is negative", "length").into());
        }
        if piece_length <= 0 {
            return Err(
                TorrentError::protocol_mismatch_for("piece length is not positive", "piece length")
                    .into(),
            );
        }

        let pieces = TorrentInfo::parse_piece_hashes(pieces_bytes)?;
        let expected_pieces = (length as u64).div_ceil(piece_length as u64) as usize;
        if pieces.len() != expected_pieces {
            return Err(TorrentError::protocol_mismatch_for(
                format!(
                    "{} piece hashes do not cover length {} at piece length {}",
                    pieces.len(),
                    length,
                    piece_length
                ),
                "pieces",
            )
            .into());
        }

        let meta = MetaInfo {
            announce,
            created_by,
            info: TorrentInfo {
                length: length as u64,
                name,
                piece_length: piece_length as u64,
                pieces,
            },
        };

        info!(
            "Parsed metainfo: {} ({} bytes, {} pieces)",
            meta.info.name,
            meta.info.length,
            meta.info.piece_count()
        );
        Ok(meta)
    }

    /// Parse a .torrent file from a file path
    pub fn parse_file(path: &std::path::Path) -> Result<MetaInfo> {
        info!("Loading torrent file from: {}", path.display());

        let data = std::fs::read(path).map_err(|e| {
            TorrentError::storage_error_full(
                "Failed to read torrent file",
                path.display().to_string(),
                e.to_string(),
            )
        })?;

        debug!("Read {} bytes from torrent file", data.len());
        Self::parse_bytes(&data)
    }
}

fn require_str(dict: &BTreeMap<Vec<u8>, BencodeValue>, key: &[u8]) -> Result<String> {
    let field = String::from_utf8_lossy(key).to_string();
    let value = dict
        .get(key)
        .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", field.clone()))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| TorrentError::protocol_mismatch_for("expected a string", field).into())
}

fn require_integer(dict: &BTreeMap<Vec<u8>, BencodeValue>, key: &[u8]) -> Result<i64> {
    let field = String::from_utf8_lossy(key).to_string();
    let value = dict
        .get(key)
        .ok_or_else(|| TorrentError::protocol_mismatch_for("missing field", field.clone()))?;
    value
        .as_integer()
        .ok_or_else(|| TorrentError::protocol_mismatch_for("expected an integer", field).into())
}
