//! minitorrent
//!
//! A minimal BitTorrent client: bencode codec, tracker announce, and a
//! concurrent peer-wire piece downloader.

pub mod bencode;
pub mod cli;
pub mod download;
pub mod error;
pub mod peer;
pub mod protocol;
pub mod torrent;
pub mod tracker;

pub use error::TorrentError;

pub use bencode::{decode, encode, BencodeValue};
pub use cli::{CliArgs, Config, DownloadStats, ProgressDisplay};
pub use download::{assemble_file, CompletedPiece, DownloadReport, Downloader, PieceFailure};
pub use peer::{Bitfield, PeerConnection, PeerStatus, BLOCK_SIZE};
pub use protocol::{BitTorrentWire, Handshake, Message, MessageId, WireProtocol};
pub use torrent::{MetaInfo, TorrentInfo, TorrentParser};
pub use tracker::{parse_compact_peers, TrackerClient, TrackerResponse};
