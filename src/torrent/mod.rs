//! Torrent file handling module
//!
//! Parsing and typed representation of .torrent metainfo files.

pub mod info;
pub mod parser;

pub use info::{MetaInfo, TorrentInfo};
pub use parser::TorrentParser;
