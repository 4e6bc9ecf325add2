//! Bencode codec
//!
//! The self-describing, length-prefixed serialization format used by
//! BitTorrent for metainfo files and tracker responses.

pub mod decode;
pub mod encode;
pub mod value;

pub use decode::{decode, Decoder};
pub use encode::{encode, encode_into};
pub use value::BencodeValue;
