//! Tracker communication module
//!
//! HTTP announce and compact peer list parsing.

pub mod client;
pub mod response;

pub use client::TrackerClient;
pub use response::{parse_compact_peers, TrackerResponse};
