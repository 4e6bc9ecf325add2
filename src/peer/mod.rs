//! Peer connection module
//!
//! One state-machine-driven TCP connection per remote peer.

pub mod connection;
pub mod state;

// Re-export main types
pub use connection::{PeerConnection, BLOCK_SIZE};
pub use state::{Bitfield, PeerStatus};
