//! Peer connection module
//!
//! Owns one TCP connection to one remote peer and drives it through
//! handshake, bitfield exchange, interest negotiation, and the block
//! request/response loop for a single assigned piece.

use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::error::TorrentError;
use crate::peer::state::{Bitfield, PeerStatus};
use crate::protocol::{BitTorrentWire, Handshake, Message, WireProtocol};

/// Size of a block request; the final block of a piece may be shorter
pub const BLOCK_SIZE: u32 = 16 * 1024;

/// Bound on establishing the TCP connection
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Bound on each read while waiting on a peer
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// A live connection to one remote peer
#[derive(Debug)]
pub struct PeerConnection {
    /// Remote address
    addr: SocketAddr,
    /// TCP connection stream
    stream: TcpStream,
    /// Where the connection is in its lifecycle
    status: PeerStatus,
    /// Peer ID reported in the remote handshake
    remote_peer_id: Option<[u8; 20]>,
    /// Piece availability advertised by the peer
    bitfield: Option<Bitfield>,
    /// Wire protocol handler
    wire: BitTorrentWire,
}

impl PeerConnection {
    /// Connect to a peer and perform the handshake exchange.
    ///
    /// On success the connection is left waiting for the peer's bitfield.
    /// Failures (dial timeout included) are errors for this peer only.
    pub async fn connect(
        addr: SocketAddr,
        info_hash: [u8; 20],
        our_peer_id: [u8; 20],
    ) -> Result<Self> {
        debug!("Connecting to peer: {}", addr);

        let stream = timeout(DIAL_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                warn!("Dial timeout to {}", addr);
                TorrentError::connection_failure_full(
                    "Dial timeout",
                    addr.to_string(),
                    format!("{}s elapsed", DIAL_TIMEOUT.as_secs()),
                )
            })?
            .map_err(|e| {
                TorrentError::connection_failure_full(
                    "Failed to connect",
                    addr.to_string(),
                    e.to_string(),
                )
            })?;

        let mut connection = Self {
            addr,
            stream,
            status: PeerStatus::Handshaking,
            remote_peer_id: None,
            bitfield: None,
            wire: BitTorrentWire,
        };

        connection.perform_handshake(info_hash, our_peer_id).await?;
        info!("Handshake completed with peer: {}", addr);
        Ok(connection)
    }

    /// Exchange and validate handshakes
    async fn perform_handshake(&mut self, info_hash: [u8; 20], our_peer_id: [u8; 20]) -> Result<()> {
        let ours = Handshake::new(info_hash, our_peer_id);
        if let Err(e) = self.wire.write_handshake(&mut self.stream, &ours).await {
            self.status = PeerStatus::Disconnected;
            return Err(TorrentError::connection_failure_full(
                "Failed to send handshake",
                self.addr.to_string(),
                e.to_string(),
            )
            .into());
        }

        let theirs = match timeout(READ_TIMEOUT, self.wire.read_handshake(&mut self.stream)).await {
            Ok(Ok(handshake)) => handshake,
            Ok(Err(e)) => {
                self.status = PeerStatus::Disconnected;
                return Err(TorrentError::connection_failure_full(
                    "Failed to read handshake",
                    self.addr.to_string(),
                    e.to_string(),
                )
                .into());
            }
            Err(_) => {
                self.status = PeerStatus::Disconnected;
                return Err(TorrentError::connection_failure_with_peer(
                    "Handshake read timeout",
                    self.addr.to_string(),
                )
                .into());
            }
        };

        if !theirs.validate(&info_hash) {
            self.status = PeerStatus::Disconnected;
            return Err(TorrentError::connection_failure_with_peer(
                "Handshake info hash mismatch",
                self.addr.to_string(),
            )
            .into());
        }

        self.remote_peer_id = Some(theirs.peer_id);
        self.status = PeerStatus::AwaitingBitfield;
        Ok(())
    }

    /// Download the assigned piece, block by block.
    ///
    /// Drives the strict message sequence: the first frame after the
    /// handshake must be `bitfield`, the frame after `interested` must be
    /// `unchoke`, and while requesting only matching `piece` frames are
    /// acceptable. Any other message disconnects this peer.
    pub async fn download_piece(&mut self, index: u32, piece_len: u64) -> Result<Vec<u8>> {
        if self.status != PeerStatus::AwaitingBitfield {
            return Err(TorrentError::connection_failure_with_peer(
                format!("Connection not ready for download (status: {:?})", self.status),
                self.addr.to_string(),
            )
            .into());
        }

        // Bitfield must arrive before anything else
        let message = self.read_message_timed().await?;
        match message {
            Message::Bitfield { bitfield } => {
                let bitfield = Bitfield::new(bitfield);
                if !bitfield.has_piece(index) {
                    // The peer may still serve the request; worth noting
                    warn!("Peer {} does not advertise piece {}", self.addr, index);
                }
                debug!(
                    "Peer {} advertises {} pieces",
                    self.addr,
                    bitfield.piece_count()
                );
                self.bitfield = Some(bitfield);
            }
            other => return Err(self.protocol_violation("bitfield", &other)),
        }

        self.send_message(&Message::Interested).await?;
        self.status = PeerStatus::AwaitingUnchoke;

        let message = self.read_message_timed().await?;
        match message {
            Message::Unchoke => {}
            other => return Err(self.protocol_violation("unchoke", &other)),
        }

        self.status = PeerStatus::Requesting;
        debug!(
            "Requesting piece {} ({} bytes) from peer {}",
            index, piece_len, self.addr
        );

        let mut piece = vec![0u8; piece_len as usize];
        let mut offset: u32 = 0;
        while (offset as u64) < piece_len {
            let block_len = std::cmp::min(BLOCK_SIZE as u64, piece_len - offset as u64) as u32;
            self.send_message(&Message::Request {
                index,
                begin: offset,
                length: block_len,
            })
            .await?;

            // A block may arrive split over several piece frames
            let mut received: u32 = 0;
            while received < block_len {
                let message = self.read_message_timed().await?;
                let (begin, block) = match message {
                    Message::Piece { index: piece_index, begin, block } if piece_index == index => {
                        (begin, block)
                    }
                    other => return Err(self.protocol_violation("piece", &other)),
                };

                if block.is_empty() || begin != offset + received {
                    self.status = PeerStatus::Disconnected;
                    return Err(TorrentError::unexpected_message_from(
                        format!(
                            "piece data for the wrong block: begin={}, expected {}",
                            begin,
                            offset + received
                        ),
                        self.addr.to_string(),
                    )
                    .into());
                }
                let end = begin as usize + block.len();
                if end > piece.len() {
                    self.status = PeerStatus::Disconnected;
                    return Err(TorrentError::unexpected_message_from(
                        format!("block overruns piece: {} > {}", end, piece.len()),
                        self.addr.to_string(),
                    )
                    .into());
                }

                piece[begin as usize..end].copy_from_slice(&block);
                received += block.len() as u32;
            }

            offset += block_len;
        }

        self.status = PeerStatus::Done;
        info!(
            "Piece {} ({} bytes) downloaded from peer {}",
            index, piece_len, self.addr
        );
        Ok(piece)
    }

    /// Read the next frame under the read timeout
    async fn read_message_timed(&mut self) -> Result<Message> {
        match timeout(READ_TIMEOUT, self.wire.read_message(&mut self.stream)).await {
            Ok(Ok(message)) => Ok(message),
            Ok(Err(e)) => {
                self.status = PeerStatus::Disconnected;
                Err(e.context(format!("reading from peer {}", self.addr)))
            }
            Err(_) => {
                self.status = PeerStatus::Disconnected;
                Err(TorrentError::connection_failure_with_peer(
                    "Read timeout",
                    self.addr.to_string(),
                )
                .into())
            }
        }
    }

    /// Write a frame, disconnecting on failure
    async fn send_message(&mut self, message: &Message) -> Result<()> {
        if let Err(e) = self.wire.write_message(&mut self.stream, message).await {
            self.status = PeerStatus::Disconnected;
            return Err(TorrentError::connection_failure_full(
                "Failed to send message",
                self.addr.to_string(),
                e.to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Build the error for a message that is invalid in the current state
    fn protocol_violation(&mut self, expected: &str, got: &Message) -> anyhow::Error {
        self.status = PeerStatus::Disconnected;
        TorrentError::unexpected_message_from(
            format!("expected {}, got {:?}", expected, got.message_id()),
            self.addr.to_string(),
        )
        .into()
    }

    /// Remote address of this connection
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current lifecycle state
    pub fn status(&self) -> PeerStatus {
        self.status
    }

    /// Peer ID reported by the remote side during the handshake
    pub fn remote_peer_id(&self) -> Option<[u8; 20]> {
        self.remote_peer_id
    }

    /// Bitfield received from the peer, if any
    pub fn bitfield(&self) -> Option<&Bitfield> {
        self.bitfield.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const INFO_HASH: [u8; 20] = [0x11; 20];

    /// Accept one connection, answer the handshake, send the given frames,
    /// then drain the socket to EOF and return whatever else the client sent.
    async fn scripted_peer(listener: TcpListener, frames: Vec<Vec<u8>>) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut handshake = [0u8; 68];
        socket.read_exact(&mut handshake).await.unwrap();
        let reply = Handshake::new(INFO_HASH, [0x22; 20]);
        socket.write_all(&reply.serialize()).await.unwrap();

        for frame in frames {
            socket.write_all(&frame).await.unwrap();
        }

        let mut rest = Vec::new();
        let _ = socket.read_to_end(&mut rest).await;
        rest
    }

    #[tokio::test]
    async fn test_connect_and_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(scripted_peer(listener, vec![]));

        let conn = PeerConnection::connect(addr, INFO_HASH, [0x33; 20])
            .await
            .unwrap();
        assert_eq!(conn.status(), PeerStatus::AwaitingBitfield);
        assert_eq!(conn.remote_peer_id(), Some([0x22; 20]));

        drop(conn);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_info_hash_mismatch_disconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut handshake = [0u8; 68];
            socket.read_exact(&mut handshake).await.unwrap();
            // Reply for a different torrent
            let reply = Handshake::new([0x99; 20], [0x22; 20]);
            socket.write_all(&reply.serialize()).await.unwrap();
        });

        let result = PeerConnection::connect(addr, INFO_HASH, [0x33; 20]).await;
        assert!(result.is_err());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused_is_per_peer_failure() {
        // Bind then drop to get a port with no listener
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = PeerConnection::connect(addr, INFO_HASH, [0x33; 20])
            .await
            .unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::ConnectionFailure { .. }));
    }

    #[tokio::test]
    async fn test_non_bitfield_after_handshake_disconnects_without_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Peer sends `have` where the bitfield belongs
        let server = tokio::spawn(scripted_peer(
            listener,
            vec![Message::Have { piece_index: 0 }.serialize()],
        ));

        let mut conn = PeerConnection::connect(addr, INFO_HASH, [0x33; 20])
            .await
            .unwrap();
        let err = conn.download_piece(0, 1024).await.unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::UnexpectedMessage { .. }));
        assert_eq!(conn.status(), PeerStatus::Disconnected);

        // The connection never issued a request (or anything else)
        drop(conn);
        let bytes_after_handshake = server.await.unwrap();
        assert!(bytes_after_handshake.is_empty());
    }

    #[tokio::test]
    async fn test_choke_instead_of_unchoke_disconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(scripted_peer(
            listener,
            vec![
                Message::Bitfield { bitfield: vec![0b10000000] }.serialize(),
                Message::Choke.serialize(),
            ],
        ));

        let mut conn = PeerConnection::connect(addr, INFO_HASH, [0x33; 20])
            .await
            .unwrap();
        let err = conn.download_piece(0, 1024).await.unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::UnexpectedMessage { .. }));
        assert_eq!(conn.status(), PeerStatus::Disconnected);

        drop(conn);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_non_piece_while_requesting_fails_the_piece() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(scripted_peer(
            listener,
            vec![
                Message::Bitfield { bitfield: vec![0b10000000] }.serialize(),
                Message::Unchoke.serialize(),
                Message::Have { piece_index: 3 }.serialize(),
            ],
        ));

        let mut conn = PeerConnection::connect(addr, INFO_HASH, [0x33; 20])
            .await
            .unwrap();
        let err = conn.download_piece(0, 1024).await.unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::UnexpectedMessage { .. }));
        assert_eq!(conn.status(), PeerStatus::Disconnected);

        drop(conn);
        server.await.unwrap();
    }
}
