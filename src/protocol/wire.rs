//! Wire protocol utilities
//!
//! Async framing over a stream: length-prefixed messages and the fixed-size
//! handshake.

use bytes::{BufMut, BytesMut};
use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::TorrentError;
use super::{Handshake, Message, HANDSHAKE_LENGTH};

/// Upper bound on a declared frame length. The largest legitimate frame is
/// a piece message carrying one 16 KiB block; anything near a mebibyte is
/// a corrupt or hostile length prefix.
const MAX_FRAME_LENGTH: usize = 1 << 20;

/// WireProtocol trait for protocol utilities
pub trait WireProtocol {
    /// Read a complete message from the stream
    async fn read_message<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Message>;

    /// Write a message to the stream
    async fn write_message<W: AsyncWriteExt + Unpin>(
        &mut self,
        writer: &mut W,
        message: &Message,
    ) -> Result<()>;

    /// Read a handshake from the stream
    async fn read_handshake<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Handshake>;

    /// Write a handshake to the stream
    async fn write_handshake<W: AsyncWriteExt + Unpin>(
        &mut self,
        writer: &mut W,
        handshake: &Handshake,
    ) -> Result<()>;
}

/// Default implementation of WireProtocol
#[derive(Debug)]
pub struct BitTorrentWire;

impl WireProtocol for BitTorrentWire {
    async fn read_message<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Message> {
        let mut length_buf = [0u8; 4];
        reader.read_exact(&mut length_buf).await?;
        let length = u32::from_be_bytes(length_buf) as usize;

        if length == 0 {
            return Ok(Message::KeepAlive);
        }
        if length > MAX_FRAME_LENGTH {
            return Err(TorrentError::invalid_message_with_source(
                "Declared frame length is implausible",
                format!("{} bytes", length),
            )
            .into());
        }

        let mut payload = vec![0u8; length];
        reader.read_exact(&mut payload).await?;

        let mut frame = BytesMut::with_capacity(4 + length);
        frame.put_slice(&length_buf);
        frame.put_slice(&payload);
        Message::deserialize(&frame)
    }

    async fn write_message<W: AsyncWriteExt + Unpin>(
        &mut self,
        writer: &mut W,
        message: &Message,
    ) -> Result<()> {
        writer.write_all(&message.serialize()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_handshake<R: AsyncReadExt + Unpin>(&mut self, reader: &mut R) -> Result<Handshake> {
        let mut frame = [0u8; HANDSHAKE_LENGTH];
        reader.read_exact(&mut frame).await?;
        Handshake::deserialize(&frame)
    }

    async fn write_handshake<W: AsyncWriteExt + Unpin>(
        &mut self,
        writer: &mut W,
        handshake: &Handshake,
    ) -> Result<()> {
        writer.write_all(&handshake.serialize()).await?;
        writer.flush().await?;
        Ok(())
    }
}
