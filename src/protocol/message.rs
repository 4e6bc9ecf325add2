//! BitTorrent protocol messages
//!
//! The closed set of peer wire messages, framed as
//! `[4-byte big-endian length][1-byte message ID][payload]`. A length of
//! zero is a keep-alive and carries no ID.

use bytes::{Buf, BufMut, BytesMut};
use anyhow::Result;

use crate::error::TorrentError;

/// BitTorrent message IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    Choke = 0,
    Unchoke = 1,
    Interested = 2,
    NotInterested = 3,
    Have = 4,
    Bitfield = 5,
    Request = 6,
    Piece = 7,
    Cancel = 8,
    Port = 9,
}

impl TryFrom<u8> for MessageId {
    type Error = TorrentError;

    fn try_from(value: u8) -> Result<Self, TorrentError> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            9 => Ok(MessageId::Port),
            _ => Err(TorrentError::invalid_message_with_source(
                "Unrecognized message ID",
                format!("value: {}", value),
            )),
        }
    }
}

/// BitTorrent protocol message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    KeepAlive,
    Choke,
    Unchoke,
    Interested,
    NotInterested,
    Have { piece_index: u32 },
    Bitfield { bitfield: Vec<u8> },
    Request { index: u32, begin: u32, length: u32 },
    Piece { index: u32, begin: u32, block: Vec<u8> },
    Cancel { index: u32, begin: u32, length: u32 },
    Port { listen_port: u16 },
}

impl Message {
    /// Get the message ID (returns None for KeepAlive)
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Message::KeepAlive => None,
            Message::Choke => Some(MessageId::Choke),
            Message::Unchoke => Some(MessageId::Unchoke),
            Message::Interested => Some(MessageId::Interested),
            Message::NotInterested => Some(MessageId::NotInterested),
            Message::Have { .. } => Some(MessageId::Have),
            Message::Bitfield { .. } => Some(MessageId::Bitfield),
            Message::Request { .. } => Some(MessageId::Request),
            Message::Piece { .. } => Some(MessageId::Piece),
            Message::Cancel { .. } => Some(MessageId::Cancel),
            Message::Port { .. } => Some(MessageId::Port),
        }
    }

    /// Get the frame length field value (ID byte + payload)
    pub fn length(&self) -> u32 {
        match self {
            Message::KeepAlive => 0,
            Message::Choke
            | Message::Unchoke
            | Message::Interested
            | Message::NotInterested => 1,
            Message::Have { .. } => 5,
            Message::Bitfield { bitfield } => 1 + bitfield.len() as u32,
            Message::Request { .. } => 13,
            Message::Piece { block, .. } => 9 + block.len() as u32,
            Message::Cancel { .. } => 13,
            Message::Port { .. } => 3,
        }
    }

    /// Serialize the message to bytes (including length prefix)
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(4 + self.length() as usize);
        buf.put_u32(self.length());

        if let Some(id) = self.message_id() {
            buf.put_u8(id as u8);
        }

        match self {
            Message::KeepAlive
            | Message::Choke
            | Message::Unchoke
            | Message::Interested
            | Message::NotInterested => {}
            Message::Have { piece_index } => {
                buf.put_u32(*piece_index);
            }
            Message::Bitfield { bitfield } => {
                buf.put_slice(bitfield);
            }
            Message::Request { index, begin, length } => {
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_u32(*length);
            }
            Message::Piece { index, begin, block } => {
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_slice(block);
            }
            Message::Cancel { index, begin, length } => {
                buf.put_u32(*index);
                buf.put_u32(*begin);
                buf.put_u32(*length);
            }
            Message::Port { listen_port } => {
                buf.put_u16(*listen_port);
            }
        }

        buf.to_vec()
    }

    /// Deserialize a message from bytes (including length prefix)
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let mut buf = BytesMut::from(data);

        if buf.remaining() < 4 {
            return Err(TorrentError::invalid_message_with_source(
                "Frame too short",
                format!("{} bytes before length prefix ends", buf.remaining()),
            )
            .into());
        }

        let length = buf.get_u32() as usize;

        // A zero-length frame is a keep-alive and has no message ID
        if length == 0 {
            return Ok(Message::KeepAlive);
        }

        if buf.remaining() < 1 {
            return Err(TorrentError::invalid_message("Frame too short: missing message ID").into());
        }

        let id = MessageId::try_from(buf.get_u8())?;

        match id {
            MessageId::Choke => Ok(Message::Choke),
            MessageId::Unchoke => Ok(Message::Unchoke),
            MessageId::Interested => Ok(Message::Interested),
            MessageId::NotInterested => Ok(Message::NotInterested),
            MessageId::Have => {
                if buf.remaining() < 4 {
                    return Err(short_payload("have", 4, buf.remaining()).into());
                }
                Ok(Message::Have {
                    piece_index: buf.get_u32(),
                })
            }
            MessageId::Bitfield => Ok(Message::Bitfield {
                bitfield: buf.to_vec(),
            }),
            MessageId::Request => {
                if buf.remaining() < 12 {
                    return Err(short_payload("request", 12, buf.remaining()).into());
                }
                Ok(Message::Request {
                    index: buf.get_u32(),
                    begin: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            MessageId::Piece => {
                if buf.remaining() < 8 {
                    return Err(short_payload("piece", 8, buf.remaining()).into());
                }
                Ok(Message::Piece {
                    index: buf.get_u32(),
                    begin: buf.get_u32(),
                    block: buf.to_vec(),
                })
            }
            MessageId::Cancel => {
                if buf.remaining() < 12 {
                    return Err(short_payload("cancel", 12, buf.remaining()).into());
                }
                Ok(Message::Cancel {
                    index: buf.get_u32(),
                    begin: buf.get_u32(),
                    length: buf.get_u32(),
                })
            }
            MessageId::Port => {
                if buf.remaining() < 2 {
                    return Err(short_payload("port", 2, buf.remaining()).into());
                }
                Ok(Message::Port {
                    listen_port: buf.get_u16(),
                })
            }
        }
    }
}

fn short_payload(name: &str, expected: usize, got: usize) -> TorrentError {
    TorrentError::invalid_message_with_source(
        format!("{} payload too short", name),
        format!("expected at least {} bytes, got {}", expected, got),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keepalive_roundtrip() {
        let serialized = Message::KeepAlive.serialize();
        assert_eq!(serialized, vec![0, 0, 0, 0]);
        assert_eq!(Message::deserialize(&serialized).unwrap(), Message::KeepAlive);
    }

    #[test]
    fn test_no_payload_messages_roundtrip() {
        for message in [
            Message::Choke,
            Message::Unchoke,
            Message::Interested,
            Message::NotInterested,
        ] {
            let serialized = message.serialize();
            assert_eq!(serialized.len(), 5);
            assert_eq!(Message::deserialize(&serialized).unwrap(), message);
        }
    }

    #[test]
    fn test_have_roundtrip() {
        let message = Message::Have { piece_index: 42 };
        assert_eq!(
            Message::deserialize(&message.serialize()).unwrap(),
            message
        );
    }

    #[test]
    fn test_request_roundtrip() {
        let message = Message::Request {
            index: 1,
            begin: 0,
            length: 16384,
        };
        let serialized = message.serialize();
        assert_eq!(serialized.len(), 17);
        assert_eq!(Message::deserialize(&serialized).unwrap(), message);
    }

    #[test]
    fn test_piece_roundtrip() {
        let message = Message::Piece {
            index: 10,
            begin: 16384,
            block: vec![1, 2, 3, 4, 5],
        };
        assert_eq!(
            Message::deserialize(&message.serialize()).unwrap(),
            message
        );
    }

    #[test]
    fn test_bitfield_roundtrip_empty_payload() {
        let message = Message::Bitfield { bitfield: vec![] };
        let deserialized = Message::deserialize(&message.serialize()).unwrap();
        assert_eq!(deserialized, message);
    }

    #[test]
    fn test_cancel_and_port_roundtrip() {
        let cancel = Message::Cancel {
            index: 3,
            begin: 0,
            length: 16384,
        };
        assert_eq!(Message::deserialize(&cancel.serialize()).unwrap(), cancel);

        let port = Message::Port { listen_port: 6881 };
        assert_eq!(Message::deserialize(&port.serialize()).unwrap(), port);
    }

    #[test]
    fn test_frame_lengths() {
        assert_eq!(Message::KeepAlive.length(), 0);
        assert_eq!(Message::Choke.length(), 1);
        assert_eq!(Message::Have { piece_index: 0 }.length(), 5);
        assert_eq!(
            Message::Request { index: 0, begin: 0, length: 0 }.length(),
            13
        );
        assert_eq!(
            Message::Piece { index: 0, begin: 0, block: vec![1, 2, 3] }.length(),
            12
        );
        assert_eq!(Message::Port { listen_port: 0 }.length(), 3);
    }

    #[test]
    fn test_deserialize_too_short() {
        let err = Message::deserialize(&[0, 0, 0]).unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::InvalidMessage { .. }));
    }

    #[test]
    fn test_deserialize_unknown_id() {
        // length = 1, id = 10: outside the known set
        let err = Message::deserialize(&[0, 0, 0, 1, 10]).unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::InvalidMessage { .. }));
    }

    #[test]
    fn test_deserialize_short_payload() {
        // Claims to be a request but carries only 4 payload bytes
        let err = Message::deserialize(&[0, 0, 0, 13, 6, 0, 0, 0, 1]).unwrap_err();
        let torrent_err = err.downcast_ref::<TorrentError>().unwrap();
        assert!(matches!(torrent_err, TorrentError::InvalidMessage { .. }));
    }

    #[test]
    fn test_message_id_from_u8() {
        assert_eq!(MessageId::try_from(0).unwrap(), MessageId::Choke);
        assert_eq!(MessageId::try_from(5).unwrap(), MessageId::Bitfield);
        assert_eq!(MessageId::try_from(9).unwrap(), MessageId::Port);
        assert!(MessageId::try_from(10).is_err());
    }
}
