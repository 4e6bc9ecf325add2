//! Bencode value tree
//!
//! The dynamically-shaped result of decoding: a tagged union over the four
//! bencode types. Dictionary keys are raw byte strings kept in a `BTreeMap`,
//! so re-serialization walks them in sorted byte order.

use std::collections::BTreeMap;

/// A decoded bencode value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BencodeValue {
    /// `i<decimal>e`
    Integer(i64),
    /// `<len>:<bytes>`, not necessarily UTF-8
    Bytes(Vec<u8>),
    /// `l<items>e`
    List(Vec<BencodeValue>),
    /// `d<key-value pairs>e`, keys unique, sorted on output
    Dict(BTreeMap<Vec<u8>, BencodeValue>),
}

impl BencodeValue {
    /// Narrow to an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BencodeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Narrow to a raw byte string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BencodeValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Narrow to a UTF-8 string view of a byte string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BencodeValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Narrow to a list
    pub fn as_list(&self) -> Option<&[BencodeValue]> {
        match self {
            BencodeValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Narrow to a dictionary
    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BencodeValue>> {
        match self {
            BencodeValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Build a byte-string value from anything byte-like
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        BencodeValue::Bytes(b.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_accessors() {
        let int = BencodeValue::Integer(42);
        assert_eq!(int.as_integer(), Some(42));
        assert!(int.as_bytes().is_none());
        assert!(int.as_dict().is_none());

        let bytes = BencodeValue::bytes(&b"spam"[..]);
        assert_eq!(bytes.as_bytes(), Some(b"spam".as_ref()));
        assert_eq!(bytes.as_str(), Some("spam"));
        assert!(bytes.as_integer().is_none());

        let list = BencodeValue::List(vec![BencodeValue::Integer(1)]);
        assert_eq!(list.as_list().map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_as_str_rejects_non_utf8() {
        let bytes = BencodeValue::bytes(vec![0xff, 0xfe]);
        assert!(bytes.as_str().is_none());
        assert!(bytes.as_bytes().is_some());
    }
}
