//! Bencode decoder
//!
//! Cursor-driven recursive parser over a byte buffer. Every read is bounds
//! checked: running off the end of the buffer is a `TruncatedInput` error,
//! never a panic.

use std::collections::BTreeMap;

use crate::bencode::value::BencodeValue;
use crate::error::TorrentError;

/// Maximum list/dict nesting accepted before the parser bails out.
/// Crafted deeply-nested input would otherwise exhaust the stack.
const MAX_DEPTH: usize = 64;

/// Decode a single bencode value from the start of `input`.
///
/// Trailing bytes after the value are ignored by this call.
pub fn decode(input: &[u8]) -> Result<BencodeValue, TorrentError> {
    let mut decoder = Decoder::new(input);
    decoder.parse()
}

/// Incremental bencode decoder over a borrowed buffer
pub struct Decoder<'a> {
    input: &'a [u8],
    cursor: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, cursor: 0 }
    }

    /// Byte offset of the next unconsumed byte
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Parse exactly one value starting at the cursor, advancing past it
    pub fn parse(&mut self) -> Result<BencodeValue, TorrentError> {
        self.parse_value(0)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.cursor).copied()
    }

    fn parse_value(&mut self, depth: usize) -> Result<BencodeValue, TorrentError> {
        if depth > MAX_DEPTH {
            return Err(TorrentError::malformed_input_at(
                format!("nesting deeper than {} levels", MAX_DEPTH),
                self.cursor,
            ));
        }

        match self.peek() {
            Some(b'0'..=b'9') => self.parse_str().map(BencodeValue::Bytes),
            Some(b'i') => self.parse_int().map(BencodeValue::Integer),
            Some(b'l') => self.parse_list(depth),
            Some(b'd') => self.parse_dict(depth),
            Some(other) => Err(TorrentError::malformed_input_at(
                format!("unsupported value marker: 0x{:02x}", other),
                self.cursor,
            )),
            None => Err(TorrentError::truncated_input_at(
                "expected a value, found end of input",
                self.cursor,
            )),
        }
    }

    /// `<len>:<bytes>`; the declared length governs, extra input is left alone
    fn parse_str(&mut self) -> Result<Vec<u8>, TorrentError> {
        let div = self.input[self.cursor..]
            .iter()
            .position(|&b| b == b':')
            .map(|p| self.cursor + p)
            .ok_or_else(|| {
                TorrentError::malformed_input_at("unterminated string length prefix", self.cursor)
            })?;

        let prefix = &self.input[self.cursor..div];
        let length: usize = std::str::from_utf8(prefix)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                TorrentError::malformed_input_at("string length prefix is not a number", self.cursor)
            })?;

        let start = div + 1;
        let end = start.checked_add(length).filter(|&e| e <= self.input.len()).ok_or_else(|| {
            TorrentError::truncated_input_at(
                format!("string declares {} bytes but fewer remain", length),
                start,
            )
        })?;

        self.cursor = end;
        Ok(self.input[start..end].to_vec())
    }

    /// `i<decimal>e`. `i-0e` and `i0000e` normalize to 0; overflow and
    /// non-digit text (including a fractional point) are malformed
    fn parse_int(&mut self) -> Result<i64, TorrentError> {
        let body_start = self.cursor + 1;
        let end = self.input[body_start..]
            .iter()
            .position(|&b| b == b'e')
            .map(|p| body_start + p)
            .ok_or_else(|| {
                TorrentError::truncated_input_at("unterminated integer", self.cursor)
            })?;

        let text = std::str::from_utf8(&self.input[body_start..end]).map_err(|_| {
            TorrentError::malformed_input_at("integer contains non-ASCII bytes", body_start)
        })?;
        let value: i64 = text.parse().map_err(|_| {
            TorrentError::malformed_input_at(
                format!("integer does not parse: {:?}", text),
                body_start,
            )
        })?;

        self.cursor = end + 1;
        Ok(value)
    }

    fn parse_list(&mut self, depth: usize) -> Result<BencodeValue, TorrentError> {
        self.cursor += 1;
        let mut items = Vec::new();

        loop {
            match self.peek() {
                Some(b'e') => {
                    self.cursor += 1;
                    return Ok(BencodeValue::List(items));
                }
                Some(_) => items.push(self.parse_value(depth + 1)?),
                None => {
                    return Err(TorrentError::truncated_input_at(
                        "unterminated list",
                        self.cursor,
                    ))
                }
            }
        }
    }

    /// Keys need not arrive sorted; duplicates resolve last-write-wins
    fn parse_dict(&mut self, depth: usize) -> Result<BencodeValue, TorrentError> {
        self.cursor += 1;
        let mut entries = BTreeMap::new();

        loop {
            match self.peek() {
                Some(b'e') => {
                    self.cursor += 1;
                    return Ok(BencodeValue::Dict(entries));
                }
                Some(b'0'..=b'9') => {
                    let key = self.parse_str()?;
                    let value = self.parse_value(depth + 1)?;
                    entries.insert(key, value);
                }
                Some(other) => {
                    return Err(TorrentError::malformed_input_at(
                        format!("dictionary key must be a byte string, found 0x{:02x}", other),
                        self.cursor,
                    ))
                }
                None => {
                    return Err(TorrentError::truncated_input_at(
                        "unterminated dictionary",
                        self.cursor,
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(s: &str) -> BencodeValue {
        BencodeValue::bytes(s.as_bytes())
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(decode(b"i42e").unwrap(), BencodeValue::Integer(42));
        assert_eq!(decode(b"i-999e").unwrap(), BencodeValue::Integer(-999));
        assert_eq!(decode(b"i0000e").unwrap(), BencodeValue::Integer(0));
        assert_eq!(decode(b"i-0e").unwrap(), BencodeValue::Integer(0));
    }

    #[test]
    fn test_decode_integer_rejects_fraction_and_overflow() {
        assert!(matches!(
            decode(b"i0.9e"),
            Err(TorrentError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode(b"i42.0e"),
            Err(TorrentError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode(b"i999999999999999999999999e"),
            Err(TorrentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_integer_unterminated() {
        assert!(matches!(
            decode(b"i42"),
            Err(TorrentError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_decode_strings() {
        assert_eq!(decode(b"2:la").unwrap(), bytes("la"));
        assert_eq!(decode(b"4:blab").unwrap(), bytes("blab"));
        // Declared length 0: the rest of the buffer is trailing input
        assert_eq!(decode(b"0:asd").unwrap(), bytes(""));
        // Only the declared length is consumed
        assert_eq!(decode(b"2:helloimtoolong").unwrap(), bytes("he"));
    }

    #[test]
    fn test_decode_string_errors() {
        assert!(matches!(
            decode(b"5:ab"),
            Err(TorrentError::TruncatedInput { .. })
        ));
        assert!(matches!(
            decode(b"12345"),
            Err(TorrentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_binary_string() {
        let input = [b'3', b':', 0xde, 0xad, 0xbe];
        assert_eq!(
            decode(&input).unwrap(),
            BencodeValue::Bytes(vec![0xde, 0xad, 0xbe])
        );
    }

    #[test]
    fn test_decode_lists() {
        assert_eq!(decode(b"le").unwrap(), BencodeValue::List(vec![]));
        assert_eq!(
            decode(b"li1ei2ei3ee").unwrap(),
            BencodeValue::List(vec![
                BencodeValue::Integer(1),
                BencodeValue::Integer(2),
                BencodeValue::Integer(3),
            ])
        );
        assert_eq!(
            decode(b"l5:helloi52ee").unwrap(),
            BencodeValue::List(vec![bytes("hello"), BencodeValue::Integer(52)])
        );
        assert_eq!(
            decode(b"ll5:helloi42eee").unwrap(),
            BencodeValue::List(vec![BencodeValue::List(vec![
                bytes("hello"),
                BencodeValue::Integer(42),
            ])])
        );
        assert_eq!(
            decode(b"l0:1:ae").unwrap(),
            BencodeValue::List(vec![bytes(""), bytes("a")])
        );
    }

    #[test]
    fn test_decode_list_errors() {
        assert!(matches!(
            decode(b"li0.4ee"),
            Err(TorrentError::MalformedInput { .. })
        ));
        assert!(matches!(
            decode(b"l5:helloi52e"),
            Err(TorrentError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_decode_dict() {
        let value = decode(b"d3:foo3:bar5:helloi52ee").unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(b"foo".as_slice()), Some(&bytes("bar")));
        assert_eq!(
            dict.get(b"hello".as_slice()),
            Some(&BencodeValue::Integer(52))
        );
    }

    #[test]
    fn test_decode_dict_unsorted_keys_tolerated() {
        // "zz" before "aa" violates canonical order; the parser accepts it
        let value = decode(b"d2:zzi1e2:aai2ee").unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.get(b"aa".as_slice()), Some(&BencodeValue::Integer(2)));
        assert_eq!(dict.get(b"zz".as_slice()), Some(&BencodeValue::Integer(1)));
    }

    #[test]
    fn test_decode_dict_duplicate_key_last_wins() {
        let value = decode(b"d1:ai1e1:ai2ee").unwrap();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(b"a".as_slice()), Some(&BencodeValue::Integer(2)));
    }

    #[test]
    fn test_decode_dict_errors() {
        assert!(matches!(
            decode(b"d3:foo"),
            Err(TorrentError::TruncatedInput { .. })
        ));
        // Integer key is not a byte string
        assert!(matches!(
            decode(b"di1ei2ee"),
            Err(TorrentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(matches!(
            decode(b""),
            Err(TorrentError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_marker() {
        assert!(matches!(
            decode(b"x42e"),
            Err(TorrentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_decode_depth_limit() {
        let mut input = Vec::new();
        input.extend(std::iter::repeat(b'l').take(MAX_DEPTH + 2));
        input.extend(std::iter::repeat(b'e').take(MAX_DEPTH + 2));
        assert!(matches!(
            decode(&input),
            Err(TorrentError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_cursor_advances_past_value() {
        let mut decoder = Decoder::new(b"i42e5:after");
        decoder.parse().unwrap();
        assert_eq!(decoder.cursor(), 4);
        assert_eq!(decoder.parse().unwrap(), bytes("after"));
        assert_eq!(decoder.cursor(), 11);
    }
}
