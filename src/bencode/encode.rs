//! Bencode encoder
//!
//! Produces canonical bencode: no leading zeros on integers, dictionary
//! pairs emitted in ascending raw-byte key order. Any other key order would
//! change the byte stream and therefore the SHA-1 info-hash, so dictionary
//! ordering here is load-bearing for tracker and peer interop.

use crate::bencode::value::BencodeValue;

/// Encode a value to canonical bencode bytes
pub fn encode(value: &BencodeValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

/// Encode a value, appending to an existing buffer
pub fn encode_into(value: &BencodeValue, out: &mut Vec<u8>) {
    match value {
        BencodeValue::Integer(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
            out.push(b'e');
        }
        BencodeValue::Bytes(b) => {
            out.extend_from_slice(b.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(b);
        }
        BencodeValue::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        BencodeValue::Dict(entries) => {
            out.push(b'd');
            // BTreeMap iteration is already ascending by raw key bytes
            for (key, val) in entries {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(val, out);
            }
            out.push(b'e');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::decode::decode;
    use std::collections::BTreeMap;

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode(&BencodeValue::Integer(42)), b"i42e");
        assert_eq!(encode(&BencodeValue::Integer(0)), b"i0e");
        assert_eq!(encode(&BencodeValue::Integer(-999)), b"i-999e");
    }

    #[test]
    fn test_encode_strings() {
        assert_eq!(encode(&BencodeValue::bytes(&b"spam"[..])), b"4:spam");
        assert_eq!(encode(&BencodeValue::bytes(&b""[..])), b"0:");
    }

    #[test]
    fn test_encode_list() {
        let list = BencodeValue::List(vec![
            BencodeValue::bytes(&b"hello"[..]),
            BencodeValue::Integer(52),
        ]);
        assert_eq!(encode(&list), b"l5:helloi52ee");
        assert_eq!(encode(&BencodeValue::List(vec![])), b"le");
    }

    #[test]
    fn test_encode_dict_sorted_keys() {
        let mut entries = BTreeMap::new();
        // Inserted out of order on purpose
        entries.insert(b"zebra".to_vec(), BencodeValue::Integer(1));
        entries.insert(b"apple".to_vec(), BencodeValue::Integer(2));
        let encoded = encode(&BencodeValue::Dict(entries));
        assert_eq!(encoded, b"d5:applei2e5:zebrai1ee");
    }

    #[test]
    fn test_roundtrip() {
        let mut entries = BTreeMap::new();
        entries.insert(b"foo".to_vec(), BencodeValue::bytes(&b"bar"[..]));
        entries.insert(
            b"nested".to_vec(),
            BencodeValue::List(vec![
                BencodeValue::Integer(-7),
                BencodeValue::Bytes(vec![0x00, 0xff]),
            ]),
        );
        let value = BencodeValue::Dict(entries);

        let encoded = encode(&value);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_roundtrip_normalizes_input_key_order() {
        // Unsorted on the wire; decode then re-encode yields canonical order
        let decoded = decode(b"d1:bi1e1:ai2ee").unwrap();
        assert_eq!(encode(&decoded), b"d1:ai2e1:bi1ee");
    }
}
