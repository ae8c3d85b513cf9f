//! Order-preserving byte encoding for composite keys.
//!
//! A field is written as a run of 9-byte blocks: 8 payload bytes (zero padded in the last block)
//! followed by a marker. Every block but the last carries the continuation marker `9`; the last
//! one carries the number of payload bytes it really holds, `0..=8`. An empty field is one block
//! of zeros with marker `0`.
//!
//! Comparing two encodings byte by byte orders them like comparing the field lists
//! lexicographically, so concatenated fields can be used directly as B+Tree keys.

use crate::storage::error::{StorageError, StorageResult};

const BLOCK_PAYLOAD_SIZE: usize = 8;
const BLOCK_SIZE: usize = BLOCK_PAYLOAD_SIZE + 1;
/// Greater than every terminal marker, so a longer field sorts after its own prefix.
const CONTINUATION_MARKER: u8 = BLOCK_SIZE as u8;

/// Encoded size of one field of `len` bytes.
pub fn encoded_size(len: usize) -> usize {
    let blocks = if len == 0 {
        1
    } else {
        (len + BLOCK_PAYLOAD_SIZE - 1) / BLOCK_PAYLOAD_SIZE
    };
    blocks * BLOCK_SIZE
}

/// Appends the encoding of one field to `dst`.
pub fn encode_into(mut src: &[u8], dst: &mut Vec<u8>) {
    dst.reserve(encoded_size(src.len()));
    loop {
        let copy_len = src.len().min(BLOCK_PAYLOAD_SIZE);
        dst.extend_from_slice(&src[..copy_len]);
        src = &src[copy_len..];
        if src.is_empty() {
            dst.resize(dst.len() + BLOCK_PAYLOAD_SIZE - copy_len, 0);
            dst.push(copy_len as u8);
            return;
        }
        dst.push(CONTINUATION_MARKER);
    }
}

/// Decodes one field from the front of `src`, advancing it past the consumed blocks.
pub fn decode_one(src: &mut &[u8], dst: &mut Vec<u8>) -> StorageResult<()> {
    loop {
        if src.len() < BLOCK_SIZE {
            return Err(StorageError::InvalidEncoding(format!(
                "truncated block: {} bytes left",
                src.len()
            )));
        }
        let marker = src[BLOCK_PAYLOAD_SIZE];
        if marker > CONTINUATION_MARKER {
            return Err(StorageError::InvalidEncoding(format!(
                "invalid block marker {}",
                marker
            )));
        }
        let len = (marker as usize).min(BLOCK_PAYLOAD_SIZE);
        dst.extend_from_slice(&src[..len]);
        *src = &src[BLOCK_SIZE..];
        if marker != CONTINUATION_MARKER {
            return Ok(());
        }
    }
}

/// Encodes a list of fields into one key.
pub fn encode<I, T>(fields: I) -> Vec<u8>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut bytes = Vec::new();
    for field in fields {
        encode_into(field.as_ref(), &mut bytes);
    }
    bytes
}

/// Splits a key produced by [`encode`] back into its fields.
pub fn decode(mut bytes: &[u8]) -> StorageResult<Vec<Vec<u8>>> {
    let mut fields = Vec::new();
    while !bytes.is_empty() {
        let mut field = Vec::new();
        decode_one(&mut bytes, &mut field)?;
        fields.push(field);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_block_layout() {
        assert_eq!(encode([b"abc"]), b"abc\0\0\0\0\0\x03".to_vec());
        assert_eq!(encode([b""]), vec![0u8; 9]);
        assert_eq!(encode([b"12345678"]), b"12345678\x08".to_vec());
        assert_eq!(
            encode([b"123456789"]),
            b"12345678\x099\0\0\0\0\0\0\0\x01".to_vec()
        );
    }

    #[test]
    fn test_encoded_size() {
        for len in [0, 1, 7, 8, 9, 16, 17] {
            let field = vec![0xFFu8; len];
            assert_eq!(encode([&field]).len(), encoded_size(len), "len {}", len);
        }
    }

    #[test]
    fn test_round_trip() {
        let cases: Vec<Vec<Vec<u8>>> = vec![
            vec![],
            vec![vec![]],
            vec![vec![], vec![]],
            vec![b"hello".to_vec(), b"world".to_vec()],
            vec![vec![0u8; 7], vec![0u8; 8], vec![0u8; 9]],
            vec![b"exactly16bytes!!".to_vec(), vec![]],
            vec![(0u8..=255).collect()],
        ];
        for fields in cases {
            assert_eq!(decode(&encode(&fields)).unwrap(), fields);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode(b"short"),
            Err(StorageError::InvalidEncoding(_))
        ));
        assert!(matches!(
            decode(b"12345678\x0a"),
            Err(StorageError::InvalidEncoding(_))
        ));
        // continuation with nothing after it
        assert!(matches!(
            decode(b"12345678\x09"),
            Err(StorageError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_prefix_orders_first() {
        assert!(encode([b"abc"]) < encode([b"abc\0"]));
        assert!(encode([b"12345678"]) < encode([b"123456780"]));
        assert!(encode([b""]) < encode([b"\0"]));
        assert!(encode([&b""[..], &b"b"[..]]) < encode([&b"\0"[..], &b""[..]]));
    }

    #[test]
    fn test_order_matches_field_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let random_fields = |rng: &mut StdRng| -> Vec<Vec<u8>> {
            (0..rng.gen_range(1..4))
                .map(|_| {
                    (0..rng.gen_range(0..20))
                        .map(|_| rng.gen_range(0..3u8))
                        .collect()
                })
                .collect()
        };

        for _ in 0..2000 {
            let a = random_fields(&mut rng);
            let b = random_fields(&mut rng);
            assert_eq!(
                encode(&a).cmp(&encode(&b)),
                a.cmp(&b),
                "{:?} vs {:?}",
                a,
                b
            );
            assert_eq!(decode(&encode(&a)).unwrap(), a);
        }
    }
}
