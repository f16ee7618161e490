//! # Digest and Hex Helpers
//!
//! SHA-256 over byte slices and the lowercase hex codec used for handles,
//! ciphertexts and proofs on the wire.

use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// SHA-256 over the concatenation of `parts`.
pub fn sha256_bytes(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Encode bytes as lowercase hex without prefix.
pub fn hex_encode(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

/// Decode a hex string, with or without a `0x` prefix.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, ValidationError> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err(ValidationError::InvalidHex(format!(
            "odd length: {}",
            s.len()
        )));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            s.get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| ValidationError::InvalidHex(format!("invalid digit at position {i}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        let d = sha256_bytes(&[]);
        assert_eq!(
            hex_encode(&d),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn sha256_parts_concatenate() {
        assert_eq!(sha256_bytes(&[b"ab", b"c"]), sha256_bytes(&[b"abc"]));
    }

    #[test]
    fn hex_decode_valid() {
        assert_eq!(hex_decode("deadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(hex_decode("0x00ff").unwrap(), vec![0x00, 0xff]);
    }

    #[test]
    fn hex_decode_odd_length_fails() {
        assert!(hex_decode("abc").is_err());
    }

    #[test]
    fn hex_decode_invalid_chars_fails() {
        assert!(hex_decode("zzzz").is_err());
    }

    #[test]
    fn hex_decode_rejects_multibyte_chars() {
        assert!(hex_decode("éé").is_err());
    }

    #[test]
    fn hex_encode_matches_decode() {
        let bytes = vec![0u8, 1, 0x7f, 0x80, 0xff];
        assert_eq!(hex_decode(&hex_encode(&bytes)).unwrap(), bytes);
    }
}
