//! On-disk container framing: `hex(iv) || ciphertext`.
//!
//! The IV prefix is always 32 lowercase hex characters (16 raw bytes). There is
//! no length field; the ciphertext is everything after the prefix.

use crate::error::{AppError, Result};

/// Raw IV length in bytes
pub const IV_LEN: usize = 16;

/// Width of the hex-encoded IV prefix
pub const IV_HEX_LEN: usize = IV_LEN * 2;

/// Frame an IV and ciphertext into a single container blob.
pub fn wrap(iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Vec<u8> {
    let mut container = Vec::with_capacity(IV_HEX_LEN + ciphertext.len());
    container.extend_from_slice(hex::encode(iv).as_bytes());
    container.extend_from_slice(ciphertext);
    container
}

/// Split a container into its IV and ciphertext.
pub fn unwrap(container: &[u8]) -> Result<([u8; IV_LEN], &[u8])> {
    if container.len() < IV_HEX_LEN {
        return Err(AppError::MalformedContainer(format!(
            "container is {} bytes, shorter than the {} byte IV prefix",
            container.len(),
            IV_HEX_LEN
        )));
    }

    let (prefix, ciphertext) = container.split_at(IV_HEX_LEN);
    let mut iv = [0u8; IV_LEN];
    hex::decode_to_slice(prefix, &mut iv)
        .map_err(|e| AppError::MalformedContainer(format!("invalid IV prefix: {}", e)))?;

    Ok((iv, ciphertext))
}

/// Parse a stored `iv_hex` column value.
pub fn parse_iv_hex(iv_hex: &str) -> Result<[u8; IV_LEN]> {
    let mut iv = [0u8; IV_LEN];
    if iv_hex.len() != IV_HEX_LEN {
        return Err(AppError::MalformedContainer(format!(
            "stored IV has {} characters",
            iv_hex.len()
        )));
    }
    hex::decode_to_slice(iv_hex, &mut iv)
        .map_err(|e| AppError::MalformedContainer(format!("invalid stored IV: {}", e)))?;
    Ok(iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_prefixes_lowercase_hex_iv() {
        let iv: [u8; IV_LEN] = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        let container = wrap(&iv, &[1, 2, 3]);
        assert_eq!(&container[..IV_HEX_LEN], b"00112233445566778899aabbccddeeff");
        assert_eq!(&container[IV_HEX_LEN..], &[1, 2, 3]);
    }

    #[test]
    fn unwrap_splits_prefix_and_ciphertext() {
        let iv = [7u8; IV_LEN];
        let ciphertext = vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0xff];
        let container = wrap(&iv, &ciphertext);

        let (parsed_iv, parsed_ct) = unwrap(&container).unwrap();
        assert_eq!(parsed_iv, iv);
        assert_eq!(parsed_ct, ciphertext.as_slice());
    }

    #[test]
    fn unwrap_rejects_short_input() {
        let result = unwrap(&[b'a'; 10]);
        assert!(matches!(result, Err(AppError::MalformedContainer(_))));
    }

    #[test]
    fn unwrap_rejects_non_hex_prefix() {
        let mut container = vec![b'0'; IV_HEX_LEN + 16];
        container[5] = b'z';
        assert!(matches!(
            unwrap(&container),
            Err(AppError::MalformedContainer(_))
        ));
    }

    #[test]
    fn unwrap_accepts_prefix_only() {
        let container = b"0123456789abcdef0123456789ABCDEF";
        let (iv, ciphertext) = unwrap(container).unwrap();
        assert!(ciphertext.is_empty());
        assert_eq!(iv[0], 0x01);
        assert_eq!(iv[15], 0xef);
    }

    #[test]
    fn parse_iv_hex_requires_exact_width() {
        assert!(parse_iv_hex("00ff").is_err());
        assert_eq!(parse_iv_hex(&"ab".repeat(16)).unwrap(), [0xab; IV_LEN]);
    }
}
