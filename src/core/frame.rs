//! Wire-format constants and frame header helpers.
//!
//! Every frame on the wire, in both directions, has the same layout:
//!
//! ```text
//! offset 0: u16, little-endian, total frame length L (includes these 2 bytes)
//! offset 2..L: payload, encrypted in place
//! ```
//!
//! The minimum valid `L` is 2: an empty payload is a legal frame. Because the
//! length prefix is a `u16`, no frame can exceed 65535 bytes total.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FramingError, Result};
use crate::utils::crypto::FrameCipher;

/// Size of the length prefix in bytes.
pub const HEADER_LEN: usize = 2;

/// Smallest total length a valid header may declare (header only, empty
/// payload).
pub const MIN_FRAME_LEN: usize = HEADER_LEN;

/// Largest total length the u16 prefix can describe.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Read the declared total length from the first two buffered bytes.
///
/// Callers must guarantee `buf.len() >= HEADER_LEN`.
#[inline]
pub fn peek_len(buf: &[u8]) -> usize {
    u16::from_le_bytes([buf[0], buf[1]]) as usize
}

/// Frame an already-serialized payload: length prefix, then the payload
/// encrypted in place.
///
/// Returns [`FramingError::OversizedFrame`] if the payload would push the
/// total past what the u16 prefix can describe.
pub fn encode_frame(payload: &[u8], cipher: &dyn FrameCipher) -> Result<Bytes> {
    let total = HEADER_LEN + payload.len();
    if total > MAX_FRAME_LEN {
        return Err(FramingError::OversizedFrame(total));
    }

    let mut frame = BytesMut::with_capacity(total);
    frame.put_u16_le(total as u16);
    frame.extend_from_slice(payload);
    cipher.encrypt_in_place(&mut frame[HEADER_LEN..]);

    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::PlaintextCipher;

    #[test]
    fn test_peek_len_little_endian() {
        assert_eq!(peek_len(&[0x05, 0x00]), 5);
        assert_eq!(peek_len(&[0x00, 0x01, 0xFF]), 256);
        assert_eq!(peek_len(&[0xFF, 0xFF]), 65535);
    }

    #[test]
    fn test_encode_frame_prefixes_total_length() {
        let frame = encode_frame(b"abc", &PlaintextCipher).expect("should encode");
        assert_eq!(&frame[..], &[0x05, 0x00, b'a', b'b', b'c']);
    }

    #[test]
    fn test_encode_frame_empty_payload() {
        let frame = encode_frame(b"", &PlaintextCipher).expect("should encode");
        assert_eq!(&frame[..], &[0x02, 0x00]);
    }

    #[test]
    fn test_encode_frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_FRAME_LEN]; // header pushes total past u16
        let result = encode_frame(&payload, &PlaintextCipher);
        assert!(matches!(result, Err(FramingError::OversizedFrame(_))));
    }
}
