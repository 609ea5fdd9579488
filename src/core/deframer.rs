//! # Stream Deframer
//!
//! Incremental extraction of length-prefixed frames from a growable buffer.
//!
//! A [`ReadBuffer`] accumulates whatever the transport delivers, however it
//! was fragmented, and the drain loop emits every complete frame in arrival
//! order. Partial frames persist across deliveries until their remaining
//! bytes arrive.
//!
//! ## Algorithm
//! 1. **Accumulate**: double the buffer until the delivery fits, then append.
//! 2. **Drain**: while at least a header is buffered, read the declared
//!    length `L`; `L < 2` is a fatal protocol violation, `L > used` means the
//!    frame is incomplete, otherwise extract `[0, L)`, decrypt the payload in
//!    place, hand the frame to the sink, and move `[L, used)` to the front.
//!
//! The compaction step uses `copy_within`, which is overlap-safe; a naive
//! non-overlapping copy corrupts the buffer whenever the remainder is longer
//! than the extracted frame.

use tracing::error;

use crate::core::frame::{peek_len, HEADER_LEN, MIN_FRAME_LEN};
use crate::error::{FramingError, Result};
use crate::utils::crypto::FrameCipher;

/// Default capacity of a fresh per-connection read buffer.
pub const DEFAULT_READ_CAPACITY: usize = 64 * 1024;

/// Growable accumulation buffer for one byte stream.
///
/// `buf.len()` is the capacity region; `used` counts the
/// buffered-but-unconsumed bytes at the front. The invariant
/// `used <= buf.len()` holds at all times: growth always precedes any write.
pub struct ReadBuffer {
    buf: Vec<u8>,
    used: usize,
    limit: Option<usize>,
}

impl ReadBuffer {
    /// Create a buffer with the given initial capacity and no growth ceiling.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, None)
    }

    /// Create a buffer with an optional ceiling on total growth.
    ///
    /// With `limit: None` the buffer doubles without bound, matching the
    /// behavior this layer was specified against; setting a limit turns a
    /// runaway peer into a connection-local error instead of memory
    /// exhaustion.
    pub fn with_limits(capacity: usize, limit: Option<usize>) -> Self {
        Self {
            buf: vec![0; capacity.max(MIN_FRAME_LEN)],
            used: 0,
            limit,
        }
    }

    /// Count of buffered-but-unconsumed bytes.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Current capacity of the buffer region.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Append a delivery, doubling the buffer as needed to fit it.
    pub fn accumulate(&mut self, data: &[u8]) -> Result<()> {
        let needed = self.used + data.len();
        if let Some(limit) = self.limit {
            if needed > limit {
                return Err(FramingError::BufferLimit { needed, limit });
            }
        }

        while needed > self.buf.len() {
            self.buf.resize(self.buf.len() * 2, 0);
        }

        self.buf[self.used..needed].copy_from_slice(data);
        self.used = needed;
        Ok(())
    }

    /// Drain every complete frame currently buffered, in arrival order.
    ///
    /// Each extracted frame has its payload (bytes `[2, L)`) decrypted in
    /// place before being handed to `sink`. Returns the number of frames
    /// emitted, or an error on a malformed header, in which case the
    /// connection must be torn down and whatever remains in the buffer
    /// discarded with it.
    pub fn drain<F>(&mut self, cipher: &dyn FrameCipher, mut sink: F) -> Result<usize>
    where
        F: FnMut(Vec<u8>),
    {
        let mut emitted = 0;

        while self.used >= HEADER_LEN {
            let frame_len = peek_len(&self.buf);
            if frame_len < MIN_FRAME_LEN {
                return Err(FramingError::BadFrameLength(frame_len as u16));
            }

            // Frame not complete yet; keep everything for the next delivery.
            if frame_len > self.used {
                break;
            }

            let mut frame = self.buf[..frame_len].to_vec();
            cipher.decrypt_in_place(&mut frame[HEADER_LEN..]);
            sink(frame);

            // Overlap-safe move of the remainder to the front.
            self.buf.copy_within(frame_len..self.used, 0);
            self.used = match self.used.checked_sub(frame_len) {
                Some(rest) => rest,
                None => {
                    error!(
                        frame_len,
                        buffered = self.used,
                        "read-buffer accounting underflow"
                    );
                    return Err(FramingError::BufferAccounting {
                        frame_len,
                        buffered: self.used,
                    });
                }
            };

            emitted += 1;
        }

        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::encode_frame;
    use crate::utils::crypto::{ChaChaFrameCipher, PlaintextCipher};

    fn collect(buf: &mut ReadBuffer, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut frames = Vec::new();
        buf.accumulate(data)?;
        buf.drain(&PlaintextCipher, |f| frames.push(f))?;
        Ok(frames)
    }

    #[test]
    fn test_single_frame_single_delivery() {
        let mut buf = ReadBuffer::with_capacity(16);
        let frames = collect(&mut buf, &[0x05, 0x00, 1, 2, 3]).unwrap();
        assert_eq!(frames, vec![vec![0x05, 0x00, 1, 2, 3]]);
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut buf = ReadBuffer::with_capacity(16);
        let frames = collect(&mut buf, &[0x02, 0x00]).unwrap();
        assert_eq!(frames, vec![vec![0x02, 0x00]]);
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_split_header_then_payload() {
        // The concrete scenario: [0x05, 0x00, b1] then [b2, b3].
        let mut buf = ReadBuffer::with_capacity(16);
        let frames = collect(&mut buf, &[0x05, 0x00, 0xAA]).unwrap();
        assert!(frames.is_empty());
        assert_eq!(buf.used(), 3);

        let frames = collect(&mut buf, &[0xBB, 0xCC]).unwrap();
        assert_eq!(frames, vec![vec![0x05, 0x00, 0xAA, 0xBB, 0xCC]]);
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_multiple_frames_one_delivery_preserve_order() {
        let mut buf = ReadBuffer::with_capacity(16);
        let mut wire = vec![0x03, 0x00, 1];
        wire.extend_from_slice(&[0x04, 0x00, 2, 3]);
        wire.extend_from_slice(&[0x02, 0x00]);

        let frames = collect(&mut buf, &wire).unwrap();
        assert_eq!(
            frames,
            vec![vec![0x03, 0x00, 1], vec![0x04, 0x00, 2, 3], vec![0x02, 0x00]]
        );
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_compaction_keeps_partial_successor_intact() {
        // Frame A followed by a partial B; draining A must leave B's prefix
        // at offset 0, byte for byte.
        let mut buf = ReadBuffer::with_capacity(16);
        let mut wire = vec![0x03, 0x00, 0x11]; // complete A
        wire.extend_from_slice(&[0x06, 0x00, 0x21, 0x22]); // B missing 2 bytes

        let frames = collect(&mut buf, &wire).unwrap();
        assert_eq!(frames, vec![vec![0x03, 0x00, 0x11]]);
        assert_eq!(buf.used(), 4);

        let frames = collect(&mut buf, &[0x23, 0x24]).unwrap();
        assert_eq!(frames, vec![vec![0x06, 0x00, 0x21, 0x22, 0x23, 0x24]]);
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_growth_past_initial_capacity() {
        let mut buf = ReadBuffer::with_capacity(4);
        let payload: Vec<u8> = (0..200).map(|i| i as u8).collect();
        let mut wire = vec![(payload.len() as u16 + 2) as u8, 0x00];
        wire.extend_from_slice(&payload);

        // Deliver in 7-byte chunks across the capacity boundary.
        let mut frames = Vec::new();
        for chunk in wire.chunks(7) {
            buf.accumulate(chunk).unwrap();
            buf.drain(&PlaintextCipher, |f| frames.push(f)).unwrap();
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][2..], &payload[..]);
        assert!(buf.capacity() >= wire.len());
        assert_eq!(buf.used(), 0);
    }

    #[test]
    fn test_bad_header_zero_length() {
        let mut buf = ReadBuffer::with_capacity(16);
        buf.accumulate(&[0x00, 0x00, 0x09, 0x00]).unwrap();
        let result = buf.drain(&PlaintextCipher, |_| panic!("no frame expected"));
        assert!(matches!(result, Err(FramingError::BadFrameLength(0))));
    }

    #[test]
    fn test_bad_header_length_one() {
        let mut buf = ReadBuffer::with_capacity(16);
        buf.accumulate(&[0x01, 0x00]).unwrap();
        let result = buf.drain(&PlaintextCipher, |_| panic!("no frame expected"));
        assert!(matches!(result, Err(FramingError::BadFrameLength(1))));
    }

    #[test]
    fn test_buffer_limit_enforced() {
        let mut buf = ReadBuffer::with_limits(4, Some(8));
        let result = buf.accumulate(&[0u8; 9]);
        assert!(matches!(
            result,
            Err(FramingError::BufferLimit { needed: 9, limit: 8 })
        ));
    }

    #[test]
    fn test_decrypts_payload_in_place() {
        let cipher = ChaChaFrameCipher::new([7u8; 32]);
        let frame = encode_frame(b"secret", &cipher).unwrap();
        assert_ne!(&frame[2..], b"secret");

        let mut buf = ReadBuffer::with_capacity(16);
        buf.accumulate(&frame).unwrap();

        let mut frames = Vec::new();
        buf.drain(&cipher, |f| frames.push(f)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][2..], b"secret");
    }
}
