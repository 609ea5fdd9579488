//! Deframer properties: ordering, chunking, growth, compaction, and
//! malformed input, exercised through the public buffer API.

use framelink::core::deframer::ReadBuffer;
use framelink::core::frame::encode_frame;
use framelink::error::FramingError;
use framelink::utils::{ChaChaFrameCipher, FrameCipher, PlaintextCipher};

/// Serialize a run of payloads into one contiguous wire image.
fn wire_image(payloads: &[&[u8]], cipher: &dyn FrameCipher) -> Vec<u8> {
    let mut wire = Vec::new();
    for payload in payloads {
        wire.extend_from_slice(&encode_frame(payload, cipher).expect("encode"));
    }
    wire
}

/// Drive a wire image through a buffer in fixed-size chunks and collect the
/// dispatched payloads.
fn deliver_chunked(
    buf: &mut ReadBuffer,
    wire: &[u8],
    chunk_size: usize,
    cipher: &dyn FrameCipher,
) -> Vec<Vec<u8>> {
    let mut payloads = Vec::new();
    for chunk in wire.chunks(chunk_size) {
        buf.accumulate(chunk).expect("accumulate");
        buf.drain(cipher, |frame| payloads.push(frame[2..].to_vec()))
            .expect("drain");
    }
    payloads
}

// ============================================================================
// ORDERING & COMPLETENESS
// ============================================================================

#[test]
fn test_frames_arrive_in_order_exactly_once() {
    let expected: Vec<&[u8]> = vec![b"first", b"second", b"", b"fourth frame"];
    let wire = wire_image(&expected, &PlaintextCipher);

    // Every chunk size from single bytes up to the whole image must yield
    // the same payload sequence.
    for chunk_size in 1..=wire.len() {
        let mut buf = ReadBuffer::with_capacity(8);
        let payloads = deliver_chunked(&mut buf, &wire, chunk_size, &PlaintextCipher);

        assert_eq!(payloads.len(), expected.len(), "chunk size {chunk_size}");
        for (got, want) in payloads.iter().zip(&expected) {
            assert_eq!(got.as_slice(), *want, "chunk size {chunk_size}");
        }
        assert_eq!(buf.used(), 0, "chunk size {chunk_size}");
    }
}

#[test]
fn test_pipelined_frames_drain_in_one_delivery() {
    let wire = wire_image(&[b"a", b"bb", b"ccc"], &PlaintextCipher);
    let mut buf = ReadBuffer::with_capacity(64);

    let mut count = 0;
    buf.accumulate(&wire).unwrap();
    let emitted = buf.drain(&PlaintextCipher, |_| count += 1).unwrap();

    assert_eq!(emitted, 3);
    assert_eq!(count, 3);
    assert_eq!(buf.used(), 0);
}

#[test]
fn test_concrete_split_header_scenario() {
    // Header [0x05, 0x00] + payload [b1, b2, b3], delivered as
    // [0x05, 0x00, b1] then [b2, b3].
    let mut buf = ReadBuffer::with_capacity(16);
    let mut payloads = Vec::new();

    buf.accumulate(&[0x05, 0x00, 0x01]).unwrap();
    buf.drain(&PlaintextCipher, |f| payloads.push(f)).unwrap();
    assert!(payloads.is_empty());

    buf.accumulate(&[0x02, 0x03]).unwrap();
    buf.drain(&PlaintextCipher, |f| payloads.push(f)).unwrap();

    assert_eq!(payloads, vec![vec![0x05, 0x00, 0x01, 0x02, 0x03]]);
    assert_eq!(buf.used(), 0);
}

// ============================================================================
// GROWTH
// ============================================================================

#[test]
fn test_frame_larger_than_initial_capacity() {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let wire = wire_image(&[&payload], &PlaintextCipher);

    for chunk_size in [1, 3, 64, 4096, wire.len()] {
        let mut buf = ReadBuffer::with_capacity(32);
        let payloads = deliver_chunked(&mut buf, &wire, chunk_size, &PlaintextCipher);

        assert_eq!(payloads.len(), 1, "chunk size {chunk_size}");
        assert_eq!(payloads[0], payload, "chunk size {chunk_size}");
        assert_eq!(buf.used(), 0);
        assert!(buf.capacity() >= wire.len());
    }
}

#[test]
fn test_growth_limit_rejects_runaway_stream() {
    let mut buf = ReadBuffer::with_limits(16, Some(64));

    // A stream that never completes a frame must hit the ceiling instead of
    // growing forever.
    let mut result = Ok(());
    for _ in 0..16 {
        result = buf.accumulate(&[0xFF; 8]);
        if result.is_err() {
            break;
        }
    }

    assert!(matches!(result, Err(FramingError::BufferLimit { .. })));
}

// ============================================================================
// MALFORMED HEADERS
// ============================================================================

#[test]
fn test_zero_length_header_dispatches_nothing() {
    let mut buf = ReadBuffer::with_capacity(16);
    // Bad header followed by what would otherwise be a valid frame: nothing
    // after the violation may be processed.
    buf.accumulate(&[0x00, 0x00, 0x03, 0x00, 0xAA]).unwrap();

    let mut dispatched = 0;
    let result = buf.drain(&PlaintextCipher, |_| dispatched += 1);

    assert!(matches!(result, Err(FramingError::BadFrameLength(0))));
    assert_eq!(dispatched, 0);
}

#[test]
fn test_length_one_header_is_fatal() {
    let mut buf = ReadBuffer::with_capacity(16);
    buf.accumulate(&[0x01, 0x00]).unwrap();

    let result = buf.drain(&PlaintextCipher, |_| panic!("no dispatch expected"));
    assert!(matches!(result, Err(FramingError::BadFrameLength(1))));
}

#[test]
fn test_violation_after_valid_frames() {
    let mut wire = wire_image(&[b"ok1", b"ok2"], &PlaintextCipher);
    wire.extend_from_slice(&[0x01, 0x00]); // then a violation

    let mut buf = ReadBuffer::with_capacity(64);
    buf.accumulate(&wire).unwrap();

    let mut dispatched = 0;
    let result = buf.drain(&PlaintextCipher, |_| dispatched += 1);

    // The two good frames drain first; the bad header then kills the
    // connection.
    assert_eq!(dispatched, 2);
    assert!(matches!(result, Err(FramingError::BadFrameLength(1))));
}

// ============================================================================
// COMPACTION
// ============================================================================

#[test]
fn test_partial_successor_survives_compaction() {
    let frame_a = encode_frame(b"frame a", &PlaintextCipher).unwrap();
    let frame_b = encode_frame(b"a considerably longer frame b", &PlaintextCipher).unwrap();

    // Deliver all of A plus a prefix of B that is longer than A, so the
    // compaction move has overlapping source and destination ranges.
    let split = frame_a.len() + 12;
    let mut wire = frame_a.to_vec();
    wire.extend_from_slice(&frame_b);

    let mut buf = ReadBuffer::with_capacity(64);
    let mut payloads = Vec::new();

    buf.accumulate(&wire[..split]).unwrap();
    buf.drain(&PlaintextCipher, |f| payloads.push(f[2..].to_vec()))
        .unwrap();
    assert_eq!(payloads, vec![b"frame a".to_vec()]);
    assert_eq!(buf.used(), 12);

    buf.accumulate(&wire[split..]).unwrap();
    buf.drain(&PlaintextCipher, |f| payloads.push(f[2..].to_vec()))
        .unwrap();
    assert_eq!(payloads[1], b"a considerably longer frame b".to_vec());
    assert_eq!(buf.used(), 0);
}

// ============================================================================
// ENCRYPTION
// ============================================================================

#[test]
fn test_encrypted_frames_roundtrip_across_chunkings() {
    let cipher = ChaChaFrameCipher::new([0x5A; 32]);
    let expected: Vec<&[u8]> = vec![b"alpha", b"beta", b"gamma"];
    let wire = wire_image(&expected, &cipher);

    for chunk_size in [1, 2, 5, wire.len()] {
        let mut buf = ReadBuffer::with_capacity(8);
        let payloads = deliver_chunked(&mut buf, &wire, chunk_size, &cipher);

        assert_eq!(payloads.len(), 3, "chunk size {chunk_size}");
        for (got, want) in payloads.iter().zip(&expected) {
            assert_eq!(got.as_slice(), *want);
        }
    }
}

#[test]
fn test_ciphertext_differs_from_plaintext_on_wire() {
    let cipher = ChaChaFrameCipher::new([0x5A; 32]);
    let frame = encode_frame(b"visible?", &cipher).unwrap();
    assert_ne!(&frame[2..], b"visible?");
}
