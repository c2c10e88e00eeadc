//! Unit tests for the newline frame codec.
//!
//! Covers single and batched frames, partial delivery, the maximum frame
//! length and recovery after an oversize frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use devtools_link::transport::codec::{LineCodec, MAX_FRAME_BYTES};
use devtools_link::AppError;

// ── Decoding ────────────────────────────────────────────────────────────────

/// A complete line is returned without its trailing newline.
#[test]
fn single_frame_decodes() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":1,\"result\":{}}\n");

    let frame = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(frame, Some("{\"id\":1,\"result\":{}}".to_owned()));
}

/// Two frames in one buffer decode as two items.
#[test]
fn batched_frames_decode_separately() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(concat!(
        "{\"method\":\"Page.loadEventFired\"}\n",
        "{\"id\":2,\"result\":null}\n",
    ));

    let first = codec.decode(&mut buf).expect("first decode");
    let second = codec.decode(&mut buf).expect("second decode");
    let third = codec.decode(&mut buf).expect("third decode");

    assert_eq!(first.as_deref(), Some("{\"method\":\"Page.loadEventFired\"}"));
    assert_eq!(second.as_deref(), Some("{\"id\":2,\"result\":null}"));
    assert_eq!(third, None, "buffer must be exhausted");
}

/// A frame split across reads is buffered until the newline arrives.
#[test]
fn partial_frame_waits_for_newline() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":3,");

    assert_eq!(codec.decode(&mut buf).expect("partial decode"), None);

    buf.extend_from_slice(b"\"result\":{}}\n");
    assert_eq!(
        codec.decode(&mut buf).expect("completed decode").as_deref(),
        Some("{\"id\":3,\"result\":{}}")
    );
}

/// An oversize frame is reported as a codec error naming the limit.
#[test]
fn oversize_frame_is_codec_error() {
    let mut codec = LineCodec::with_max_length(16);
    let mut buf = BytesMut::from(format!("{}\n", "x".repeat(64)).as_str());

    let err = codec.decode(&mut buf).expect_err("oversize frame must fail");

    assert!(
        matches!(err, AppError::Codec(ref msg) if msg.contains("exceeded 16 bytes")),
        "unexpected error: {err}"
    );
}

/// After an oversize frame the codec resumes at the next line.
#[test]
fn codec_recovers_after_oversize_frame() {
    let mut codec = LineCodec::with_max_length(16);
    let mut buf = BytesMut::from(format!("{}\n{{\"id\":1}}\n", "x".repeat(64)).as_str());

    assert!(codec.decode(&mut buf).is_err());
    let mut next = codec.decode(&mut buf).expect("decode after discard");
    if next.is_none() {
        next = codec.decode(&mut buf).expect("decode after discard");
    }

    assert_eq!(next.as_deref(), Some("{\"id\":1}"));
}

/// A trailing unterminated frame is yielded at EOF.
#[test]
fn unterminated_frame_yields_at_eof() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":4,\"result\":1}");

    let frame = codec.decode_eof(&mut buf).expect("decode at eof");

    assert_eq!(frame.as_deref(), Some("{\"id\":4,\"result\":1}"));
}

// ── Encoding and limits ─────────────────────────────────────────────────────

#[test]
fn encode_appends_newline() {
    let mut codec = LineCodec::new();
    let mut dst = BytesMut::new();

    codec
        .encode("{\"id\":1}".to_owned(), &mut dst)
        .expect("encode must succeed");

    assert_eq!(&dst[..], b"{\"id\":1}\n");
}

#[test]
fn default_limit_is_one_mebibyte() {
    assert_eq!(MAX_FRAME_BYTES, 1_048_576);
    assert_eq!(LineCodec::default().max_length(), MAX_FRAME_BYTES);
    assert_eq!(LineCodec::with_max_length(512).max_length(), 512);
}
