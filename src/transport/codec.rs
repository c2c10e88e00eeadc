//! Newline-delimited frame codec.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum frame length so an
//! unterminated or oversized frame cannot exhaust memory.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};

use crate::{AppError, Result};

/// Default maximum frame length: 1 MiB.
pub const MAX_FRAME_BYTES: usize = 1_048_576;

/// Newline-delimited UTF-8 framing, one JSON envelope per line.
///
/// Oversize inbound frames produce [`AppError::Codec`] and are discarded up to
/// the next newline, so the stream stays usable. I/O errors map to
/// [`AppError::Io`].
#[derive(Debug)]
pub struct LineCodec {
    inner: LinesCodec,
    max_length: usize,
}

impl LineCodec {
    /// Codec with the default [`MAX_FRAME_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_FRAME_BYTES)
    }

    /// Codec with a custom frame limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_length),
            max_length,
        }
    }

    /// Configured frame limit.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn map_error(&self, e: LinesCodecError) -> AppError {
        match e {
            LinesCodecError::MaxLineLengthExceeded => AppError::Codec(format!(
                "frame too long: exceeded {} bytes",
                self.max_length
            )),
            LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode(src).map_err(|e| self.map_error(e))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.inner.decode_eof(src).map_err(|e| self.map_error(e))
    }
}

impl Encoder<String> for LineCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        // The frame limit is a decoder-side concern only.
        self.inner.encode(item, dst).map_err(|e| self.map_error(e))
    }
}
