//! Inbound half of the line transport.
//!
//! Drives a [`FramedRead`] over any [`AsyncRead`] and feeds every frame to
//! [`Client::handle_message`]. When the stream ends the connection is gone,
//! so the client is shut down and anything still in flight fails with a
//! shutdown error.

use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::codec::LineCodec;
use crate::{AppError, Client};

/// Why [`run_reader`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderExit {
    /// `cancel` fired; the client was left running.
    Cancelled,
    /// The stream reached EOF.
    Eof,
    /// The stream failed.
    Failed(String),
}

/// Reader task.
///
/// Oversize frames are logged and skipped. On EOF or an I/O error the client
/// is shut down before returning; on cancellation it is left alone.
pub async fn run_reader<R>(
    client: Client,
    source: R,
    max_frame_bytes: usize,
    cancel: CancellationToken,
) -> ReaderExit
where
    R: AsyncRead + Unpin + Send,
{
    let mut framed = FramedRead::new(source, LineCodec::with_max_length(max_frame_bytes));
    // `FramedRead` yields one `None` after a decode error, then reads more
    // bytes before decoding again.
    let mut resuming = false;

    let exit = loop {
        let item = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("reader: cancellation received, stopping");
                return ReaderExit::Cancelled;
            }
            item = framed.next() => item,
        };

        match item {
            None if resuming => resuming = false,
            None => {
                debug!("reader: EOF detected");
                break ReaderExit::Eof;
            }
            Some(Err(AppError::Codec(ref msg))) => {
                warn!(error = msg.as_str(), "reader: framing error, skipping frame");
                resuming = true;
            }
            Some(Err(e)) => {
                warn!(error = %e, "reader: stream error, stopping");
                break ReaderExit::Failed(e.to_string());
            }
            Some(Ok(frame)) => {
                resuming = false;
                client.handle_message(frame);
            }
        }
    };

    client.shutdown().await;
    exit
}
