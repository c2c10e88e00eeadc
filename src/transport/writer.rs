//! Outbound half of the line transport.
//!
//! [`ChannelTransport`] satisfies the synchronous [`Transport`] contract by
//! queueing lines on a bounded channel; [`run_writer`] drains that channel
//! into an [`AsyncWrite`], appending the `\n` delimiter to each line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Transport;
use crate::{AppError, Result};

/// [`Transport`] that hands each outbound line to a writer task.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    /// Create the transport and the receiver [`run_writer`] consumes.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn write(&self, text: &str) -> Result<()> {
        self.tx.try_send(text.to_owned()).map_err(|err| match err {
            TrySendError::Full(_) => AppError::Transport("outbound queue full".into()),
            TrySendError::Closed(_) => AppError::Transport("connection closed".into()),
        })
    }
}

/// Writer task: serialises queued lines onto `sink`.
///
/// Exits when every [`ChannelTransport`] clone is dropped, or when `cancel`
/// fires. On cancellation the channel is closed and lines already queued
/// are still written before the task returns.
///
/// # Errors
///
/// Returns [`AppError::Io`] if a write or flush on `sink` fails. The
/// receiver is dropped with the task, so later sends fail with
/// "connection closed".
pub async fn run_writer<W>(
    mut sink: W,
    mut outbound_rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("writer: cancellation received, draining queue");
                break;
            }

            line = outbound_rx.recv() => {
                let Some(line) = line else {
                    debug!("writer: outbound channel closed, stopping");
                    return Ok(());
                };
                write_line(&mut sink, line).await?;
            }
        }
    }

    outbound_rx.close();
    let mut drained = 0_usize;
    while let Some(line) = outbound_rx.recv().await {
        write_line(&mut sink, line).await?;
        drained += 1;
    }
    debug!(drained, "writer: queue drained, stopping");
    Ok(())
}

async fn write_line<W>(sink: &mut W, line: String) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut bytes = line.into_bytes();
    bytes.push(b'\n');

    write_frame(sink, &bytes).await.inspect_err(|err| {
        warn!(error = %err, "writer: write failed");
    })
}

async fn write_frame<W>(sink: &mut W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    sink.write_all(bytes).await?;
    sink.flush().await?;
    Ok(())
}
