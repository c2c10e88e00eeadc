//! Transport contract and a line-delimited stream adapter.
//!
//! The client only needs two things from a connection: a synchronous
//! [`Transport::write`] for outbound text, and someone calling
//! [`Client::handle_message`] for every inbound frame. Opening, framing and
//! reconnecting belong to the transport.
//!
//! [`attach`] provides one ready-made transport for newline-delimited JSON
//! over any async byte stream (child process stdio, a socket, or an in-memory
//! duplex in tests).
//!
//! Submodules:
//! - `codec`: newline framing with a maximum frame length.
//! - `reader`: feeds decoded frames to the client.
//! - `writer`: [`ChannelTransport`](writer::ChannelTransport) plus the task
//!   that writes its lines out.

pub mod codec;
pub mod reader;
pub mod writer;

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info_span, Instrument};

use self::reader::{run_reader, ReaderExit};
use self::writer::{run_writer, ChannelTransport};
use crate::config::ClientConfig;
use crate::{Client, Result};

/// Outbound half of a connection.
///
/// `write` must hand the whole text to the connection or fail; the client
/// serializes calls, so implementations need not guard against interleaving.
pub trait Transport: Send + Sync {
    /// Write one complete outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) with a
    /// diagnostic when the text could not be handed off.
    fn write(&self, text: &str) -> Result<()>;
}

impl<F> Transport for F
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn write(&self, text: &str) -> Result<()> {
        self(text)
    }
}

/// A client running over a line-delimited byte stream.
#[derive(Debug)]
pub struct LinkSession {
    client: Client,
    cancel: CancellationToken,
    reader: JoinHandle<ReaderExit>,
    writer: JoinHandle<Result<()>>,
}

/// Start a client that reads frames from `source` and writes to `sink`.
///
/// # Errors
///
/// Returns `AppError::Config` if `config` is invalid or no tokio runtime is
/// running.
pub fn attach<R, W>(source: R, sink: W, config: ClientConfig) -> Result<LinkSession>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    config.validate()?;
    let (transport, outbound_rx) = ChannelTransport::new(config.outbound_queue_capacity);
    let max_frame_bytes = config.max_frame_bytes;
    let client = Client::start(Arc::new(transport), config)?;
    let cancel = CancellationToken::new();

    let writer = tokio::spawn(
        run_writer(sink, outbound_rx, cancel.clone()).instrument(info_span!("link_writer")),
    );
    let reader = tokio::spawn(
        run_reader(client.clone(), source, max_frame_bytes, cancel.clone())
            .instrument(info_span!("link_reader")),
    );

    Ok(LinkSession {
        client,
        cancel,
        reader,
        writer,
    })
}

impl LinkSession {
    /// The client bound to this stream.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Shut the client down, then stop the reader and writer tasks.
    ///
    /// Lines already queued for the writer are written before it stops, so
    /// this waits for the peer to accept them.
    ///
    /// Returns why the reader stopped: [`ReaderExit::Cancelled`] unless the
    /// stream had already ended on its own.
    pub async fn close(self) -> ReaderExit {
        self.client.shutdown().await;
        self.cancel.cancel();

        let exit = match self.reader.await {
            Ok(exit) => exit,
            Err(err) => {
                error!(%err, "reader task ended abnormally");
                ReaderExit::Failed(err.to_string())
            }
        };
        match self.writer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(%err, "writer task failed"),
            Err(err) => error!(%err, "writer task ended abnormally"),
        }
        exit
    }
}
